//! Version control references and their canonical form.

use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Hosts whose URLs are rewritten to `https` regardless of the scheme used.
const KNOWN_HOSTS: [&str; 3] = ["github.com", "gitlab.com", "bitbucket.org"];

// ---------------------------------------------------------------------------
// VcsType
// ---------------------------------------------------------------------------

/// Version control system kind.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum VcsType {
    Git,
    GitRepo,
    Mercurial,
    Subversion,
    #[serde(rename = "CVS")]
    Cvs,
    #[default]
    #[serde(rename = "")]
    Unknown,
}

impl VcsType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Git => "Git",
            Self::GitRepo => "GitRepo",
            Self::Mercurial => "Mercurial",
            Self::Subversion => "Subversion",
            Self::Cvs => "CVS",
            Self::Unknown => "",
        }
    }

    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }
}

impl fmt::Display for VcsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VcsType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "git" => Ok(Self::Git),
            "gitrepo" | "git-repo" | "repo" => Ok(Self::GitRepo),
            "mercurial" | "hg" => Ok(Self::Mercurial),
            "subversion" | "svn" => Ok(Self::Subversion),
            "cvs" => Ok(Self::Cvs),
            "" | "unknown" => Ok(Self::Unknown),
            other => Err(CoreError::Validation(format!("unknown VCS type '{other}'"))),
        }
    }
}

// ---------------------------------------------------------------------------
// VcsInfo
// ---------------------------------------------------------------------------

/// A reference into a version control repository.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct VcsInfo {
    #[serde(rename = "type", default, skip_serializing_if = "VcsType::is_unknown")]
    pub vcs_type: VcsType,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
    /// Symbolic or concrete revision (branch, tag or commit).
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub revision: String,
    /// Path of interest inside the repository, relative to its root.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
}

impl VcsInfo {
    #[must_use]
    pub fn new(
        vcs_type: VcsType,
        url: impl Into<String>,
        revision: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            vcs_type,
            url: url.into(),
            revision: revision.into(),
            path: path.into(),
        }
    }

    /// Whether nothing at all is known about the repository.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vcs_type.is_unknown()
            && self.url.is_empty()
            && self.revision.is_empty()
            && self.path.is_empty()
    }

    /// Return the canonical form of this reference.
    ///
    /// The URL is normalized with [`normalize_vcs_url`], the revision is
    /// trimmed and the path loses surrounding whitespace and slashes.
    #[must_use]
    pub fn normalize(&self) -> Self {
        Self {
            vcs_type: self.vcs_type,
            url: normalize_vcs_url(&self.url),
            revision: self.revision.trim().to_string(),
            path: self.path.trim().trim_matches('/').to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// URL normalization
// ---------------------------------------------------------------------------

/// Canonicalize a repository URL so that two spellings of the same repository
/// compare equal.
///
/// Lowercases scheme and host, converts scp-like `user@host:path` to `ssh://`,
/// drops `git+` scheme prefixes and credentials, rewrites known hosting
/// services to `https` without `www.`, turns absolute paths into `file://`
/// URLs and strips trailing slashes and `.git` suffixes. The function is
/// idempotent.
#[must_use]
pub fn normalize_vcs_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    if trimmed.starts_with('/') {
        let file_url = url::Url::from_file_path(trimmed)
            .map_or_else(|()| format!("file://{trimmed}"), String::from);
        return strip_repository_suffixes(&file_url);
    }

    let (scheme, rest) = match trimmed.split_once("://") {
        Some((scheme, rest)) => (scheme.to_ascii_lowercase(), rest.to_string()),
        None => match split_scp_like(trimmed) {
            Some((authority, path)) => ("ssh".to_string(), format!("{authority}/{path}")),
            None => return strip_repository_suffixes(trimmed),
        },
    };
    let scheme = scheme
        .strip_prefix("git+")
        .map_or_else(|| scheme.clone(), str::to_string);

    if scheme == "file" {
        return strip_repository_suffixes(&format!("file://{rest}"));
    }

    let (authority, path) = rest.split_once('/').unwrap_or((rest.as_str(), ""));
    let (userinfo, host_port) = match authority.rsplit_once('@') {
        Some((userinfo, host_port)) => (Some(userinfo), host_port),
        None => (None, authority),
    };

    let mut host_port = host_port.to_ascii_lowercase();
    if let Some(stripped) = host_port.strip_prefix("www.") {
        if is_known_host(stripped) {
            host_port = stripped.to_string();
        }
    }

    let known = is_known_host(&host_port);
    let (scheme, host_port, user) = if known {
        let host = host_port
            .split_once(':')
            .map_or(host_port.as_str(), |(host, _)| host)
            .to_string();
        ("https".to_string(), host, None)
    } else {
        let user = if scheme == "ssh" {
            userinfo
                .map(|info| info.split_once(':').map_or(info, |(user, _)| user))
                .filter(|user| !user.is_empty())
        } else {
            None
        };
        (scheme, host_port, user)
    };

    let mut normalized = format!("{scheme}://");
    if let Some(user) = user {
        normalized.push_str(user);
        normalized.push('@');
    }
    normalized.push_str(&host_port);
    if !path.is_empty() {
        normalized.push('/');
        normalized.push_str(path);
    }

    strip_repository_suffixes(&normalized)
}

fn is_known_host(host_port: &str) -> bool {
    let host = host_port.split_once(':').map_or(host_port, |(host, _)| host);
    KNOWN_HOSTS.contains(&host)
}

/// Split `git@host:org/repo` style references into authority and path.
fn split_scp_like(url: &str) -> Option<(&str, &str)> {
    let (authority, path) = url.split_once(':')?;
    if authority.len() < 2 || authority.contains('/') || path.starts_with("//") {
        return None;
    }
    Some((authority, path.trim_start_matches('/')))
}

/// Strip trailing `/` and `.git` until stable, never touching the `scheme://`
/// prefix.
fn strip_repository_suffixes(url: &str) -> String {
    let (prefix, rest) = url
        .find("://")
        .map_or(("", url), |idx| url.split_at(idx + 3));

    let mut rest = rest;
    loop {
        let stripped = rest.trim_end_matches('/');
        let stripped = stripped.strip_suffix(".git").unwrap_or(stripped);
        if stripped.len() == rest.len() {
            break;
        }
        rest = stripped;
    }

    format!("{prefix}{rest}")
}
