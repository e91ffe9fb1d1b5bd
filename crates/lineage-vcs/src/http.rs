//! HTTP(S) downloader for source artifacts.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use lineage_core::RemoteArtifact;
use url::Url;

use crate::error::VcsError;
use crate::{Downloader, local_path};

/// Downloads artifacts with `reqwest`. `file://` URLs are served from the
/// local filesystem.
#[derive(Debug, Clone)]
pub struct HttpDownloader {
    http: reqwest::Client,
}

impl HttpDownloader {
    /// # Errors
    ///
    /// Returns [`VcsError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, VcsError> {
        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self { http })
    }
}

/// File name for a downloaded artifact: the last URL path segment, without
/// query or fragment.
fn file_name(url: &str) -> String {
    let raw = Url::parse(url.trim())
        .ok()
        .and_then(|url| {
            url.path_segments()?
                .filter(|segment| !segment.is_empty())
                .next_back()
                .map(str::to_string)
        })
        .unwrap_or_default();
    let name = urlencoding::decode(&raw).map_or_else(|_| raw.clone(), |n| n.into_owned());
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', ':']) {
        "artifact".to_string()
    } else {
        name
    }
}

#[async_trait]
impl Downloader for HttpDownloader {
    async fn is_available(&self, artifact: &RemoteArtifact) -> bool {
        if artifact.url.trim().is_empty() {
            return false;
        }
        if let Some(path) = local_path(&artifact.url) {
            return tokio::fs::metadata(&path)
                .await
                .is_ok_and(|meta| meta.is_file());
        }
        match self.http.head(&artifact.url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(error) => {
                tracing::debug!(url = %artifact.url, %error, "artifact probe failed");
                false
            }
        }
    }

    async fn fetch(
        &self,
        artifact: &RemoteArtifact,
        target_dir: &Path,
    ) -> Result<PathBuf, VcsError> {
        tokio::fs::create_dir_all(target_dir).await?;
        let target = target_dir.join(file_name(&artifact.url));

        if let Some(path) = local_path(&artifact.url) {
            tokio::fs::copy(&path, &target).await?;
            return Ok(target);
        }

        let resp = self.http.get(&artifact.url).send().await?;
        if !resp.status().is_success() {
            return Err(VcsError::Download {
                url: artifact.url.clone(),
                status: resp.status().as_u16(),
            });
        }
        let bytes = resp.bytes().await?;
        tokio::fs::write(&target, &bytes).await?;
        tracing::debug!(url = %artifact.url, bytes = bytes.len(), target = %target.display(), "downloaded artifact");
        Ok(target)
    }
}
