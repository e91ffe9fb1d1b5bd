//! The canonical package / project identity.

use std::borrow::Cow;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

use schemars::{JsonSchema, Schema, SchemaGenerator, json_schema};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::CoreError;

/// Immutable composite key of a package or project.
///
/// The string form is `ecosystem:namespace:name:version`. Parsing splits on the
/// first three colons, so a version may itself contain colons; missing trailing
/// components are treated as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Identifier {
    /// Package manager or ecosystem, e.g. `Maven`, `NPM`, `Cargo`, `Unmanaged`.
    pub ecosystem: String,
    /// Group, scope or organization. Empty when the ecosystem has none.
    pub namespace: String,
    pub name: String,
    pub version: String,
}

impl Identifier {
    #[must_use]
    pub fn new(
        ecosystem: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            ecosystem: ecosystem.into(),
            namespace: namespace.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    /// Check that the identifier can serve as a graph key.
    ///
    /// The ecosystem and name are required, and no component but the version
    /// may contain a colon (it would not survive a string round trip).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] naming the offending component.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.ecosystem.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "identifier '{self}' is missing the ecosystem"
            )));
        }
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "identifier '{self}' is missing the name"
            )));
        }
        for (field, value) in [
            ("ecosystem", &self.ecosystem),
            ("namespace", &self.namespace),
            ("name", &self.name),
        ] {
            if value.contains(':') {
                return Err(CoreError::Validation(format!(
                    "identifier {field} '{value}' must not contain ':'"
                )));
            }
        }
        Ok(())
    }

    /// Render the identifier as a relative, storage-safe path
    /// (`ecosystem/namespace/name/version`).
    ///
    /// Every component is percent-encoded, so a component never contains a
    /// separator and never resolves to `.` or `..`. Empty components become
    /// `unknown`, and overlong components are shortened with a digest.
    #[must_use]
    pub fn to_path(&self) -> String {
        [&self.ecosystem, &self.namespace, &self.name, &self.version]
            .into_iter()
            .map(|component| path_segment(component))
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// Longest encoded segment kept as is, well below common file name limits.
const MAX_SEGMENT_LEN: usize = 200;
const SEGMENT_PREFIX_LEN: usize = 64;

/// Encode a single key segment so it is safe as one path component.
///
/// Segments whose encoding exceeds [`MAX_SEGMENT_LEN`] bytes are shortened to
/// a prefix followed by the SHA-256 of the raw value.
pub(crate) fn path_segment(value: &str) -> String {
    match value {
        "" => "unknown".to_string(),
        "." => "%2E".to_string(),
        ".." => "%2E%2E".to_string(),
        other => {
            let encoded = urlencoding::encode(other);
            if encoded.len() <= MAX_SEGMENT_LEN {
                return encoded.into_owned();
            }
            // Keep a readable prefix and make the segment unique by digest.
            let digest = Sha256::digest(other.as_bytes());
            format!("{}-{digest:x}", &encoded[..SEGMENT_PREFIX_LEN])
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            self.ecosystem, self.namespace, self.name, self.version
        )
    }
}

impl FromStr for Identifier {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(4, ':').map(str::to_string);
        Ok(Self {
            ecosystem: parts.next().unwrap_or_default(),
            namespace: parts.next().unwrap_or_default(),
            name: parts.next().unwrap_or_default(),
            version: parts.next().unwrap_or_default(),
        })
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(id) => id,
            Err(never) => match never {},
        }
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

impl From<Identifier> for String {
    fn from(value: Identifier) -> Self {
        value.to_string()
    }
}

impl JsonSchema for Identifier {
    fn schema_name() -> Cow<'static, str> {
        "Identifier".into()
    }

    fn json_schema(_generator: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "string",
            "description": "Identifier in the form ecosystem:namespace:name:version"
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[test]
    fn equal_components_collide_as_map_key() {
        let a = Identifier::new("Maven", "org.apache", "commons-lang3", "3.12.0");
        let b = Identifier::new("Maven", "org.apache", "commons-lang3", "3.12.0");
        assert_eq!(a, b);

        let mut map = HashMap::new();
        map.insert(a, 1);
        map.insert(b, 2);
        assert_eq!(map.len(), 1);
    }

    #[rstest]
    #[case(Identifier::new("NPM", "org.apache", "commons-lang3", "3.12.0"))]
    #[case(Identifier::new("Maven", "org.example", "commons-lang3", "3.12.0"))]
    #[case(Identifier::new("Maven", "org.apache", "commons-text", "3.12.0"))]
    #[case(Identifier::new("Maven", "org.apache", "commons-lang3", "3.13.0"))]
    fn changing_any_component_breaks_equality(#[case] other: Identifier) {
        let base = Identifier::new("Maven", "org.apache", "commons-lang3", "3.12.0");
        assert_ne!(base, other);
    }

    #[test]
    fn parses_and_renders_string_form() {
        let id: Identifier = "Maven:org.apache:commons-lang3:3.12.0".parse().unwrap();
        assert_eq!(id.ecosystem, "Maven");
        assert_eq!(id.namespace, "org.apache");
        assert_eq!(id.name, "commons-lang3");
        assert_eq!(id.version, "3.12.0");
        assert_eq!(id.to_string(), "Maven:org.apache:commons-lang3:3.12.0");
    }

    #[test]
    fn parse_pads_missing_components_and_keeps_colons_in_version() {
        let short = Identifier::from("Unmanaged::project");
        assert_eq!(short, Identifier::new("Unmanaged", "", "project", ""));

        let epoch = Identifier::from("Debian::openssl:1:3.0.2");
        assert_eq!(epoch.version, "1:3.0.2");
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = Identifier::new("NPM", "@types", "node", "20.1.0");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"NPM:@types:node:20.1.0\"");
        let back: Identifier = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn validation_requires_ecosystem_and_name() {
        assert!(Identifier::new("", "ns", "name", "1").validate().is_err());
        assert!(Identifier::new("Maven", "ns", " ", "1").validate().is_err());
        assert!(Identifier::new("Maven", "a:b", "name", "1").validate().is_err());
        assert!(Identifier::new("Unmanaged", "", "name", "").validate().is_ok());
    }

    #[test]
    fn path_rendering_is_traversal_safe() {
        let id = Identifier::new("NPM", "@scope", "..", "");
        assert_eq!(id.to_path(), "NPM/%40scope/%2E%2E/unknown");

        let slashed = Identifier::new("Go", "", "github.com/foo/bar", "v1.0.0");
        assert_eq!(slashed.to_path(), "Go/unknown/github.com%2Ffoo%2Fbar/v1.0.0");
    }

    #[test]
    fn overlong_segments_are_shortened_with_a_digest() {
        let long = format!("https://example.org/{}", "release/".repeat(40));
        let segment = path_segment(&long);
        assert!(segment.len() <= MAX_SEGMENT_LEN, "{}", segment.len());
        assert!(segment.starts_with("https%3A%2F%2Fexample.org"));
        assert!(!segment.contains('/'));

        let other = path_segment(&format!("{long}x"));
        assert_ne!(segment, other);
        assert_eq!(segment, path_segment(&long));
    }
}
