//! Checksums and remote artifacts.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Algorithm a [`Hash`] value was computed with.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "NONE")]
    None,
    #[serde(rename = "UNKNOWN")]
    Unknown,
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "SHA-1")]
    Sha1,
    #[serde(rename = "SHA-256")]
    Sha256,
    #[serde(rename = "SHA-384")]
    Sha384,
    #[serde(rename = "SHA-512")]
    Sha512,
}

impl HashAlgorithm {
    /// Guess the algorithm from the length of a hex digest.
    #[must_use]
    pub const fn from_hex_len(len: usize) -> Self {
        match len {
            0 => Self::None,
            32 => Self::Md5,
            40 => Self::Sha1,
            64 => Self::Sha256,
            96 => Self::Sha384,
            128 => Self::Sha512,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Unknown => "UNKNOWN",
            Self::Md5 => "MD5",
            Self::Sha1 => "SHA-1",
            Self::Sha256 => "SHA-256",
            Self::Sha384 => "SHA-384",
            Self::Sha512 => "SHA-512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A checksum value together with its algorithm.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct Hash {
    pub value: String,
    pub algorithm: HashAlgorithm,
}

impl Hash {
    /// The absence of a checksum.
    pub const NONE: Self = Self {
        value: String::new(),
        algorithm: HashAlgorithm::None,
    };

    /// Build a hash from a hex digest, inferring the algorithm from its length.
    #[must_use]
    pub fn create(value: &str) -> Self {
        let value = value.trim().to_ascii_lowercase();
        let algorithm = HashAlgorithm::from_hex_len(value.len());
        Self { value, algorithm }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self.algorithm, HashAlgorithm::None)
    }
}

/// A downloadable artifact, e.g. a source or binary archive.
#[derive(
    Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct RemoteArtifact {
    pub url: String,
    #[serde(default, skip_serializing_if = "Hash::is_none")]
    pub hash: Hash,
}

impl RemoteArtifact {
    #[must_use]
    pub fn new(url: impl Into<String>, hash: Hash) -> Self {
        Self {
            url: url.into(),
            hash,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.url.trim().is_empty()
    }
}
