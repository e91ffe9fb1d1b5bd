//! Reading and writing result documents as JSON or TOML.

use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::errors::CoreError;

/// Document format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Toml => "toml",
        }
    }

    /// # Errors
    ///
    /// Returns [`CoreError::UnsupportedFormat`] for unknown or missing extensions.
    pub fn for_file(path: &Path) -> Result<Self, CoreError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "json" => Ok(Self::Json),
            "toml" => Ok(Self::Toml),
            _ => Err(CoreError::UnsupportedFormat(path.display().to_string())),
        }
    }

    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if `text` is not a valid document.
    pub fn parse<T: DeserializeOwned>(self, text: &str) -> Result<T, CoreError> {
        match self {
            Self::Json => serde_json::from_str(text).map_err(|e| self.error(e)),
            Self::Toml => toml::from_str(text).map_err(|e| self.error(e)),
        }
    }

    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if `value` cannot be represented.
    pub fn render<T: Serialize>(self, value: &T) -> Result<String, CoreError> {
        match self {
            Self::Json => serde_json::to_string_pretty(value).map_err(|e| self.error(e)),
            Self::Toml => toml::to_string_pretty(value).map_err(|e| self.error(e)),
        }
    }

    fn error(self, error: impl std::fmt::Display) -> CoreError {
        CoreError::Serialization {
            format: self.as_str().to_string(),
            message: error.to_string(),
        }
    }
}

/// Read a document from `path`, picking the format from its extension.
///
/// # Errors
///
/// Returns an error if the extension is unsupported, the file cannot be read,
/// or the content does not parse.
pub fn read_value<T: DeserializeOwned>(path: &Path) -> Result<T, CoreError> {
    let format = FileFormat::for_file(path)?;
    let text = std::fs::read_to_string(path)?;
    format.parse(&text)
}

/// Write `value` to `path`, picking the format from its extension.
///
/// # Errors
///
/// Returns an error if the extension is unsupported, the value cannot be
/// serialized, or the file cannot be written.
pub fn write_value<T: Serialize>(path: &Path, value: &T) -> Result<(), CoreError> {
    let format = FileFormat::for_file(path)?;
    let text = format.render(value)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, text)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::identifier::Identifier;
    use crate::package::Package;

    #[rstest]
    #[case("result.json", Some(FileFormat::Json))]
    #[case("result.JSON", Some(FileFormat::Json))]
    #[case("deps.toml", Some(FileFormat::Toml))]
    #[case("result.yml", None)]
    #[case("result", None)]
    fn format_by_extension(#[case] file: &str, #[case] expected: Option<FileFormat>) {
        assert_eq!(FileFormat::for_file(Path::new(file)).ok(), expected);
    }

    #[test]
    fn write_then_read_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/package.json");
        let pkg = Package::builder(Identifier::from("NPM::x:1"))
            .description("demo")
            .build()
            .unwrap();

        write_value(&path, &pkg).unwrap();
        let back: Package = read_value(&path).unwrap();
        assert_eq!(back, pkg);
    }

    #[test]
    fn malformed_toml_reports_format() {
        let err = FileFormat::Toml.parse::<Package>("id = ").unwrap_err();
        assert!(matches!(err, CoreError::Serialization { ref format, .. } if format == "toml"));
    }
}
