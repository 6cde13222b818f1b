//! Error types for settings operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while locating or reading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a file
    #[error("failed to read settings file '{path}': {source}")]
    ReadFile {
        /// Path of the file that could not be read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("failed to parse settings file '{path}': {source}")]
    TomlParse {
        /// Path of the file that could not be parsed.
        path: PathBuf,
        /// Underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A field holds a value the translator cannot use
    #[error("invalid setting '{field}': {reason}")]
    InvalidValue {
        /// Dotted field name, e.g. `files.dsl_extension`.
        field: String,
        /// Description of why the value is invalid.
        reason: String,
    },
}

impl ConfigError {
    /// Create a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConfigError::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Create a TOML parse error.
    pub fn toml_parse(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        ConfigError::TomlParse {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid value error.
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    fn mock_io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::NotFound, "mock")
    }

    #[test]
    fn read_file_factory_produces_correct_variant() {
        let err = ConfigError::read_file("/some/ugenc.toml", mock_io_err());
        assert!(
            matches!(err, ConfigError::ReadFile { ref path, .. } if path == std::path::Path::new("/some/ugenc.toml"))
        );
    }

    #[test]
    fn read_file_display() {
        let err = ConfigError::read_file("/a/ugenc.toml", mock_io_err());
        let msg = err.to_string();
        assert!(msg.contains("failed to read settings file"), "got: {msg}");
        assert!(msg.contains("/a/ugenc.toml"), "got: {msg}");
    }

    #[test]
    fn invalid_value_display() {
        let err = ConfigError::invalid("namespace", "must not be empty");
        assert_eq!(
            err.to_string(),
            "invalid setting 'namespace': must not be empty"
        );
    }

    #[test]
    fn read_file_source_is_some() {
        let err = ConfigError::read_file("/x", mock_io_err());
        assert!(err.source().is_some(), "ReadFile must expose I/O source");
    }

    #[test]
    fn invalid_value_source_is_none() {
        let err = ConfigError::invalid("f", "r");
        assert!(err.source().is_none());
    }
}
