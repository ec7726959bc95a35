//! Error types for weft-core.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Result type alias for weft-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in weft-core.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O failure, optionally tagged with the path that caused it.
    #[error("I/O error{}: {source}", path_suffix(.path))]
    Io {
        #[source]
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// A file or payload could not be parsed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid or missing configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A general operation failure with a human-readable message.
    #[error("Operation failed: {0}")]
    Operation(String),
}

fn path_suffix(path: &Option<PathBuf>) -> String {
    match path {
        Some(p) => format!(" at {}", p.display()),
        None => String::new(),
    }
}

impl Error {
    /// Wrap an I/O error without path context.
    pub fn io(source: std::io::Error) -> Self {
        Self::Io { source, path: None }
    }

    /// Wrap an I/O error with the path it occurred on.
    pub fn io_with_path(source: std::io::Error, path: impl AsRef<Path>) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a general operation error.
    pub fn operation(msg: impl Into<String>) -> Self {
        Self::Operation(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_without_path() {
        let err = Error::io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let msg = err.to_string();
        assert!(msg.starts_with("I/O error:"));
        assert!(msg.contains("gone"));
    }

    #[test]
    fn test_io_error_with_path() {
        let err = Error::io_with_path(
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
            "/tmp/index",
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/index"));
    }

    #[test]
    fn test_parse_error_display() {
        let err = Error::parse("bad json");
        assert_eq!(err.to_string(), "Parse error: bad json");
    }

    #[test]
    fn test_config_error_display() {
        let err = Error::config("missing index path");
        assert_eq!(err.to_string(), "Configuration error: missing index path");
    }

    #[test]
    fn test_from_serde_json() {
        let parse_failure = serde_json::from_str::<serde_json::Value>("{nope").unwrap_err();
        let err: Error = parse_failure.into();
        assert!(matches!(err, Error::Parse(_)));
    }
}
