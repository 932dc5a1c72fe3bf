//! Report error types

use std::io;
use thiserror::Error;

/// Result type alias for report operations
pub type ReportResult<T> = std::result::Result<T, ReportError>;

/// Errors raised while configuring or writing a run report
#[derive(Debug, Error)]
pub enum ReportError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Config file could not be parsed
    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Config is readable but invalid
    #[error("Invalid config: {0}")]
    Config(String),
}

impl ReportError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ReportError::config("output must not be empty");
        assert!(err.to_string().contains("Invalid config"));
        assert!(err.to_string().contains("output must not be empty"));
    }

    #[test]
    fn test_error_from_toml() {
        let toml_err = toml::from_str::<toml::Value>("output = ").unwrap_err();
        let err: ReportError = toml_err.into();
        assert!(matches!(err, ReportError::Toml(_)));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: ReportError = io_err.into();
        assert!(matches!(err, ReportError::Io(_)));
        assert!(err.to_string().starts_with("IO error"));
    }
}
