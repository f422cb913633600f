//! Error types for perfherder-charts-core (WASM-compatible)

use crate::data::SeriesConfig;
use thiserror::Error;

/// Result type alias for perfherder-charts-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that work in both native and WASM environments
#[derive(Error, Debug)]
pub enum Error {
    #[error("Expected exactly one parent signature for {config}, found {count}")]
    AmbiguousSignatureError { config: SeriesConfig, count: usize },

    #[error("Data source error for {query}: {reason}")]
    DataSourceError { query: String, reason: String },

    #[error("Can not get data for {config}")]
    NoDataError { config: SeriesConfig },

    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Errors that must abort the whole chart rather than a single series
    pub fn is_abort(&self) -> bool {
        !matches!(self, Error::NoDataError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SeriesConfig {
        SeriesConfig {
            suite: "raptor-speedometer".to_string(),
            platform: "windows10-64".to_string(),
            framework: 1,
            option: "opt".to_string(),
            test: None,
        }
    }

    #[test]
    fn test_ambiguous_signature_message_has_count() {
        let err = Error::AmbiguousSignatureError {
            config: config(),
            count: 2,
        };
        let message = err.to_string();
        assert!(message.contains("found 2"));
        assert!(message.contains("platform=windows10-64"));
    }

    #[test]
    fn test_abort_classification() {
        assert!(!Error::NoDataError { config: config() }.is_abort());
        assert!(Error::DataSourceError {
            query: "https://example.com".to_string(),
            reason: "HTTP status 500".to_string(),
        }
        .is_abort());
    }
}
