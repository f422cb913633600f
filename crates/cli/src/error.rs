//! Error types for the perfherder-charts CLI (native-only errors)

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// CLI-specific error types (includes native dependencies)
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] perfherder_charts_core::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl Error {
    /// The request resolved but returned no data points
    pub fn is_no_data(&self) -> bool {
        matches!(self, Error::Core(e) if !e.is_abort())
    }
}
