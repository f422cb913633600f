//! Pipeline settings: backend location, time window and chart palette

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

pub const TREEHERDER_URL: &str = "https://treeherder.mozilla.org";
pub const DEFAULT_REPO: &str = "mozilla-central";
pub const NINETY_DAYS_SECS: u64 = 90 * 24 * 60 * 60;
pub const DEFAULT_FRESHNESS_DAYS: i64 = 3;

/// Colors handed out to subtest lines, in order
pub const DEFAULT_PALETTE: &[&str] = &[
    "#e55525", "#ffcd02", "#45a1ff", "#00e2c2", "#7044a4", "#ff0f7b", "#53d769", "#c6c6c6",
    "#ff9400", "#0a84ff",
];

/// Configuration passed into the pipeline at construction
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Treeherder base URL
    pub treeherder_url: String,
    /// Repository (project) the data is fetched for
    pub repo: String,
    /// Time range of fetched data, in seconds
    pub interval_secs: u64,
    /// Newest point may be at most this many days old
    pub freshness_days: i64,
    pub palette: Vec<String>,
    /// Per-request timeout of the HTTP client, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            treeherder_url: TREEHERDER_URL.to_string(),
            repo: DEFAULT_REPO.to_string(),
            interval_secs: NINETY_DAYS_SECS,
            freshness_days: DEFAULT_FRESHNESS_DAYS,
            palette: DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect(),
            timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a JSON file; missing fields keep their defaults
    pub fn load_from_file(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path).map_err(|e| Error::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;

        let settings: Self = serde_json::from_str(&content)?;
        settings.check()?;
        Ok(settings)
    }

    /// Reject values the pipeline cannot work with
    pub fn check(&self) -> Result<()> {
        if self.treeherder_url.trim().is_empty() {
            return Err(Error::ConfigError(
                "Treeherder URL cannot be empty".to_string(),
            ));
        }
        if self.repo.trim().is_empty() {
            return Err(Error::ConfigError("Repository cannot be empty".to_string()));
        }
        if self.interval_secs == 0 {
            return Err(Error::ConfigError(
                "Interval must be greater than 0".to_string(),
            ));
        }
        if self.freshness_days < 0 {
            return Err(Error::ConfigError(
                "Freshness window cannot be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Base URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.treeherder_url.trim_end_matches('/')
    }
}
