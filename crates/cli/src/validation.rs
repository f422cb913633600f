//! Validation of command line input

use crate::error::{Error, Result};
use perfherder_charts_core::SeriesConfig;
use std::path::Path;
use url::Url;

/// Longest time range Perfherder serves, in days
const MAX_INTERVAL_DAYS: u64 = 365;

/// Validate percentile threshold (0 <= p <= 100)
pub fn validate_percentile(percentile: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&percentile) {
        return Err(Error::Validation(format!(
            "Percentile must be in [0, 100], got {}",
            percentile
        )));
    }
    Ok(())
}

/// Validate the freshness window
pub fn validate_freshness_days(days: i64) -> Result<()> {
    if days < 0 {
        return Err(Error::Validation(
            "Freshness window cannot be negative".to_string(),
        ));
    }
    Ok(())
}

/// Validate the fetched time range
pub fn validate_interval_days(days: u64) -> Result<()> {
    if days == 0 {
        return Err(Error::Validation(
            "Interval must be at least one day".to_string(),
        ));
    }
    if days > MAX_INTERVAL_DAYS {
        return Err(Error::Validation(format!(
            "Interval cannot exceed {} days",
            MAX_INTERVAL_DAYS
        )));
    }
    Ok(())
}

/// Validate palette colors (`#rgb` or `#rrggbb`)
pub fn validate_palette(palette: &[String]) -> Result<()> {
    if palette.is_empty() {
        return Err(Error::Validation("Palette cannot be empty".to_string()));
    }

    for color in palette {
        let hex = color.strip_prefix('#').unwrap_or_default();
        let valid = matches!(hex.len(), 3 | 6) && hex.chars().all(|c| c.is_ascii_hexdigit());
        if !valid {
            return Err(Error::Validation(format!(
                "Invalid palette color '{}'. Expected '#rgb' or '#rrggbb'",
                color
            )));
        }
    }

    Ok(())
}

/// Validate the Treeherder base URL
pub fn validate_base_url(base_url: &str) -> Result<()> {
    let url = Url::parse(base_url)?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Validation(format!(
            "Treeherder URL must use http or https: {}",
            base_url
        )));
    }

    if url.query().is_some() || url.fragment().is_some() {
        return Err(Error::Validation(
            "Treeherder URL cannot carry a query or fragment".to_string(),
        ));
    }

    Ok(())
}

/// Validate a series descriptor
pub fn validate_series_config(config: &SeriesConfig) -> Result<()> {
    for (name, value) in [
        ("Suite", &config.suite),
        ("Platform", &config.platform),
        ("Option", &config.option),
    ] {
        if value.trim().is_empty() {
            return Err(Error::Validation(format!("{} cannot be empty", name)));
        }
    }

    if let Some(test) = &config.test {
        if test.trim().is_empty() {
            return Err(Error::Validation(
                "Test filter cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validate file path exists and is readable
pub fn validate_file_exists(path: &Path, description: &str) -> Result<()> {
    if !path.exists() {
        return Err(Error::Validation(format!(
            "{} does not exist: {}",
            description,
            path.display()
        )));
    }

    if !path.is_file() {
        return Err(Error::Validation(format!(
            "{} is not a file: {}",
            description,
            path.display()
        )));
    }

    Ok(())
}
