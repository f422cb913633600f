//! Data structures for performance series and chart datasets

use crate::error::{Error, Result};
use crate::filter::filter_by_percentile;
use crate::format::graph_url;
use crate::settings::Settings;
use crate::signature::{Signature, SignatureSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Caller-supplied descriptor used to look up one or more signatures
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SeriesConfig {
    /// Suite name (e.g. "raptor-speedometer")
    pub suite: String,
    /// Machine platform (e.g. "windows10-64")
    pub platform: String,
    /// Perfherder framework id
    pub framework: u32,
    /// Build option name (e.g. "opt", "pgo")
    pub option: String,
    /// Restrict the series to a single subtest
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test: Option<String>,
}

impl fmt::Display for SeriesConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "suite={} platform={} framework={} option={}",
            self.suite, self.platform, self.framework, self.option
        )?;
        if let Some(test) = &self.test {
            write!(f, " test={}", test)?;
        }
        Ok(())
    }
}

/// Per-request switches
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SeriesOptions {
    /// Chart every subtest as its own colored line
    #[serde(alias = "includeSubtests")]
    pub include_subtests: bool,
    /// Keep the parent (summary) signature next to its subtests
    #[serde(alias = "includeParentData")]
    pub include_parent_data: bool,
    /// Drop points at or above this percentile (0-100, 100 keeps all)
    #[serde(alias = "percentileThreshold")]
    pub percentile_threshold: f64,
}

impl Default for SeriesOptions {
    fn default() -> Self {
        Self {
            include_subtests: false,
            include_parent_data: true,
            percentile_threshold: 100.0,
        }
    }
}

/// One requested line (or group of lines) of a chart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "seriesConfig", alias = "config")]
    pub config: SeriesConfig,
    #[serde(default)]
    pub options: SeriesOptions,
}

impl SeriesRequest {
    pub fn new(config: SeriesConfig) -> Self {
        Self {
            label: None,
            config,
            options: SeriesOptions::default(),
        }
    }
}

/// A single measurement as returned by the performance data endpoint
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature_id: Option<u64>,
    #[serde(default)]
    pub job_id: Option<u64>,
    pub push_id: u64,
    pub value: f64,
    /// Push time in epoch seconds
    pub push_timestamp: i64,
}

impl DataPoint {
    /// Push time as a UTC date; out-of-range timestamps map to the epoch
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.push_timestamp, 0).unwrap_or_default()
    }
}

/// A data point that survived filtering, with its derived date
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatedPoint {
    #[serde(flatten)]
    pub point: DataPoint,
    pub datetime: DateTime<Utc>,
}

impl DatedPoint {
    pub fn new(point: DataPoint) -> Self {
        let datetime = point.datetime();
        Self { point, datetime }
    }
}

/// Filtered points of one signature plus presentation metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricSeries {
    pub signature: Signature,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Permalink to the graph of this signature alone
    pub url: String,
    pub points: Vec<DatedPoint>,
}

impl MetricSeries {
    /// Series labelled after its signature, without a color
    pub fn new(signature: Signature, url: String, points: Vec<DatedPoint>) -> Self {
        let label = signature
            .test
            .clone()
            .unwrap_or_else(|| signature.suite.clone());
        Self {
            signature,
            label,
            color: None,
            url,
            points,
        }
    }

    /// Replace the label and color, leaving signature, url and points untouched
    pub fn with_presentation(self, label: String, color: Option<String>) -> Self {
        Self {
            label,
            color,
            ..self
        }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Everything fetched for one series request, before formatting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SuiteData {
    /// Permalink to a graph with every signature of the request
    pub perfherder_url: String,
    pub series: Vec<MetricSeries>,
}

impl SuiteData {
    /// Pair every signature with its fetched points, filtering outliers.
    ///
    /// Series keep the order of `signatures`. Signatures without any fetched
    /// points are kept as empty series so the formatter can report them.
    pub fn assemble(
        signatures: &SignatureSet,
        mut data: HashMap<String, Vec<DataPoint>>,
        percentile_threshold: f64,
        settings: &Settings,
    ) -> Self {
        let series = signatures
            .iter()
            .map(|signature| {
                let raw = data.remove(&signature.hash).unwrap_or_default();
                let points = filter_by_percentile(&raw, percentile_threshold);
                let url = graph_url(settings, [signature]);
                MetricSeries::new(signature.clone(), url, points)
            })
            .collect();

        Self {
            perfherder_url: graph_url(settings, signatures.iter()),
            series,
        }
    }
}

/// A successfully fetched request, ready for formatting
#[derive(Debug, Clone)]
pub struct ChartInput {
    pub request: SeriesRequest,
    pub suite: SuiteData,
}

/// A single `{x, y}` chart point
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    pub x: DateTime<Utc>,
    pub y: f64,
}

/// One line of the chart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSeries {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    /// Newest point is older than the freshness window
    pub stale: bool,
    pub data: Vec<ChartPoint>,
}

/// Per-line metadata kept alongside the chart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeriesMeta {
    pub label: String,
    pub url: String,
    pub signature: Signature,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChartMeta {
    /// Permalink to a graph with every line of the chart
    pub url: String,
    /// Permalink per fetched request, in request order
    pub request_urls: Vec<String>,
    pub series: Vec<SeriesMeta>,
}

/// Non-fatal conditions surfaced next to the chart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartWarning {
    /// The newest point of a line is older than the freshness window
    Stale { label: String, days: i64 },
    /// A requested line has no points to draw
    NoData { config: SeriesConfig },
}

impl ChartWarning {
    /// Inline annotation text
    pub fn message(&self) -> String {
        match self {
            ChartWarning::Stale { label, days } => {
                format!("Data is missing since {} days for {}.", days, label)
            }
            ChartWarning::NoData { config } => format!("No data available for {}.", config),
        }
    }
}

/// The structure handed to the chart renderer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ChartDataset {
    pub datasets: Vec<ChartSeries>,
    pub meta: ChartMeta,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ChartWarning>,
}

impl ChartDataset {
    /// Whether any line should show the missing-data notice
    pub fn has_stale(&self) -> bool {
        self.datasets.iter().any(|d| d.stale)
    }
}

/// One chart of a dashboard definition file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSpec {
    pub title: String,
    pub series: Vec<SeriesRequest>,
}

impl ChartSpec {
    /// Load a list of chart definitions from a JSON file
    pub fn load_all(path: &std::path::Path) -> Result<Vec<Self>> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::FileReadError {
            path: path.display().to_string(),
            source: e,
        })?;

        let charts: Vec<Self> = serde_json::from_str(&content)?;
        Ok(charts)
    }
}

/// Outcome of building one dashboard chart: either a chart or an error panel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartPanel {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartDataset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChartPanel {
    pub fn ready(title: String, chart: ChartDataset) -> Self {
        Self {
            title,
            chart: Some(chart),
            error: None,
        }
    }

    pub fn failed(title: String, error: &dyn fmt::Display) -> Self {
        Self {
            title,
            chart: None,
            error: Some(error.to_string()),
        }
    }
}
