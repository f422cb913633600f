//! perfherder-charts-core - Shared types and data shaping for perfherder-charts
//!
//! This crate contains I/O-free, WASM-compatible code that turns raw
//! Perfherder payloads into chart-ready datasets.
//!
//! # Features
//!
//! - Parent signature selection and subtest correlation
//! - Percentile-based outlier filtering
//! - Staleness detection for the newest data point of a series
//! - Chart.js-shaped dataset formatting with labels, colors and permalinks

pub mod data;
pub mod error;
pub mod filter;
pub mod format;
pub mod settings;
pub mod signature;
pub mod staleness;

pub use data::{
    ChartDataset, ChartInput, ChartMeta, ChartPanel, ChartPoint, ChartSeries, ChartSpec,
    ChartWarning, DataPoint, DatedPoint, MetricSeries, SeriesConfig, SeriesMeta, SeriesOptions,
    SeriesRequest, SuiteData,
};
pub use error::{Error, Result};
pub use filter::{filter_by_percentile, filter_by_percentile_on, percentile};
pub use format::{format, graph_url, palette_color, series_label};
pub use settings::Settings;
pub use signature::{
    correlate, select_parent, BuildOption, OptionCollection, RawSignature, Signature, SignatureMap,
    SignatureSet,
};
pub use staleness::{days_since_last, is_stale};
