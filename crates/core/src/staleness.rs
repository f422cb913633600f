//! Missing-data detection for the newest point of a series

use crate::data::MetricSeries;
use chrono::{DateTime, Utc};

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Whole days between two instants, rounded up
pub fn days_between(then: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let millis = (now - then).num_milliseconds().abs();
    (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// Age in days of the last point of `series`, or `None` if it has no points.
///
/// Points are expected in ascending time order, so the last point is the newest.
pub fn days_since_last(series: &MetricSeries, now: DateTime<Utc>) -> Option<i64> {
    series
        .points
        .last()
        .map(|point| days_between(point.datetime, now))
}

/// Whether the newest point of `series` is more than `freshness_days` old
pub fn is_stale(series: &MetricSeries, freshness_days: i64, now: DateTime<Utc>) -> bool {
    matches!(days_since_last(series, now), Some(days) if days > freshness_days)
}
