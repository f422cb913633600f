//! Percentile-based outlier filtering

use crate::data::{DataPoint, DatedPoint};

/// The `k`-th quantile (`0.0..=1.0`) of `values`, interpolating linearly
/// between the two closest ranks. Returns `None` for an empty slice.
pub fn percentile(values: &[f64], k: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = (sorted.len() - 1) as f64 * k.clamp(0.0, 1.0);
    let lower = rank.floor() as usize;
    let fraction = rank - lower as f64;

    match sorted.get(lower + 1) {
        Some(upper) => Some(sorted[lower] + fraction * (upper - sorted[lower])),
        None => Some(sorted[lower]),
    }
}

/// Drop points whose value reaches the `threshold`-th percentile (0-100).
///
/// A threshold of 100 or more keeps every point. Surviving points carry their
/// push date.
pub fn filter_by_percentile(points: &[DataPoint], threshold: f64) -> Vec<DatedPoint> {
    filter_by_percentile_on(points, threshold, |p| p.value)
}

/// Same as [`filter_by_percentile`], measuring each point with `measure`
pub fn filter_by_percentile_on<F>(
    points: &[DataPoint],
    threshold: f64,
    measure: F,
) -> Vec<DatedPoint>
where
    F: Fn(&DataPoint) -> f64,
{
    if threshold >= 100.0 {
        return points.iter().cloned().map(DatedPoint::new).collect();
    }

    let values: Vec<f64> = points.iter().map(&measure).collect();
    let cutoff = match percentile(&values, threshold / 100.0) {
        Some(cutoff) => cutoff,
        None => return Vec::new(),
    };

    points
        .iter()
        .filter(|p| measure(p) < cutoff)
        .cloned()
        .map(DatedPoint::new)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(value: f64, push_timestamp: i64) -> DataPoint {
        DataPoint {
            id: None,
            signature_id: Some(1),
            job_id: Some(100),
            push_id: 200,
            value,
            push_timestamp,
        }
    }

    fn one_to_ten() -> Vec<DataPoint> {
        (1..=10)
            .map(|i| point(i as f64, 1_546_300_800 + i * 3600))
            .collect()
    }

    fn values(points: &[DatedPoint]) -> Vec<f64> {
        points.iter().map(|p| p.point.value).collect()
    }

    #[test]
    fn test_percentile_interpolates() {
        let data: Vec<f64> = (1..=10).map(f64::from).collect();
        assert!((percentile(&data, 0.8).unwrap() - 8.2).abs() < 1e-9);
        assert_eq!(percentile(&data, 0.0), Some(1.0));
        assert_eq!(percentile(&data, 1.0), Some(10.0));
        assert_eq!(percentile(&data, 0.5), Some(5.5));
    }

    #[test]
    fn test_percentile_unsorted_input() {
        let data = [10.0, 1.0, 5.0, 3.0];
        assert_eq!(percentile(&data, 0.0), Some(1.0));
        assert_eq!(percentile(&data, 1.0), Some(10.0));
    }

    #[test]
    fn test_percentile_empty() {
        assert_eq!(percentile(&[], 0.5), None);
    }

    #[test]
    fn test_threshold_80_keeps_eight_of_ten() {
        let filtered = filter_by_percentile(&one_to_ten(), 80.0);
        assert_eq!(filtered.len(), 8);
        assert_eq!(values(&filtered), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        for p in &filtered {
            assert_eq!(p.datetime.timestamp(), p.point.push_timestamp);
        }
    }

    #[test]
    fn test_threshold_100_keeps_everything() {
        let points = one_to_ten();
        let filtered = filter_by_percentile(&points, 100.0);
        assert_eq!(filtered.len(), points.len());
        for (original, kept) in points.iter().zip(&filtered) {
            assert_eq!(&kept.point, original);
            assert_eq!(kept.datetime, original.datetime());
        }

        assert_eq!(filter_by_percentile(&points, 150.0).len(), points.len());
    }

    #[test]
    fn test_lower_threshold_is_subset() {
        let points: Vec<DataPoint> = [5.0, 1.0, 9.0, 3.0, 7.0, 7.0, 2.0, 8.0]
            .iter()
            .enumerate()
            .map(|(i, v)| point(*v, i as i64))
            .collect();

        let thresholds = [0.0, 10.0, 25.0, 50.0, 75.0, 90.0, 99.0];
        for pair in thresholds.windows(2) {
            let low = values(&filter_by_percentile(&points, pair[0]));
            let high = values(&filter_by_percentile(&points, pair[1]));
            assert!(
                low.iter().all(|v| high.contains(v)),
                "{:?} is not a subset of {:?}",
                low,
                high
            );
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(filter_by_percentile(&[], 50.0).is_empty());
        assert!(filter_by_percentile(&[], 100.0).is_empty());
    }

    #[test]
    fn test_input_is_not_mutated() {
        let points = vec![point(3.0, 3), point(1.0, 1), point(2.0, 2)];
        let before = points.clone();
        let _ = filter_by_percentile(&points, 50.0);
        assert_eq!(points, before);
    }

    #[test]
    fn test_order_is_preserved() {
        let points = vec![point(3.0, 1), point(1.0, 2), point(9.0, 3), point(2.0, 4)];
        let filtered = filter_by_percentile(&points, 75.0);
        assert_eq!(values(&filtered), vec![3.0, 1.0, 2.0]);
    }

    #[test]
    fn test_custom_measure() {
        let points = one_to_ten();
        let filtered = filter_by_percentile_on(&points, 50.0, |p| p.push_timestamp as f64);
        assert_eq!(filtered.len(), 5);
    }
}
