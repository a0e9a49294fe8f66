//! Statistical helpers for latency trips and throughput curves
//!
//! All functions operate on plain `f64` slices and return `None` for empty
//! input instead of producing NaN.

use crate::models::metrics::Sample;
use serde::{Deserialize, Serialize};

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Smallest value
pub fn min(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::min)
}

/// Largest value
pub fn max(values: &[f64]) -> Option<f64> {
    values.iter().copied().reduce(f64::max)
}

/// Population standard deviation around the arithmetic mean.
///
/// A single value has a deviation of exactly zero.
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let avg = mean(values)?;
    if values.len() == 1 {
        return Some(0.0);
    }

    let variance = values
        .iter()
        .map(|&x| {
            let diff = x - avg;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;

    Some(variance.sqrt())
}

/// Median of the values
pub fn median(values: &[f64]) -> Option<f64> {
    percentile(values, 50.0)
}

/// Percentile using linear interpolation between closest ranks
pub fn percentile(values: &[f64], pct: f64) -> Option<f64> {
    if values.is_empty() || !(0.0..=100.0).contains(&pct) {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let rank = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;

    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// Rate in megabits per second for `bytes` moved in `elapsed_secs`.
///
/// Zero or negative elapsed time yields 0 rather than infinity.
pub fn rate_mbps(bytes: u64, elapsed_secs: f64) -> f64 {
    if elapsed_secs <= 0.0 || !elapsed_secs.is_finite() {
        return 0.0;
    }
    (bytes as f64 * 8.0) / (elapsed_secs * 1_000_000.0)
}

/// Shape of a phase's live rate curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub sample_count: usize,
    pub peak_mbps: f64,
    pub mean_mbps: f64,
    pub final_mbps: f64,
}

impl SampleSummary {
    pub fn from_samples(samples: &[Sample]) -> Option<Self> {
        let rates: Vec<f64> = samples.iter().map(|s| s.rate_mbps).collect();
        Some(Self {
            sample_count: rates.len(),
            peak_mbps: max(&rates)?,
            mean_mbps: mean(&rates)?,
            final_mbps: *rates.last()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_inputs() {
        assert_eq!(mean(&[]), None);
        assert_eq!(min(&[]), None);
        assert_eq!(max(&[]), None);
        assert_eq!(population_std_dev(&[]), None);
        assert_eq!(median(&[]), None);
        assert!(SampleSummary::from_samples(&[]).is_none());
    }

    #[test]
    fn test_population_std_dev_known_values() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert!((population_std_dev(&values).unwrap() - 2.0).abs() < 1e-12);
        assert_eq!(population_std_dev(&[42.0]), Some(0.0));
    }

    #[test]
    fn test_percentiles() {
        let values = [10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&values, 0.0), Some(10.0));
        assert_eq!(percentile(&values, 100.0), Some(40.0));
        assert_eq!(median(&values), Some(25.0));
        assert_eq!(percentile(&values, 101.0), None);
    }

    #[test]
    fn test_rate_mbps() {
        assert!((rate_mbps(125_000, 1.0) - 1.0).abs() < 1e-12);
        assert!((rate_mbps(100_000_000, 1.0) - 800.0).abs() < 1e-9);
        assert_eq!(rate_mbps(1_000, 0.0), 0.0);
        assert_eq!(rate_mbps(1_000, f64::NAN), 0.0);
    }

    #[test]
    fn test_sample_summary() {
        let samples = vec![
            Sample::new(16.0, 10.0),
            Sample::new(32.0, 30.0),
            Sample::new(48.0, 20.0),
        ];
        let summary = SampleSummary::from_samples(&samples).unwrap();
        assert_eq!(summary.sample_count, 3);
        assert_eq!(summary.peak_mbps, 30.0);
        assert_eq!(summary.mean_mbps, 20.0);
        assert_eq!(summary.final_mbps, 20.0);
    }

    proptest! {
        #[test]
        fn prop_min_never_exceeds_mean(values in prop::collection::vec(0.1f64..5000.0, 1..64)) {
            let lo = min(&values).unwrap();
            let avg = mean(&values).unwrap();
            prop_assert!(lo <= avg + 1e-9);
        }

        #[test]
        fn prop_std_dev_is_finite_and_non_negative(values in prop::collection::vec(0.1f64..5000.0, 1..64)) {
            let sd = population_std_dev(&values).unwrap();
            prop_assert!(sd.is_finite());
            prop_assert!(sd >= 0.0);
        }

        #[test]
        fn prop_constant_series_has_zero_jitter(value in 0.1f64..5000.0, len in 1usize..32) {
            let values = vec![value; len];
            prop_assert!(population_std_dev(&values).unwrap() < 1e-9);
        }

        #[test]
        fn prop_rate_scales_with_bytes(bytes in 0u64..10_000_000_000, secs in 0.001f64..120.0) {
            let rate = rate_mbps(bytes, secs);
            prop_assert!((rate - bytes as f64 * 8.0 / secs / 1e6).abs() <= 1e-6 * rate.max(1.0));
        }
    }
}
