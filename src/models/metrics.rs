//! Measurement data models: samples, latency and throughput results

use crate::stats;
use crate::types::NetworkGrade;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One point on the live rate curve of a throughput phase
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Milliseconds since the phase started
    pub elapsed_ms: f64,
    /// Cumulative average rate at this instant, in megabits per second
    pub rate_mbps: f64,
}

impl Sample {
    pub fn new(elapsed_ms: f64, rate_mbps: f64) -> Self {
        Self { elapsed_ms, rate_mbps }
    }
}

/// Direction of a throughput phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransferDirection {
    Download,
    Upload,
}

impl TransferDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "download",
            Self::Upload => "upload",
        }
    }
}

impl std::fmt::Display for TransferDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a latency probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyResult {
    /// Fastest successful round trip (milliseconds)
    pub min_latency_ms: f64,

    /// Population standard deviation of the successful trips (milliseconds)
    pub jitter_ms: f64,

    /// Arithmetic mean of the successful trips (milliseconds)
    pub avg_latency_ms: f64,

    /// Slowest successful round trip (milliseconds)
    pub max_latency_ms: f64,

    /// Number of trips that completed
    pub successful_trips: usize,

    /// Number of trips attempted
    pub total_trips: usize,

    /// Raw durations of the successful trips, in issue order
    pub trips_ms: Vec<f64>,
}

impl LatencyResult {
    /// Summarise successful trip durations.
    ///
    /// Returns `None` when there is no successful trip; a single trip has a
    /// jitter of zero.
    pub fn from_trips(trips_ms: &[f64], total_trips: usize) -> Option<Self> {
        let min_latency_ms = stats::min(trips_ms)?;
        let max_latency_ms = stats::max(trips_ms)?;
        let avg_latency_ms = stats::mean(trips_ms)?;
        let jitter_ms = stats::population_std_dev(trips_ms)?;

        Some(Self {
            min_latency_ms,
            jitter_ms,
            avg_latency_ms,
            max_latency_ms,
            successful_trips: trips_ms.len(),
            total_trips: total_trips.max(trips_ms.len()),
            trips_ms: trips_ms.to_vec(),
        })
    }

    /// Percentage of trips that completed
    pub fn success_rate(&self) -> f64 {
        if self.total_trips == 0 {
            0.0
        } else {
            (self.successful_trips as f64 / self.total_trips as f64) * 100.0
        }
    }
}

/// Outcome of a download or upload phase
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThroughputResult {
    /// Which phase produced this figure
    pub direction: TransferDirection,

    /// Realised average rate over the whole window (megabits per second)
    pub mbps: f64,

    /// Bytes credited to the shared counter during the phase
    pub bytes_transferred: u64,

    /// Wall-clock duration of the phase (milliseconds)
    pub elapsed_ms: f64,

    /// Live rate curve emitted while the phase ran
    pub samples: Vec<Sample>,
}

impl ThroughputResult {
    /// Build a result from wall-clock totals; the rate never averages samples
    pub fn from_totals(
        direction: TransferDirection,
        bytes_transferred: u64,
        elapsed_ms: f64,
        samples: Vec<Sample>,
    ) -> Self {
        Self {
            direction,
            mbps: stats::rate_mbps(bytes_transferred, elapsed_ms / 1000.0),
            bytes_transferred,
            elapsed_ms,
            samples,
        }
    }

    /// Whether the phase moved no data at all (e.g. uploads blocked by a proxy)
    pub fn is_zero(&self) -> bool {
        self.bytes_transferred == 0
    }

    /// Megabytes moved, for display
    pub fn megabytes(&self) -> f64 {
        self.bytes_transferred as f64 / 1_000_000.0
    }
}

/// Aggregate of a complete speed test run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeedTestReport {
    pub latency: LatencyResult,
    pub download: Option<ThroughputResult>,
    pub upload: Option<ThroughputResult>,
    pub grade: NetworkGrade,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

impl SpeedTestReport {
    pub fn new(
        latency: LatencyResult,
        download: Option<ThroughputResult>,
        upload: Option<ThroughputResult>,
        started_at: DateTime<Utc>,
    ) -> Self {
        let download_mbps = download.as_ref().map(|d| d.mbps).unwrap_or(0.0);
        let grade = NetworkGrade::from_results(download_mbps, latency.min_latency_ms);

        Self {
            latency,
            download,
            upload,
            grade,
            started_at,
            completed_at: Utc::now(),
        }
    }

    pub fn download_mbps(&self) -> f64 {
        self.download.as_ref().map(|d| d.mbps).unwrap_or(0.0)
    }

    pub fn upload_mbps(&self) -> f64 {
        self.upload.as_ref().map(|u| u.mbps).unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latency_from_spiky_trips() {
        let trips = [20.0, 22.0, 18.0, 200.0, 21.0, 19.0, 23.0, 20.0];
        let result = LatencyResult::from_trips(&trips, 8).unwrap();

        assert_eq!(result.min_latency_ms, 18.0);
        assert_eq!(result.max_latency_ms, 200.0);
        assert!((result.avg_latency_ms - 42.875).abs() < 1e-9);
        // Population standard deviation, not the sample (n - 1) variant.
        assert!((result.jitter_ms - 59.4063).abs() < 1e-3);
        assert_eq!(result.successful_trips, 8);
        assert_eq!(result.success_rate(), 100.0);
    }

    #[test]
    fn test_latency_single_trip_has_zero_jitter() {
        let result = LatencyResult::from_trips(&[35.5], 8).unwrap();
        assert_eq!(result.min_latency_ms, 35.5);
        assert_eq!(result.jitter_ms, 0.0);
        assert!(!result.jitter_ms.is_nan());
        assert_eq!(result.success_rate(), 12.5);
    }

    #[test]
    fn test_latency_requires_a_trip() {
        assert!(LatencyResult::from_trips(&[], 8).is_none());
    }

    #[test]
    fn test_throughput_from_totals() {
        // 100 MB in one second is 800 Mbps.
        let result = ThroughputResult::from_totals(TransferDirection::Download, 100_000_000, 1000.0, Vec::new());
        assert!((result.mbps - 800.0).abs() < 1e-9);
        assert!((result.megabytes() - 100.0).abs() < 1e-9);
        assert!(!result.is_zero());
    }

    #[test]
    fn test_throughput_ignores_samples_for_final_rate() {
        let samples = vec![Sample::new(100.0, 5000.0), Sample::new(200.0, 4000.0)];
        let result = ThroughputResult::from_totals(TransferDirection::Upload, 1_000_000, 2000.0, samples);
        assert!((result.mbps - 4.0).abs() < 1e-9);
        assert_eq!(result.samples.len(), 2);
    }

    #[test]
    fn test_zero_throughput_is_not_nan() {
        let result = ThroughputResult::from_totals(TransferDirection::Upload, 0, 0.0, Vec::new());
        assert_eq!(result.mbps, 0.0);
        assert!(result.is_zero());
    }

    #[test]
    fn test_report_grades_from_download_and_ping() {
        let latency = LatencyResult::from_trips(&[12.0, 14.0], 2).unwrap();
        let download = ThroughputResult::from_totals(TransferDirection::Download, 50_000_000, 1000.0, Vec::new());
        let report = SpeedTestReport::new(latency, Some(download), None, Utc::now());

        assert_eq!(report.grade.grade, "A+");
        assert!((report.download_mbps() - 400.0).abs() < 1e-9);
        assert_eq!(report.upload_mbps(), 0.0);
    }

    #[test]
    fn test_report_serializes() {
        let latency = LatencyResult::from_trips(&[30.0], 1).unwrap();
        let report = SpeedTestReport::new(latency, None, None, Utc::now());
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"min_latency_ms\":30.0"));
        assert!(json.contains("\"grade\""));
    }
}
