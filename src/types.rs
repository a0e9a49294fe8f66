//! Type definitions and aliases

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use crate::error::{AppError, Result};

/// Lifecycle of a speed test engine
///
/// Phases only move forward; `Complete`, `Aborted` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineState {
    Idle,
    ProbingLatency,
    MeasuringDownload,
    MeasuringUpload,
    Complete,
    Aborted,
    Failed,
}

impl EngineState {
    /// Position along the measurement sequence
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::ProbingLatency => 1,
            Self::MeasuringDownload => 2,
            Self::MeasuringUpload => 3,
            Self::Complete => 4,
            Self::Aborted | Self::Failed => u8::MAX,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Aborted | Self::Failed)
    }

    /// Whether an operation entering `next` may start from this state
    pub fn can_enter(&self, next: EngineState) -> bool {
        !self.is_terminal() && next.ordinal() > self.ordinal()
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ProbingLatency => "probing latency",
            Self::MeasuringDownload => "measuring download",
            Self::MeasuringUpload => "measuring upload",
            Self::Complete => "complete",
            Self::Aborted => "aborted",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for EngineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Measurement phase reported with every progress event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Latency,
    Download,
    Upload,
}

impl Phase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Latency => "Ping",
            Self::Download => "Download",
            Self::Upload => "Upload",
        }
    }

    /// Engine state while this phase runs
    pub fn state(&self) -> EngineState {
        match self {
            Self::Latency => EngineState::ProbingLatency,
            Self::Download => EngineState::MeasuringDownload,
            Self::Upload => EngineState::MeasuringUpload,
        }
    }
}

/// Letter grade for a connection, derived from download rate and ping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkGrade {
    /// A+, A, B, C or D
    pub grade: String,
    pub label: String,
    /// Highest streaming quality the link sustains comfortably
    pub streaming: String,
    /// Expected online gaming experience
    pub gaming: String,
}

impl NetworkGrade {
    fn new(grade: &str, label: &str, streaming: &str, gaming: &str) -> Self {
        Self {
            grade: grade.to_string(),
            label: label.to_string(),
            streaming: streaming.to_string(),
            gaming: gaming.to_string(),
        }
    }

    /// Classify a connection by download throughput (Mbps) and ping (ms)
    pub fn from_results(download_mbps: f64, ping_ms: f64) -> Self {
        if download_mbps > 300.0 && ping_ms < 20.0 {
            Self::new("A+", "Elite", "8K HDR", "Pro Level")
        } else if download_mbps > 100.0 && ping_ms < 40.0 {
            Self::new("A", "Excellent", "4K UHD", "Great")
        } else if download_mbps > 50.0 && ping_ms < 60.0 {
            Self::new("B", "Good", "4K/1080p", "Casual")
        } else if download_mbps > 25.0 {
            Self::new("C", "Average", "1080p", "Playable")
        } else {
            Self::new("D", "Basic", "720p", "Laggy")
        }
    }
}
