//! Network Speed Tester
//!
//! Measures round-trip latency, jitter and sustained download/upload
//! throughput against an HTTP sink service. The measurement engine lives in
//! [`executor`]; the `nst` binary wraps it with configuration, live progress
//! and a graded report.

pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod models;
pub mod output;
pub mod stats;
pub mod types;

// Re-export commonly used types
pub use client::{ClientFactory, HttpTransferClient, TransferClient};
pub use error::{AppError, Result};
pub use executor::{EngineConfig, ProgressEvent, SpeedTestEngine};
pub use models::{Config, LatencyResult, Sample, SpeedTestReport, ThroughputResult, TransferDirection};
pub use output::{ColoredFormatter, OutputCoordinator, OutputFormatter, OutputFormatterFactory, PlainFormatter};
pub use types::{EngineState, NetworkGrade, Phase};

/// Application version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Build metadata exported by `build.rs`
pub mod build_info {
    pub const BUILD_TIME: &str = match option_env!("BUILD_TIME") {
        Some(value) => value,
        None => "unknown",
    };
    pub const GIT_COMMIT: &str = match option_env!("GIT_COMMIT") {
        Some(value) => value,
        None => "unknown",
    };
    pub const TARGET_TRIPLE: &str = match option_env!("TARGET_TRIPLE") {
        Some(value) => value,
        None => "unknown",
    };

    /// One-line description used by `--debug`
    pub fn summary() -> String {
        format!(
            "{} v{} ({}, built {} for {})",
            super::PKG_NAME,
            super::VERSION,
            GIT_COMMIT,
            BUILD_TIME,
            TARGET_TRIPLE
        )
    }
}

/// Default configuration values
pub mod defaults {
    use std::time::Duration;

    pub const DEFAULT_DOWNLOAD_URL: &str = "https://speed.cloudflare.com/__down";
    pub const DEFAULT_UPLOAD_URL: &str = "https://speed.cloudflare.com/__up";

    pub const DEFAULT_PING_COUNT: u32 = 8;
    pub const DEFAULT_PING_INTERVAL: Duration = Duration::from_millis(50);

    pub const DEFAULT_DOWNLOAD_WINDOW: Duration = Duration::from_secs(8);
    pub const DEFAULT_UPLOAD_WINDOW: Duration = Duration::from_secs(10);
    pub const DEFAULT_WORKERS: usize = 4;

    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(2000);
    pub const DEFAULT_UPLOAD_TIMEOUT: Duration = Duration::from_millis(5000);
    pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(200);

    /// 25 MB per download request
    pub const DEFAULT_DOWNLOAD_REQUEST_BYTES: u64 = 25_000_000;
    /// 1 MiB per upload request
    pub const DEFAULT_UPLOAD_PAYLOAD_BYTES: usize = 1_048_576;

    /// Roughly one display frame
    pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(16);

    pub const DEFAULT_ENABLE_COLOR: bool = true;

    pub const MAX_PING_COUNT: u32 = 100;
    pub const MAX_WINDOW_MS: u64 = 120_000;
    pub const MAX_WORKERS: usize = 32;
}
