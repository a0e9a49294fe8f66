//! Configuration data model and validation

use crate::defaults;
use crate::types::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Sink endpoint streaming back `?bytes=N`
    #[serde(default = "default_download_url")]
    pub download_url: String,

    /// Sink endpoint accepting arbitrary request bodies
    #[serde(default = "default_upload_url")]
    pub upload_url: String,

    /// Number of latency round trips
    #[serde(default = "default_ping_count")]
    pub ping_count: u32,

    /// Pause between latency round trips (milliseconds)
    #[serde(default = "default_ping_interval_ms")]
    pub ping_interval_ms: u64,

    /// Download phase window (milliseconds)
    #[serde(default = "default_download_window_ms")]
    pub download_window_ms: u64,

    /// Upload phase window (milliseconds)
    #[serde(default = "default_upload_window_ms")]
    pub upload_window_ms: u64,

    /// Concurrent workers per throughput phase
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Per-request timeout for pings, response heads and stream chunks (milliseconds)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Per-request timeout for a whole upload (milliseconds)
    #[serde(default = "default_upload_timeout_ms")]
    pub upload_timeout_ms: u64,

    /// Backoff before retrying a failed transfer (milliseconds)
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Size of each download request (bytes)
    #[serde(default = "default_download_request_bytes")]
    pub download_request_bytes: u64,

    /// Size of the upload payload (bytes)
    #[serde(default = "default_upload_payload_bytes")]
    pub upload_payload_bytes: usize,

    /// Progress clock cadence (milliseconds)
    #[serde(default = "default_progress_interval_ms")]
    pub progress_interval_ms: u64,

    /// Skip the download phase
    #[serde(default)]
    pub skip_download: bool,

    /// Skip the upload phase
    #[serde(default)]
    pub skip_upload: bool,

    /// Print the final report as JSON
    #[serde(default)]
    pub json_output: bool,

    /// Enable colored terminal output
    #[serde(default = "default_enable_color")]
    pub enable_color: bool,

    /// Enable verbose output
    #[serde(default)]
    pub verbose: bool,

    /// Enable debug output
    #[serde(default)]
    pub debug: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_url: default_download_url(),
            upload_url: default_upload_url(),
            ping_count: default_ping_count(),
            ping_interval_ms: default_ping_interval_ms(),
            download_window_ms: default_download_window_ms(),
            upload_window_ms: default_upload_window_ms(),
            workers: default_workers(),
            request_timeout_ms: default_request_timeout_ms(),
            upload_timeout_ms: default_upload_timeout_ms(),
            retry_backoff_ms: default_retry_backoff_ms(),
            download_request_bytes: default_download_request_bytes(),
            upload_payload_bytes: default_upload_payload_bytes(),
            progress_interval_ms: default_progress_interval_ms(),
            skip_download: false,
            skip_upload: false,
            json_output: false,
            enable_color: default_enable_color(),
            verbose: false,
            debug: false,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn download_window(&self) -> Duration {
        Duration::from_millis(self.download_window_ms)
    }

    pub fn upload_window(&self) -> Duration {
        Duration::from_millis(self.upload_window_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Validate the configuration and return the first error
    pub fn validate(&self) -> Result<()> {
        validate_sink_url("download", &self.download_url)?;
        validate_sink_url("upload", &self.upload_url)?;

        if self.ping_count == 0 {
            return Err(AppError::config("Ping count must be greater than 0"));
        }

        if self.ping_count > defaults::MAX_PING_COUNT {
            return Err(AppError::config(format!(
                "Ping count cannot exceed {}",
                defaults::MAX_PING_COUNT
            )));
        }

        for (name, window) in [("Download", self.download_window_ms), ("Upload", self.upload_window_ms)] {
            if window == 0 {
                return Err(AppError::config(format!("{} window must be greater than 0", name)));
            }
            if window > defaults::MAX_WINDOW_MS {
                return Err(AppError::config(format!(
                    "{} window cannot exceed {} seconds",
                    name,
                    defaults::MAX_WINDOW_MS / 1000
                )));
            }
        }

        if self.workers == 0 {
            return Err(AppError::config("Worker count must be greater than 0"));
        }

        if self.workers > defaults::MAX_WORKERS {
            return Err(AppError::config(format!(
                "Worker count cannot exceed {}",
                defaults::MAX_WORKERS
            )));
        }

        if self.request_timeout_ms == 0 || self.upload_timeout_ms == 0 {
            return Err(AppError::config("Request timeouts must be greater than 0"));
        }

        if self.progress_interval_ms == 0 {
            return Err(AppError::config("Progress interval must be greater than 0"));
        }

        if self.download_request_bytes == 0 || self.upload_payload_bytes == 0 {
            return Err(AppError::config("Transfer sizes must be greater than 0"));
        }

        Ok(())
    }

    /// Merge environment variables into this configuration
    pub fn merge_from_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("DOWNLOAD_URL") {
            self.download_url = url.trim().to_string();
        }

        if let Ok(url) = std::env::var("UPLOAD_URL") {
            self.upload_url = url.trim().to_string();
        }

        if let Ok(count) = std::env::var("PING_COUNT") {
            self.ping_count = count.parse()
                .map_err(|e| AppError::config(format!("Invalid PING_COUNT value '{}': {}", count, e)))?;
        }

        if let Ok(window) = std::env::var("DOWNLOAD_WINDOW_MS") {
            self.download_window_ms = window.parse()
                .map_err(|e| AppError::config(format!("Invalid DOWNLOAD_WINDOW_MS value '{}': {}", window, e)))?;
        }

        if let Ok(window) = std::env::var("UPLOAD_WINDOW_MS") {
            self.upload_window_ms = window.parse()
                .map_err(|e| AppError::config(format!("Invalid UPLOAD_WINDOW_MS value '{}': {}", window, e)))?;
        }

        if let Ok(workers) = std::env::var("WORKERS") {
            self.workers = workers.parse()
                .map_err(|e| AppError::config(format!("Invalid WORKERS value '{}': {}", workers, e)))?;
        }

        if let Ok(timeout) = std::env::var("REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = timeout.parse()
                .map_err(|e| AppError::config(format!("Invalid REQUEST_TIMEOUT_MS value '{}': {}", timeout, e)))?;
        }

        if let Ok(backoff) = std::env::var("RETRY_BACKOFF_MS") {
            self.retry_backoff_ms = backoff.parse()
                .map_err(|e| AppError::config(format!("Invalid RETRY_BACKOFF_MS value '{}': {}", backoff, e)))?;
        }

        if let Ok(enable_color) = std::env::var("ENABLE_COLOR") {
            self.enable_color = enable_color.parse()
                .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", enable_color, e)))?;
        }

        Ok(())
    }
}

fn validate_sink_url(kind: &str, url: &str) -> Result<()> {
    if url.is_empty() {
        return Err(AppError::config(format!("The {} URL cannot be empty", kind)));
    }

    let parsed = url::Url::parse(url)
        .map_err(|e| AppError::config(format!("Invalid {} URL '{}': {}", kind, url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(AppError::config(format!(
            "The {} URL must use http or https, got '{}'",
            kind, scheme
        ))),
    }
}

fn default_download_url() -> String {
    defaults::DEFAULT_DOWNLOAD_URL.to_string()
}

fn default_upload_url() -> String {
    defaults::DEFAULT_UPLOAD_URL.to_string()
}

fn default_ping_count() -> u32 {
    defaults::DEFAULT_PING_COUNT
}

fn default_ping_interval_ms() -> u64 {
    defaults::DEFAULT_PING_INTERVAL.as_millis() as u64
}

fn default_download_window_ms() -> u64 {
    defaults::DEFAULT_DOWNLOAD_WINDOW.as_millis() as u64
}

fn default_upload_window_ms() -> u64 {
    defaults::DEFAULT_UPLOAD_WINDOW.as_millis() as u64
}

fn default_workers() -> usize {
    defaults::DEFAULT_WORKERS
}

fn default_request_timeout_ms() -> u64 {
    defaults::DEFAULT_REQUEST_TIMEOUT.as_millis() as u64
}

fn default_upload_timeout_ms() -> u64 {
    defaults::DEFAULT_UPLOAD_TIMEOUT.as_millis() as u64
}

fn default_retry_backoff_ms() -> u64 {
    defaults::DEFAULT_RETRY_BACKOFF.as_millis() as u64
}

fn default_download_request_bytes() -> u64 {
    defaults::DEFAULT_DOWNLOAD_REQUEST_BYTES
}

fn default_upload_payload_bytes() -> usize {
    defaults::DEFAULT_UPLOAD_PAYLOAD_BYTES
}

fn default_progress_interval_ms() -> u64 {
    defaults::DEFAULT_PROGRESS_INTERVAL.as_millis() as u64
}

fn default_enable_color() -> bool {
    defaults::DEFAULT_ENABLE_COLOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.ping_count, 8);
        assert_eq!(config.workers, 4);
        assert_eq!(config.download_window(), Duration::from_secs(8));
        assert_eq!(config.upload_window(), Duration::from_secs(10));
    }

    #[test]
    fn test_rejects_non_http_urls() {
        let config = Config {
            download_url: "ftp://speed.example.com/__down".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));

        let config = Config {
            upload_url: "not a url".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_range_numbers() {
        let cases = [
            Config { ping_count: 0, ..Default::default() },
            Config { ping_count: 101, ..Default::default() },
            Config { download_window_ms: 0, ..Default::default() },
            Config { upload_window_ms: 121_000, ..Default::default() },
            Config { workers: 0, ..Default::default() },
            Config { workers: 33, ..Default::default() },
            Config { request_timeout_ms: 0, ..Default::default() },
            Config { progress_interval_ms: 0, ..Default::default() },
            Config { upload_payload_bytes: 0, ..Default::default() },
        ];

        for config in cases {
            assert!(config.validate().is_err(), "expected rejection for {:?}", config);
        }
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: Config = serde_json::from_str(r#"{"workers": 2, "verbose": true}"#).unwrap();
        assert_eq!(config.workers, 2);
        assert!(config.verbose);
        assert_eq!(config.download_url, defaults::DEFAULT_DOWNLOAD_URL);
    }
}
