//! Configuration validation utilities and rules

use crate::{
    error::{AppError, Result},
    models::Config,
};
use colored::Colorize;

/// Configuration validator producing non-fatal advisories on top of `Config::validate`
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate configuration with comprehensive checks
    pub fn validate_comprehensive(config: &Config) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        config.validate()?;

        warnings.extend(Self::validate_sink_url("download", &config.download_url)?);
        warnings.extend(Self::validate_sink_url("upload", &config.upload_url)?);
        warnings.extend(Self::validate_measurement_settings(config));

        Ok(warnings)
    }

    /// Validate a sink URL with detailed checks
    fn validate_sink_url(kind: &str, url: &str) -> Result<Vec<ValidationWarning>> {
        let mut warnings = Vec::new();

        let parsed = url::Url::parse(url)
            .map_err(|e| AppError::config(format!("Invalid {} URL '{}': {}", kind, url, e)))?;

        if parsed.scheme() == "http" {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("The {} URL '{}' uses plain HTTP", kind, url),
            ));
        }

        match parsed.host() {
            Some(url::Host::Ipv4(ip)) if ip.is_private() || ip.is_loopback() => {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("The {} URL targets a private/local network; results will not reflect internet speed", kind),
                ));
            }
            Some(url::Host::Domain("localhost")) => {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("The {} URL targets localhost; results will not reflect internet speed", kind),
                ));
            }
            _ => {}
        }

        if parsed.query().is_some() {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("The {} URL '{}' already has query parameters; cache-busting parameters will be appended", kind, url),
            ));
        }

        Ok(warnings)
    }

    /// Validate measurement-related settings
    fn validate_measurement_settings(config: &Config) -> Vec<ValidationWarning> {
        let mut warnings = Vec::new();

        if config.ping_count < 3 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("{} ping(s) may not give a meaningful jitter figure (recommended: >= 3)", config.ping_count),
            ));
        }

        for (phase, window_ms) in [("download", config.download_window_ms), ("upload", config.upload_window_ms)] {
            if window_ms < 2_000 {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Warning,
                    format!("A {} window of {}ms is dominated by TCP slow start", phase, window_ms),
                ));
            } else if window_ms > 30_000 {
                warnings.push(ValidationWarning::new(
                    ValidationLevel::Info,
                    format!("A {} window of {}s will move a lot of data on metered links", phase, window_ms / 1000),
                ));
            }
        }

        if config.workers == 1 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                "A single worker rarely saturates a fast link".to_string(),
            ));
        } else if config.workers > 16 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                format!("{} workers may trigger rate limiting on public sinks", config.workers),
            ));
        }

        if config.request_timeout_ms < 500 {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!("Request timeout of {}ms may abort healthy requests", config.request_timeout_ms),
            ));
        }

        let shortest_window = config.download_window_ms.min(config.upload_window_ms);
        if config.request_timeout_ms >= shortest_window {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Warning,
                format!(
                    "Request timeout of {}ms is not shorter than the {}ms window; a stalled request can idle a worker for the whole phase",
                    config.request_timeout_ms, shortest_window
                ),
            ));
        }

        if config.skip_download && config.skip_upload {
            warnings.push(ValidationWarning::new(
                ValidationLevel::Info,
                "Both throughput phases are skipped; only latency will be measured".to_string(),
            ));
        }

        warnings
    }
}

/// Validation warning levels
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationLevel {
    Info,
    Warning,
}

impl ValidationLevel {
    /// Get display string for level
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

/// Configuration validation warning
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    /// Create a new validation warning
    pub fn new(level: ValidationLevel, message: String) -> Self {
        Self { level, message }
    }

    /// Format warning for display
    pub fn format(&self, use_color: bool) -> String {
        let tag = format!("[{}]", self.level.as_str());
        let tag = if use_color {
            match self.level {
                ValidationLevel::Info => tag.blue().to_string(),
                ValidationLevel::Warning => tag.yellow().to_string(),
            }
        } else {
            tag
        };
        format!("{} {}", tag, self.message)
    }
}

/// Convenience function for comprehensive configuration validation
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    ConfigValidator::validate_comprehensive(config)
}
