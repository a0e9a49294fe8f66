//! Environment variable handling and .env file management

use crate::error::{AppError, Result};
use std::path::Path;

/// Environment variable configuration manager
pub struct EnvManager;

impl EnvManager {
    /// Load .env file if it exists
    pub fn load_env_file(debug: bool) -> Result<()> {
        if Path::new(".env").exists() {
            dotenv::from_filename(".env")
                .map_err(|e| AppError::config(format!("Failed to load .env file: {}", e)))?;

            if debug {
                eprintln!("Loaded configuration from .env file");
            }
        } else if debug {
            eprintln!("No .env file found, using defaults and CLI arguments");
        }

        Ok(())
    }

    /// Create example .env file content
    pub fn create_example_env_content() -> String {
        r#"# Network Speed Tester Configuration
#
# Values specified here are used as defaults and can be overridden by
# command-line arguments.

# Sink endpoints. The download sink must stream back ?bytes=N bytes,
# the upload sink must accept arbitrary POST bodies.
# DOWNLOAD_URL=https://speed.cloudflare.com/__down
# UPLOAD_URL=https://speed.cloudflare.com/__up

# Number of latency round trips (1-100)
# PING_COUNT=8

# Phase windows in milliseconds (up to 120000)
# DOWNLOAD_WINDOW_MS=8000
# UPLOAD_WINDOW_MS=10000

# Concurrent workers per throughput phase (1-32)
# WORKERS=4

# Per-request timeout and retry backoff in milliseconds
# REQUEST_TIMEOUT_MS=2000
# RETRY_BACKOFF_MS=200

# Enable colored output (true/false)
# ENABLE_COLOR=true
"#
        .to_string()
    }

    /// Save example .env file to disk
    pub fn save_example_env_file(path: &Path) -> Result<()> {
        let content = Self::create_example_env_content();
        std::fs::write(path, content)
            .map_err(|e| AppError::config(format!("Failed to write example .env file: {}", e)))?;

        Ok(())
    }

    /// Validate environment variable format before parsing
    pub fn validate_env_var(key: &str, value: &str) -> Result<()> {
        match key {
            "DOWNLOAD_URL" | "UPLOAD_URL" => {
                let parsed = url::Url::parse(value.trim())
                    .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
                if !matches!(parsed.scheme(), "http" | "https") {
                    return Err(AppError::config(format!("{} must use http or https: {}", key, value)));
                }
            }
            "PING_COUNT" => Self::check_range::<u32>(key, value, 1, 100)?,
            "DOWNLOAD_WINDOW_MS" | "UPLOAD_WINDOW_MS" => Self::check_range::<u64>(key, value, 1, 120_000)?,
            "WORKERS" => Self::check_range::<usize>(key, value, 1, 32)?,
            "REQUEST_TIMEOUT_MS" => Self::check_range::<u64>(key, value, 1, 600_000)?,
            "RETRY_BACKOFF_MS" => Self::check_range::<u64>(key, value, 0, 60_000)?,
            "ENABLE_COLOR" => {
                value
                    .parse::<bool>()
                    .map_err(|e| AppError::config(format!("Invalid ENABLE_COLOR value '{}': {}", value, e)))?;
            }
            _ => {
                // Unknown environment variable, ignore
            }
        }

        Ok(())
    }

    fn check_range<T>(key: &str, value: &str, min: T, max: T) -> Result<()>
    where
        T: std::str::FromStr + PartialOrd + std::fmt::Display,
        T::Err: std::fmt::Display,
    {
        let parsed: T = value
            .parse()
            .map_err(|e| AppError::config(format!("Invalid {} value '{}': {}", key, value, e)))?;
        if parsed < min || parsed > max {
            return Err(AppError::config(format!(
                "{} must be between {} and {}, got: {}",
                key, min, max, parsed
            )));
        }
        Ok(())
    }

    /// Get list of all supported environment variables with descriptions
    pub fn get_supported_env_vars() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("DOWNLOAD_URL", "Download sink URL", "https://speed.cloudflare.com/__down"),
            ("UPLOAD_URL", "Upload sink URL", "https://speed.cloudflare.com/__up"),
            ("PING_COUNT", "Number of latency round trips (1-100)", "8"),
            ("DOWNLOAD_WINDOW_MS", "Download window in milliseconds", "8000"),
            ("UPLOAD_WINDOW_MS", "Upload window in milliseconds", "10000"),
            ("WORKERS", "Concurrent workers per phase (1-32)", "4"),
            ("REQUEST_TIMEOUT_MS", "Per-request timeout in milliseconds", "2000"),
            ("RETRY_BACKOFF_MS", "Backoff after a failed transfer in milliseconds", "200"),
            ("ENABLE_COLOR", "Enable colored output", "true"),
        ]
    }

    /// Display environment variable help
    pub fn display_env_help() -> String {
        let mut help = String::new();
        help.push_str("Supported Environment Variables:\n\n");

        for (var, description, example) in Self::get_supported_env_vars() {
            help.push_str(&format!("  {:<20} {}\n", var, description));
            help.push_str(&format!("  {:<20} Example: {}\n\n", "", example));
        }

        help.push_str("Configuration Priority (highest to lowest):\n");
        help.push_str("  1. Command-line arguments\n");
        help.push_str("  2. Environment variables\n");
        help.push_str("  3. .env file values\n");
        help.push_str("  4. Default values\n");

        help
    }

    /// Validate all currently set environment variables
    pub fn validate_current_env() -> Vec<String> {
        Self::get_supported_env_vars()
            .into_iter()
            .filter_map(|(var_name, _, _)| {
                let value = std::env::var(var_name).ok()?;
                Self::validate_env_var(var_name, &value)
                    .err()
                    .map(|e| format!("Warning: {}", e))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_example_content_lists_every_variable() {
        let content = EnvManager::create_example_env_content();
        for (var, _, _) in EnvManager::get_supported_env_vars() {
            assert!(content.contains(&format!("{}=", var)), "missing {}", var);
        }
    }

    #[test]
    fn test_save_example_file() {
        let temp_file = NamedTempFile::new().unwrap();
        EnvManager::save_example_env_file(temp_file.path()).unwrap();

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.contains("Network Speed Tester Configuration"));
    }

    #[test]
    fn test_validate_env_var() {
        assert!(EnvManager::validate_env_var("DOWNLOAD_URL", "https://speed.example.com/__down").is_ok());
        assert!(EnvManager::validate_env_var("PING_COUNT", "8").is_ok());
        assert!(EnvManager::validate_env_var("DOWNLOAD_WINDOW_MS", "8000").is_ok());
        assert!(EnvManager::validate_env_var("WORKERS", "32").is_ok());
        assert!(EnvManager::validate_env_var("RETRY_BACKOFF_MS", "0").is_ok());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "false").is_ok());
        assert!(EnvManager::validate_env_var("SOMETHING_ELSE", "whatever").is_ok());

        assert!(EnvManager::validate_env_var("UPLOAD_URL", "ftp://example.com").is_err());
        assert!(EnvManager::validate_env_var("UPLOAD_URL", "not-a-url").is_err());
        assert!(EnvManager::validate_env_var("PING_COUNT", "0").is_err());
        assert!(EnvManager::validate_env_var("PING_COUNT", "101").is_err());
        assert!(EnvManager::validate_env_var("UPLOAD_WINDOW_MS", "120001").is_err());
        assert!(EnvManager::validate_env_var("WORKERS", "33").is_err());
        assert!(EnvManager::validate_env_var("REQUEST_TIMEOUT_MS", "0").is_err());
        assert!(EnvManager::validate_env_var("ENABLE_COLOR", "maybe").is_err());
    }

    #[test]
    fn test_display_env_help() {
        let help = EnvManager::display_env_help();
        assert!(help.contains("Supported Environment Variables:"));
        assert!(help.contains("DOWNLOAD_URL"));
        assert!(help.contains("Configuration Priority"));
    }
}
