//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::{AppError, Result},
    models::Config,
};

/// Configuration parser that combines CLI arguments with environment variables
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        self.load_env_file()?;

        config.merge_from_env()?;

        self.apply_cli_overrides(&mut config)?;

        config.validate()?;

        Ok(config)
    }

    /// Load .env file if it exists
    fn load_env_file(&self) -> Result<()> {
        EnvManager::load_env_file(self.cli.debug)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        self.cli.validate().map_err(AppError::config)?;

        if let Some(ref url) = self.cli.download_url {
            config.download_url = url.clone();
        }

        if let Some(ref url) = self.cli.upload_url {
            config.upload_url = url.clone();
        }

        if let Some(count) = self.cli.ping_count {
            config.ping_count = count;
        }

        if let Some(secs) = self.cli.download_secs {
            config.download_window_ms = secs_to_ms(secs);
        }

        if let Some(secs) = self.cli.upload_secs {
            config.upload_window_ms = secs_to_ms(secs);
        }

        if let Some(workers) = self.cli.workers {
            config.workers = workers;
        }

        if let Some(timeout) = self.cli.request_timeout_ms {
            config.request_timeout_ms = timeout;
        }

        if self.cli.color {
            config.enable_color = true;
        } else if self.cli.no_color || self.cli.json {
            config.enable_color = false;
        }

        // CLI-only switches
        config.skip_download = self.cli.skip_download;
        config.skip_upload = self.cli.skip_upload;
        config.json_output = self.cli.json;
        config.verbose = self.cli.verbose;
        config.debug = self.cli.debug;

        if config.debug {
            eprintln!("Applied CLI overrides to configuration");
            eprintln!(
                "Final config: pings={}, windows={}ms/{}ms, workers={}, enable_color={}",
                config.ping_count,
                config.download_window_ms,
                config.upload_window_ms,
                config.workers,
                config.enable_color
            );
        }

        Ok(())
    }
}

fn secs_to_ms(secs: f64) -> u64 {
    (secs * 1000.0).round().max(1.0) as u64
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Display configuration summary for debug purposes
pub fn display_config_summary(config: &Config) -> String {
    let mut summary = Vec::new();

    summary.push(format!("Download URL: {}", config.download_url));
    summary.push(format!("Upload URL: {}", config.upload_url));
    summary.push(format!("Pings: {} ({}ms apart)", config.ping_count, config.ping_interval_ms));
    summary.push(format!("Download Window: {}ms", config.download_window_ms));
    summary.push(format!("Upload Window: {}ms", config.upload_window_ms));
    summary.push(format!("Workers: {}", config.workers));
    summary.push(format!(
        "Timeouts: request {}ms, upload {}ms, backoff {}ms",
        config.request_timeout_ms, config.upload_timeout_ms, config.retry_backoff_ms
    ));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
