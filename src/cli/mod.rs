//! Command-line interface module

use clap::Parser;

/// Network Speed Tester - measure latency, jitter, download and upload throughput
#[derive(Parser, Debug, Clone)]
#[command(name = "nst")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Download sink URL (must stream back `?bytes=N` bytes)
    #[arg(long, value_name = "URL")]
    pub download_url: Option<String>,

    /// Upload sink URL (must accept POST bodies)
    #[arg(long, value_name = "URL")]
    pub upload_url: Option<String>,

    /// Number of latency round trips
    #[arg(short = 'p', long = "pings", value_name = "COUNT")]
    pub ping_count: Option<u32>,

    /// Download window in seconds (fractions allowed)
    #[arg(long, value_name = "SECS", value_parser = parse_window_secs)]
    pub download_secs: Option<f64>,

    /// Upload window in seconds (fractions allowed)
    #[arg(long, value_name = "SECS", value_parser = parse_window_secs)]
    pub upload_secs: Option<f64>,

    /// Concurrent workers per throughput phase
    #[arg(short, long, value_name = "N")]
    pub workers: Option<usize>,

    /// Per-request timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub request_timeout_ms: Option<u64>,

    /// Skip the download phase
    #[arg(long)]
    pub skip_download: bool,

    /// Skip the upload phase
    #[arg(long)]
    pub skip_upload: bool,

    /// Print the final report as JSON
    #[arg(long)]
    pub json: bool,

    /// Force colored output
    #[arg(long)]
    pub color: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Enable verbose output
    #[arg(long)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Validate CLI arguments for conflicts
    pub fn validate(&self) -> Result<(), String> {
        if self.color && self.no_color {
            return Err("Cannot specify both --color and --no-color".to_string());
        }

        if self.json && self.verbose {
            return Err("Cannot combine --json with --verbose".to_string());
        }

        Ok(())
    }

    /// Check if colors should be enabled
    pub fn use_colors(&self) -> bool {
        if self.color {
            true
        } else if self.no_color || self.json {
            false
        } else {
            supports_color()
        }
    }

    /// Get configuration summary for display
    pub fn get_config_summary(&self) -> String {
        let mut summary = String::new();

        summary.push_str("Command-line Overrides:\n");
        if let Some(ref url) = self.download_url {
            summary.push_str(&format!("  Download URL: {}\n", url));
        }
        if let Some(ref url) = self.upload_url {
            summary.push_str(&format!("  Upload URL: {}\n", url));
        }
        if let Some(count) = self.ping_count {
            summary.push_str(&format!("  Pings: {}\n", count));
        }
        if let Some(secs) = self.download_secs {
            summary.push_str(&format!("  Download window: {}s\n", secs));
        }
        if let Some(secs) = self.upload_secs {
            summary.push_str(&format!("  Upload window: {}s\n", secs));
        }
        if let Some(workers) = self.workers {
            summary.push_str(&format!("  Workers: {}\n", workers));
        }
        summary.push_str(&format!("  Colored output: {}\n", self.use_colors()));
        summary.push_str(&format!("  Verbose mode: {}\n", self.verbose));
        summary.push_str(&format!("  Debug mode: {}\n", self.debug));

        summary
    }
}

/// Parse a phase window given in (possibly fractional) seconds
fn parse_window_secs(s: &str) -> Result<f64, String> {
    let secs: f64 = s
        .trim()
        .parse()
        .map_err(|_| format!("Invalid window: {}", s))?;

    if !secs.is_finite() || secs <= 0.0 {
        Err("Window must be greater than 0 seconds".to_string())
    } else if secs > 120.0 {
        Err("Window cannot exceed 120 seconds".to_string())
    } else {
        Ok(secs)
    }
}

/// Check if the terminal supports color output
fn supports_color() -> bool {
    if let Ok(term) = std::env::var("TERM") {
        if term == "dumb" {
            return false;
        }
    }

    if std::env::var("NO_COLOR").is_ok() {
        return false;
    }

    if std::env::var("FORCE_COLOR").is_ok() {
        return true;
    }

    #[cfg(unix)]
    {
        true
    }
    #[cfg(not(unix))]
    {
        false
    }
}
