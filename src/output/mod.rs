//! Output formatting and display system
//!
//! This module renders live progress and final speed test reports,
//! supporting colored and plain text output as well as JSON.

mod colored;
mod formatter;

pub use colored::{ColorScheme, ColoredFormatter, LatencyLevel, SpeedLevel};
pub use formatter::{
    format_duration, format_percentage, format_rate, sparkline, FormattingOptions, OutputFormatter,
    PlainFormatter,
};

use crate::{error::Result, executor::ProgressEvent, models::SpeedTestReport, types::Phase};
use std::io::Write;
use std::sync::Mutex;

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool) -> Box<dyn OutputFormatter> {
        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            ..Default::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn OutputFormatter> {
        Self::create_formatter(false, false)
    }
}

/// Coordinates everything the CLI prints for one run
///
/// Results go to stdout; the live progress line is redrawn in place on
/// stderr so that piping stdout captures only the report.
pub struct OutputCoordinator {
    formatter: Box<dyn OutputFormatter>,
    json: bool,
    last_phase: Mutex<Option<Phase>>,
}

impl OutputCoordinator {
    pub fn new(formatter: Box<dyn OutputFormatter>, json: bool) -> Self {
        Self {
            formatter,
            json,
            last_phase: Mutex::new(None),
        }
    }

    pub fn formatter(&self) -> &dyn OutputFormatter {
        self.formatter.as_ref()
    }

    /// Render the final report, as JSON when requested
    pub fn display_report(&self, report: &SpeedTestReport) -> Result<String> {
        if self.json {
            return Ok(serde_json::to_string_pretty(report)?);
        }
        self.formatter.format_report(report)
    }

    /// Redraw the progress line for `event`; a new phase starts a new line
    pub fn display_progress(&self, event: &ProgressEvent<'_>) {
        if self.json {
            return;
        }
        let Ok(line) = self.formatter.format_progress(event) else {
            return;
        };

        let mut last_phase = self.last_phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut stderr = std::io::stderr().lock();
        if last_phase.is_some_and(|phase| phase != event.phase) {
            let _ = writeln!(stderr);
        }
        *last_phase = Some(event.phase);
        let _ = write!(stderr, "\r{}", line);
        let _ = stderr.flush();
    }

    /// Terminate the progress line, if one was drawn
    pub fn finish_progress(&self) {
        let mut last_phase = self.last_phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if last_phase.take().is_some() {
            eprintln!();
        }
    }
}
