//! Core formatting traits and implementations
//!
//! This module defines the output formatting interface and provides
//! a plain text implementation used for pipes, logs and `--no-color`.

use crate::{
    error::{AppError, Result},
    executor::ProgressEvent,
    models::{LatencyResult, Sample, SpeedTestReport, ThroughputResult, TransferDirection},
    stats::SampleSummary,
    types::{NetworkGrade, Phase},
};
use std::fmt::Write as _;

/// Main trait for output formatting
pub trait OutputFormatter: Send + Sync {
    /// Format a header section
    fn format_header(&self, title: &str) -> Result<String>;

    /// Format the single-line live progress display for one event
    fn format_progress(&self, event: &ProgressEvent<'_>) -> Result<String>;

    /// Format the latency block
    fn format_latency(&self, latency: &LatencyResult) -> Result<String>;

    /// Format a download or upload block
    fn format_throughput(&self, result: &ThroughputResult) -> Result<String>;

    /// Format the connection grade
    fn format_grade(&self, grade: &NetworkGrade) -> Result<String>;

    /// Format error messages
    fn format_error(&self, error: &str) -> Result<String>;

    /// Format warning messages
    fn format_warning(&self, warning: &str) -> Result<String>;

    /// Format success messages
    fn format_success(&self, message: &str) -> Result<String>;

    /// Format a complete report: header, latency, throughput phases and grade
    fn format_report(&self, report: &SpeedTestReport) -> Result<String> {
        let mut output = String::new();

        output.push_str(&self.format_header("Network Speed Test Results")?);
        output.push_str("\n\n");
        output.push_str(&self.format_latency(&report.latency)?);

        for result in [&report.download, &report.upload].into_iter().flatten() {
            output.push_str("\n\n");
            output.push_str(&self.format_throughput(result)?);
        }

        output.push_str("\n\n");
        output.push_str(&self.format_grade(&report.grade)?);

        Ok(output)
    }
}

/// Configuration options for formatting
#[derive(Debug, Clone)]
pub struct FormattingOptions {
    /// Enable colored output
    pub enable_color: bool,
    /// Enable verbose mode with rate curves and raw trips
    pub verbose_mode: bool,
    /// Width of the live progress bar
    pub bar_width: usize,
    /// Width of the rate curve drawn in verbose mode
    pub sparkline_width: usize,
}

impl Default for FormattingOptions {
    fn default() -> Self {
        Self {
            enable_color: true,
            verbose_mode: false,
            bar_width: 24,
            sparkline_width: 60,
        }
    }
}

pub(crate) fn fmt_error(e: std::fmt::Error) -> AppError {
    AppError::io(format!("Failed to format output: {}", e))
}

/// Format a duration given in milliseconds
pub fn format_duration(duration_ms: f64) -> String {
    if duration_ms < 1.0 {
        format!("{:.2}μs", duration_ms * 1000.0)
    } else if duration_ms < 1000.0 {
        format!("{:.1}ms", duration_ms)
    } else if duration_ms < 60000.0 {
        format!("{:.2}s", duration_ms / 1000.0)
    } else {
        let minutes = (duration_ms / 60000.0) as u32;
        let seconds = (duration_ms % 60000.0) / 1000.0;
        format!("{}m{:.1}s", minutes, seconds)
    }
}

/// Format a rate in megabits per second, switching to Gbps above 1000
pub fn format_rate(mbps: f64) -> String {
    if mbps >= 1000.0 {
        format!("{:.2} Gbps", mbps / 1000.0)
    } else {
        format!("{:.2} Mbps", mbps)
    }
}

/// Format percentage with appropriate precision
pub fn format_percentage(percentage: f64) -> String {
    if percentage >= 99.95 {
        "100.0%".to_string()
    } else if percentage < 0.05 {
        "0.0%".to_string()
    } else {
        format!("{:.1}%", percentage)
    }
}

/// Number of filled cells of a `width`-wide bar at `percent`
pub(crate) fn filled_cells(percent: f64, width: usize) -> usize {
    ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize
}

const SPARK_LEVELS: &[u8] = b"_.-:=+*#%@";

/// Draw a rate curve as ASCII, one character per column
///
/// Curves longer than `width` are bucketed by averaging consecutive samples.
/// Heights are relative to the curve's own peak.
pub fn sparkline(samples: &[Sample], width: usize) -> String {
    if samples.is_empty() || width == 0 {
        return String::new();
    }

    let chunk = samples.len().div_ceil(width);
    let columns: Vec<f64> = samples
        .chunks(chunk)
        .map(|bucket| bucket.iter().map(|s| s.rate_mbps).sum::<f64>() / bucket.len() as f64)
        .collect();

    let peak = columns.iter().copied().fold(0.0_f64, f64::max);
    let top = (SPARK_LEVELS.len() - 1) as f64;

    columns
        .iter()
        .map(|rate| {
            let level = if peak > 0.0 { (rate / peak * top).round() as usize } else { 0 };
            SPARK_LEVELS[level.min(SPARK_LEVELS.len() - 1)] as char
        })
        .collect()
}

/// Plain text formatter implementation
pub struct PlainFormatter {
    options: FormattingOptions,
}

impl PlainFormatter {
    /// Create a new plain formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FormattingOptions {
        &self.options
    }

    fn progress_bar(&self, percent: f64) -> String {
        let width = self.options.bar_width;
        let filled = filled_cells(percent, width);
        format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
    }

    fn section(&self, output: &mut String, title: &str) -> Result<()> {
        writeln!(output, "{}:", title).map_err(fmt_error)?;
        writeln!(output, "{}", "-".repeat(title.len() + 1)).map_err(fmt_error)?;
        Ok(())
    }
}

impl OutputFormatter for PlainFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "=".repeat(title.len() + 4);

        writeln!(output, "{}", border).map_err(fmt_error)?;
        writeln!(output, "  {}  ", title).map_err(fmt_error)?;
        write!(output, "{}", border).map_err(fmt_error)?;

        Ok(output)
    }

    fn format_progress(&self, event: &ProgressEvent<'_>) -> Result<String> {
        let mut line = format!(
            "{:<9} {} {:>6}",
            event.phase.label(),
            self.progress_bar(event.percent),
            format_percentage(event.percent)
        );
        if event.phase != Phase::Latency {
            write!(line, "  {:>12}", format_rate(event.rate_mbps)).map_err(fmt_error)?;
        }
        Ok(line)
    }

    fn format_latency(&self, latency: &LatencyResult) -> Result<String> {
        let mut output = String::new();
        self.section(&mut output, "Latency")?;

        writeln!(output, "Ping:             {}", format_duration(latency.min_latency_ms)).map_err(fmt_error)?;
        writeln!(output, "Jitter:           {}", format_duration(latency.jitter_ms)).map_err(fmt_error)?;
        writeln!(
            output,
            "Avg / Max:        {} / {}",
            format_duration(latency.avg_latency_ms),
            format_duration(latency.max_latency_ms)
        )
        .map_err(fmt_error)?;
        write!(
            output,
            "Probes:           {}/{} ({})",
            latency.successful_trips,
            latency.total_trips,
            format_percentage(latency.success_rate())
        )
        .map_err(fmt_error)?;

        if self.options.verbose_mode {
            let trips: Vec<String> = latency.trips_ms.iter().map(|t| format!("{:.1}", t)).collect();
            write!(output, "\nTrips (ms):       {}", trips.join(" ")).map_err(fmt_error)?;
        }

        Ok(output)
    }

    fn format_throughput(&self, result: &ThroughputResult) -> Result<String> {
        let mut output = String::new();
        let title = match result.direction {
            TransferDirection::Download => "Download",
            TransferDirection::Upload => "Upload",
        };
        self.section(&mut output, title)?;

        write!(output, "Speed:            {}", format_rate(result.mbps)).map_err(fmt_error)?;
        write!(
            output,
            "\nTransferred:      {:.2} MB in {}",
            result.megabytes(),
            format_duration(result.elapsed_ms)
        )
        .map_err(fmt_error)?;

        if result.is_zero() {
            write!(output, "\nNote:             no data was transferred; a proxy or firewall may be blocking the sink")
                .map_err(fmt_error)?;
        }

        if self.options.verbose_mode {
            if let Some(summary) = SampleSummary::from_samples(&result.samples) {
                write!(
                    output,
                    "\nSamples:          {} (peak {}, final {})",
                    summary.sample_count,
                    format_rate(summary.peak_mbps),
                    format_rate(summary.final_mbps)
                )
                .map_err(fmt_error)?;
                write!(
                    output,
                    "\nCurve:            {}",
                    sparkline(&result.samples, self.options.sparkline_width)
                )
                .map_err(fmt_error)?;
            }
        }

        Ok(output)
    }

    fn format_grade(&self, grade: &NetworkGrade) -> Result<String> {
        let mut output = String::new();
        self.section(&mut output, "Grade")?;

        writeln!(output, "Grade:            {} ({})", grade.grade, grade.label).map_err(fmt_error)?;
        writeln!(output, "Streaming:        {}", grade.streaming).map_err(fmt_error)?;
        write!(output, "Gaming:           {}", grade.gaming).map_err(fmt_error)?;

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("ERROR: {}", error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("WARNING: {}", warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("SUCCESS: {}", message))
    }
}
