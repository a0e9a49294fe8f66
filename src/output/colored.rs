//! Colored formatter implementation with terminal color support
//!
//! This module provides a colored output formatter that uses ANSI colors
//! and block characters for the live progress bar and rate curves.

use super::formatter::{
    filled_cells, fmt_error, format_duration, format_percentage, format_rate, sparkline,
    FormattingOptions, OutputFormatter, PlainFormatter,
};
use crate::{
    error::Result,
    executor::ProgressEvent,
    models::{LatencyResult, ThroughputResult, TransferDirection},
    stats::SampleSummary,
    types::{NetworkGrade, Phase},
};
use colored::*;
use std::fmt::Write as _;

/// Speed classification used to color rates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedLevel {
    Blazing,  // > 300 Mbps
    Fast,     // 100-300 Mbps
    Moderate, // 25-100 Mbps
    Slow,     // 5-25 Mbps
    Crawling, // < 5 Mbps
}

impl SpeedLevel {
    pub fn from_rate(mbps: f64) -> Self {
        if mbps > 300.0 {
            Self::Blazing
        } else if mbps > 100.0 {
            Self::Fast
        } else if mbps > 25.0 {
            Self::Moderate
        } else if mbps > 5.0 {
            Self::Slow
        } else {
            Self::Crawling
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Blazing => Color::Green,
            Self::Fast => Color::Cyan,
            Self::Moderate => Color::Yellow,
            Self::Slow => Color::Magenta,
            Self::Crawling => Color::Red,
        }
    }
}

/// Latency classification used to color round-trip times
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LatencyLevel {
    Excellent, // < 20ms
    Good,      // 20-60ms
    Fair,      // 60-150ms
    Poor,      // >= 150ms
}

impl LatencyLevel {
    pub fn from_ms(ms: f64) -> Self {
        if ms < 20.0 {
            Self::Excellent
        } else if ms < 60.0 {
            Self::Good
        } else if ms < 150.0 {
            Self::Fair
        } else {
            Self::Poor
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Red,
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub info: Color,
    pub muted: Color,
    pub border: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            info: Color::Cyan,
            muted: Color::BrightBlack,
            border: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    plain_formatter: PlainFormatter,
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    /// Create a new colored formatter with options
    pub fn new(options: FormattingOptions) -> Self {
        Self::with_color_scheme(options, ColorScheme::default())
    }

    /// Create a colored formatter with custom color scheme
    pub fn with_color_scheme(options: FormattingOptions, color_scheme: ColorScheme) -> Self {
        let plain_formatter = PlainFormatter::new(options.clone());
        Self {
            plain_formatter,
            options,
            color_scheme,
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn bold(&self, text: &str) -> ColoredString {
        if self.options.enable_color {
            text.bold()
        } else {
            text.normal()
        }
    }

    fn label(&self, text: &str) -> ColoredString {
        self.colorize(&format!("{:<17}", text), self.color_scheme.muted)
    }

    fn rate(&self, mbps: f64) -> ColoredString {
        self.colorize(&format_rate(mbps), SpeedLevel::from_rate(mbps).color())
    }

    fn latency(&self, ms: f64) -> ColoredString {
        self.colorize(&format_duration(ms), LatencyLevel::from_ms(ms).color())
    }

    fn section(&self, output: &mut String, title: &str, icon: &str) -> Result<()> {
        writeln!(output, "{} {}", icon, self.bold(title).color(self.color_scheme.header)).map_err(fmt_error)?;
        writeln!(output, "{}", self.colorize(&"─".repeat(40), self.color_scheme.border)).map_err(fmt_error)?;
        Ok(())
    }

    fn progress_bar(&self, percent: f64, color: Color) -> String {
        let width = self.options.bar_width;
        let filled = filled_cells(percent, width);
        format!(
            "{}{}",
            self.colorize(&"█".repeat(filled), color),
            self.colorize(&"░".repeat(width - filled), self.color_scheme.muted)
        )
    }

    fn grade_color(&self, grade: &str) -> Color {
        match grade {
            "A+" | "A" => self.color_scheme.success,
            "B" => self.color_scheme.info,
            "C" => self.color_scheme.warning,
            _ => self.color_scheme.error,
        }
    }
}

impl OutputFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "═".repeat(title.len() + 4);

        writeln!(output, "{}", self.colorize(&border, self.color_scheme.header)).map_err(fmt_error)?;
        writeln!(output, "  {}  ", self.bold(title).color(self.color_scheme.header)).map_err(fmt_error)?;
        write!(output, "{}", self.colorize(&border, self.color_scheme.header)).map_err(fmt_error)?;

        Ok(output)
    }

    fn format_progress(&self, event: &ProgressEvent<'_>) -> Result<String> {
        let color = match event.phase {
            Phase::Latency => self.color_scheme.info,
            _ => SpeedLevel::from_rate(event.rate_mbps).color(),
        };

        let mut line = format!(
            "{} {} {:>6}",
            self.bold(&format!("{:<9}", event.phase.label())),
            self.progress_bar(event.percent, color),
            format_percentage(event.percent)
        );
        if event.phase != Phase::Latency {
            let rate = format!("{:>12}", format_rate(event.rate_mbps));
            write!(line, "  {}", self.colorize(&rate, color)).map_err(fmt_error)?;
        }
        Ok(line)
    }

    fn format_latency(&self, latency: &LatencyResult) -> Result<String> {
        let mut output = String::new();
        self.section(&mut output, "Latency", "📡")?;

        writeln!(output, "{}{}", self.label("Ping:"), self.latency(latency.min_latency_ms)).map_err(fmt_error)?;
        writeln!(output, "{}{}", self.label("Jitter:"), self.latency(latency.jitter_ms)).map_err(fmt_error)?;
        writeln!(
            output,
            "{}{} / {}",
            self.label("Avg / Max:"),
            format_duration(latency.avg_latency_ms),
            format_duration(latency.max_latency_ms)
        )
        .map_err(fmt_error)?;

        let success_rate = latency.success_rate();
        let rate_color = if success_rate >= 95.0 {
            self.color_scheme.success
        } else if success_rate >= 50.0 {
            self.color_scheme.warning
        } else {
            self.color_scheme.error
        };
        write!(
            output,
            "{}{}/{} ({})",
            self.label("Probes:"),
            latency.successful_trips,
            latency.total_trips,
            self.colorize(&format_percentage(success_rate), rate_color)
        )
        .map_err(fmt_error)?;

        if self.options.verbose_mode {
            let trips: Vec<String> = latency.trips_ms.iter().map(|t| format!("{:.1}", t)).collect();
            write!(output, "\n{}{}", self.label("Trips (ms):"), self.colorize(&trips.join(" "), self.color_scheme.muted))
                .map_err(fmt_error)?;
        }

        Ok(output)
    }

    fn format_throughput(&self, result: &ThroughputResult) -> Result<String> {
        let mut output = String::new();
        let (title, icon) = match result.direction {
            TransferDirection::Download => ("Download", "⬇"),
            TransferDirection::Upload => ("Upload", "⬆"),
        };
        self.section(&mut output, title, icon)?;

        write!(output, "{}{}", self.label("Speed:"), self.bold(&self.rate(result.mbps).to_string())).map_err(fmt_error)?;
        write!(
            output,
            "\n{}{:.2} MB in {}",
            self.label("Transferred:"),
            result.megabytes(),
            format_duration(result.elapsed_ms)
        )
        .map_err(fmt_error)?;

        if result.is_zero() {
            write!(
                output,
                "\n{}{}",
                self.label("Note:"),
                self.colorize(
                    "no data was transferred; a proxy or firewall may be blocking the sink",
                    self.color_scheme.warning
                )
            )
            .map_err(fmt_error)?;
        }

        if self.options.verbose_mode {
            if let Some(summary) = SampleSummary::from_samples(&result.samples) {
                write!(
                    output,
                    "\n{}{} (peak {}, final {})",
                    self.label("Samples:"),
                    summary.sample_count,
                    self.rate(summary.peak_mbps),
                    self.rate(summary.final_mbps)
                )
                .map_err(fmt_error)?;
                let curve = sparkline(&result.samples, self.options.sparkline_width);
                write!(output, "\n{}{}", self.label("Curve:"), self.colorize(&curve, self.color_scheme.info))
                    .map_err(fmt_error)?;
            }
        }

        Ok(output)
    }

    fn format_grade(&self, grade: &NetworkGrade) -> Result<String> {
        let mut output = String::new();
        self.section(&mut output, "Grade", "🏁")?;

        let color = self.grade_color(&grade.grade);
        writeln!(
            output,
            "{}{} ({})",
            self.label("Grade:"),
            self.bold(&grade.grade).color(color),
            self.colorize(&grade.label, color)
        )
        .map_err(fmt_error)?;
        writeln!(output, "{}{}", self.label("Streaming:"), grade.streaming).map_err(fmt_error)?;
        write!(output, "{}{}", self.label("Gaming:"), grade.gaming).map_err(fmt_error)?;

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        if !self.options.enable_color {
            return self.plain_formatter.format_error(error);
        }
        Ok(format!("{} {}", "✗".color(self.color_scheme.error), error.color(self.color_scheme.error)))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        if !self.options.enable_color {
            return self.plain_formatter.format_warning(warning);
        }
        Ok(format!("{} {}", "⚠".color(self.color_scheme.warning), warning.color(self.color_scheme.warning)))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        if !self.options.enable_color {
            return self.plain_formatter.format_success(message);
        }
        Ok(format!("{} {}", "✓".color(self.color_scheme.success), message.color(self.color_scheme.success)))
    }
}
