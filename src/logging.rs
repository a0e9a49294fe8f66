//! Structured logging for the speed tester
//!
//! Log entries carry a level, the emitting component, optional correlation
//! IDs tying the start and end of a phase together, and arbitrary structured
//! fields. All output goes to stderr so the report on stdout stays clean for
//! piping (`--json`).

use crate::error::{AppError, Result};
use crate::models::{Config, LatencyResult, ThroughputResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    /// Suppresses everything when used as a minimum level
    Off = 5,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Off => "OFF",
        }
    }

    /// ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error | LogLevel::Off => "\x1b[31m",
        }
    }

    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "OFF" | "NONE" => Ok(LogLevel::Off),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Emitting component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    pub fields: HashMap<String, serde_json::Value>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// One JSON object per line
    Json,
    /// Compact single-line format
    Compact,
}

#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    context_fields: HashMap<String, serde_json::Value>,
}

/// Logger with multiple output formats
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger at `Info` level
    pub fn new(name: &str) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: false,
            format: LogFormat::Console,
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// A logger that discards every entry
    pub fn silent(name: &str) -> Self {
        let mut logger = Self::new(name);
        logger.set_level(LogLevel::Off);
        logger
    }

    /// Create a logger whose level follows the `--verbose` / `--debug` switches
    pub fn with_config(name: &str, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            format: if config.debug && config.json_output { LogFormat::Json } else { LogFormat::Console },
            name: name.to_string(),
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Set session correlation ID attached to every entry
    pub async fn set_session_id(&self, session_id: String) {
        self.context.write().await.session_id = Some(session_id);
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: &str, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.context.write().await.context_fields.insert(key.to_string(), json_value);
        }
    }

    /// Start a correlated operation and return its ID
    pub async fn start_operation(&self, operation_name: &str) -> String {
        let correlation_id = Uuid::new_v4().to_string();

        self.info(&format!("Started {}", operation_name))
            .correlation_id(&correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "start")
            .log()
            .await;

        correlation_id
    }

    /// End a correlated operation
    pub async fn end_operation(&self, correlation_id: &str, operation_name: &str, success: bool) {
        self.info(&format!("Finished {} (success: {})", operation_name, success))
            .correlation_id(correlation_id)
            .field("operation", operation_name)
            .field("operation_type", "end")
            .field("success", success)
            .log()
            .await;
    }

    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.min_level
    }

    async fn write_entry(&self, mut entry: LogEntry) {
        if !self.would_log(entry.level) {
            return;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry
                .fields
                .insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        for (key, value) in &context.context_fields {
            entry.fields.insert(key.clone(), value.clone());
        }
        drop(context);

        let output = self.render(&entry);
        let _ = writeln!(io::stderr(), "{}", output);
    }

    fn render(&self, entry: &LogEntry) -> String {
        match self.format {
            LogFormat::Console => self.format_console(entry),
            LogFormat::Json => self.format_json(entry),
            LogFormat::Compact => self.format_compact(entry),
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short = correlation_id.get(..8).unwrap_or(correlation_id);
            output.push_str(&format!(" [{}]", short));
        }

        if !entry.fields.is_empty() {
            let mut fields: Vec<String> = entry.fields.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            fields.sort();
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => format!(
                "{{\"error\": \"Failed to serialize log entry\", \"message\": {:?}}}",
                entry.message
            ),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!(
            "{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder pattern for creating log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: HashMap::new(),
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    /// Add latency probe figures
    pub fn latency(self, result: &LatencyResult) -> Self {
        self.field("min_ms", result.min_latency_ms)
            .field("jitter_ms", result.jitter_ms)
            .field("avg_ms", result.avg_latency_ms)
            .field("successful_trips", result.successful_trips)
            .field("total_trips", result.total_trips)
    }

    /// Add throughput phase figures
    pub fn throughput(self, result: &ThroughputResult) -> Self {
        self.field("direction", result.direction.as_str())
            .field("mbps", result.mbps)
            .field("bytes", result.bytes_transferred)
            .field("elapsed_ms", result.elapsed_ms)
            .field("samples", result.samples.len())
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error", error.to_string())
            .field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }
}

/// Hands out loggers sharing one session ID
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific component name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name, &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}
