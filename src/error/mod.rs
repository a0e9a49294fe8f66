//! Error handling for the network speed tester

use crate::models::metrics::ThroughputResult;
use thiserror::Error;

/// Custom error types for the network speed tester
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network connectivity errors
    #[error("Network error: {0}")]
    Network(String),

    /// Every latency round trip failed
    #[error("Network unavailable: {0}")]
    NetworkUnavailable(String),

    /// A single download or upload request failed
    #[error("Transfer failed: {0}")]
    TransferFailed(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// The measurement was cancelled through `abort()`
    #[error("Measurement aborted")]
    Aborted {
        /// Throughput accrued before the abort, when a throughput phase was running
        partial: Option<ThroughputResult>,
    },

    /// An engine operation was invoked out of sequence
    #[error("Invalid engine state: {0}")]
    InvalidState(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Parsing errors (URLs, JSON, etc.)
    #[error("Parsing error: {0}")]
    Parse(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network(message.into())
    }

    /// Create a new network-unavailable error
    pub fn network_unavailable<S: Into<String>>(message: S) -> Self {
        Self::NetworkUnavailable(message.into())
    }

    /// Create a new transfer failure
    pub fn transfer_failed<S: Into<String>>(message: S) -> Self {
        Self::TransferFailed(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create an abort signal without partial results
    pub fn aborted() -> Self {
        Self::Aborted { partial: None }
    }

    /// Create an abort signal carrying the throughput accrued so far
    pub fn aborted_with(partial: ThroughputResult) -> Self {
        Self::Aborted { partial: Some(partial) }
    }

    /// Create a new invalid-state error
    pub fn invalid_state<S: Into<String>>(message: S) -> Self {
        Self::InvalidState(message.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new parsing error
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Whether this is a deliberate cancellation rather than a failure
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }

    /// Partial throughput carried by an abort, if any
    pub fn partial_throughput(&self) -> Option<&ThroughputResult> {
        match self {
            Self::Aborted { partial } => partial.as_ref(),
            _ => None,
        }
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::Network(_) => "NETWORK",
            Self::NetworkUnavailable(_) => "UNAVAILABLE",
            Self::TransferFailed(_) => "TRANSFER",
            Self::Timeout(_) => "TIMEOUT",
            Self::Aborted { .. } => "ABORTED",
            Self::InvalidState(_) => "STATE",
            Self::Validation(_) => "VALIDATION",
            Self::Io(_) => "IO",
            Self::Parse(_) => "PARSE",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is recoverable (can retry)
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::TransferFailed(_) => true,
            Self::NetworkUnavailable(_) => true,
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => false,
            Self::Aborted { .. } | Self::InvalidState(_) | Self::Io(_) | Self::Internal(_) => false,
        }
    }

    /// Get user-friendly error message with suggestions
    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::Config(msg) => {
                format!("Configuration problem: {}\n\nSuggestion: Check your .env file or command line arguments.", msg)
            }
            Self::Network(msg) => {
                format!("Network connectivity issue: {}\n\nSuggestion: Check your internet connection and try again.", msg)
            }
            Self::NetworkUnavailable(msg) => {
                format!("No latency probe reached the test server: {}\n\nSuggestion: Check your internet connection, proxy and firewall settings.", msg)
            }
            Self::TransferFailed(msg) => {
                format!("A transfer failed: {}\n\nSuggestion: Individual transfer failures are retried automatically.", msg)
            }
            Self::Timeout(msg) => {
                format!("Request timed out: {}\n\nSuggestion: Increase the request timeout with --request-timeout-ms.", msg)
            }
            Self::Aborted { .. } => "The measurement was cancelled.".to_string(),
            Self::InvalidState(msg) => {
                format!("Engine used out of order: {}\n\nThis is likely a bug in the caller.", msg)
            }
            Self::Validation(msg) => {
                format!("Invalid input: {}\n\nSuggestion: Check the format of your URLs and numeric options.", msg)
            }
            Self::Io(msg) => {
                format!("File operation failed: {}\n\nSuggestion: Check file permissions and disk space.", msg)
            }
            Self::Parse(msg) => {
                format!("Failed to parse data: {}\n\nSuggestion: Check the format of your input data or configuration files.", msg)
            }
            Self::Internal(msg) => {
                format!("Internal error: {}\n\nThis is likely a bug. Please report this issue with the error details.", msg)
            }
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Validation(_) | Self::Parse(_) => 1,
            Self::Network(_) | Self::NetworkUnavailable(_) | Self::TransferFailed(_) => 2,
            Self::Timeout(_) => 3,
            Self::Io(_) => 5,
            Self::InvalidState(_) => 6,
            Self::Aborted { .. } => 130,
            Self::Internal(_) => 99,
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::Validation(_) | Self::Parse(_) => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::Network(_) | Self::NetworkUnavailable(_) | Self::TransferFailed(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Aborted { .. } => {
                    format!("[{}] {}", category.bright_black().bold(), message.bright_black())
                }
                Self::InvalidState(_) | Self::Io(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::parse(format!("JSON parse error: {}", error))
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Error reporter for user feedback on the command line
pub struct ErrorReporter {
    pub use_color: bool,
    pub verbose: bool,
}

impl ErrorReporter {
    /// Create a new error reporter
    pub fn new(use_color: bool, verbose: bool) -> Self {
        Self { use_color, verbose }
    }

    /// Render an error the way it is shown to the user
    pub fn render(&self, error: &AppError) -> String {
        if error.is_abort() {
            // A deliberate abort is a notice, not a failure.
            return if self.use_color {
                use colored::Colorize;
                "Speed test cancelled.".bright_black().to_string()
            } else {
                "Speed test cancelled.".to_string()
            };
        }

        let mut out = error.format_for_console(self.use_color);
        if self.verbose {
            out.push_str("\n\n");
            out.push_str(&error.user_friendly_message());
            if error.is_recoverable() {
                out.push_str("\n\nThis error might be temporary. You can try running the command again.");
            }
        }
        out
    }

    /// Report an error to the user
    pub fn report_error(&self, error: &AppError) {
        eprintln!("{}", self.render(error));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metrics::{ThroughputResult, TransferDirection};

    #[test]
    fn test_error_categories() {
        assert_eq!(AppError::config("x").category(), "CONFIG");
        assert_eq!(AppError::network_unavailable("x").category(), "UNAVAILABLE");
        assert_eq!(AppError::transfer_failed("x").category(), "TRANSFER");
        assert_eq!(AppError::aborted().category(), "ABORTED");
        assert_eq!(AppError::invalid_state("x").category(), "STATE");
    }

    #[test]
    fn test_abort_detection() {
        assert!(AppError::aborted().is_abort());
        assert!(!AppError::network_unavailable("all trips failed").is_abort());
        assert!(AppError::aborted().partial_throughput().is_none());

        let partial = ThroughputResult::from_totals(TransferDirection::Download, 1_250_000, 100.0, Vec::new());
        let err = AppError::aborted_with(partial);
        let carried = err.partial_throughput().unwrap();
        assert!((carried.mbps - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::config("x").exit_code(), 1);
        assert_eq!(AppError::network_unavailable("x").exit_code(), 2);
        assert_eq!(AppError::timeout("x").exit_code(), 3);
        assert_eq!(AppError::invalid_state("x").exit_code(), 6);
        assert_eq!(AppError::aborted().exit_code(), 130);
        assert_eq!(AppError::internal("x").exit_code(), 99);
    }

    #[test]
    fn test_recoverability() {
        assert!(AppError::transfer_failed("reset").is_recoverable());
        assert!(AppError::timeout("slow").is_recoverable());
        assert!(!AppError::config("bad").is_recoverable());
        assert!(!AppError::aborted().is_recoverable());
    }

    #[test]
    fn test_plain_console_format() {
        let formatted = AppError::network_unavailable("0 of 8 trips succeeded").format_for_console(false);
        assert_eq!(formatted, "[UNAVAILABLE] Network unavailable: 0 of 8 trips succeeded");
    }

    #[test]
    fn test_reporter_renders_abort_as_notice() {
        let reporter = ErrorReporter::new(false, true);
        assert_eq!(reporter.render(&AppError::aborted()), "Speed test cancelled.");

        let rendered = reporter.render(&AppError::timeout("ping"));
        assert!(rendered.starts_with("[TIMEOUT]"));
        assert!(rendered.contains("might be temporary"));
    }

    #[test]
    fn test_json_errors_convert_to_parse() {
        let err: AppError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, AppError::Parse(_)));
        assert_eq!(err.exit_code(), 1);
    }
}
