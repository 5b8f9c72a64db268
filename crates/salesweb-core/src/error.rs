//! Error types for salesweb-core
//!
//! This module provides error handling for the reporting engine, including
//! error codes, severities, and serializable details with suggestions.

use thiserror::Error;
use serde::{Deserialize, Serialize};

use crate::source::SourceError;

/// Error codes for programmatic error handling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Currency code missing from the scale table
    UnknownCurrency,
    /// Exchange rate not strictly positive
    InvalidExchangeRate,
    /// Record cannot be placed into a period
    InvalidRecord,
    /// Amount outside the representable range
    InvalidAmount,
    /// Report filter is inconsistent
    InvalidFilter,
    /// CSV or JSON serialization failed
    ExportError,
    /// Upstream record source failed
    SourceError,
    /// Configuration error
    ConfigError,
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::UnknownCurrency => write!(f, "UNKNOWN_CURRENCY"),
            ErrorCode::InvalidExchangeRate => write!(f, "INVALID_EXCHANGE_RATE"),
            ErrorCode::InvalidRecord => write!(f, "INVALID_RECORD"),
            ErrorCode::InvalidAmount => write!(f, "INVALID_AMOUNT"),
            ErrorCode::InvalidFilter => write!(f, "INVALID_FILTER"),
            ErrorCode::ExportError => write!(f, "EXPORT_ERROR"),
            ErrorCode::SourceError => write!(f, "SOURCE_ERROR"),
            ErrorCode::ConfigError => write!(f, "CONFIG_ERROR"),
        }
    }
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Suggestions for resolution
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
}

impl ErrorDetails {
    /// Create a new error detail
    pub fn new(code: ErrorCode, message: String) -> Self {
        Self {
            code,
            message,
            details: None,
            suggestions: vec![],
        }
    }

    /// Add detail information
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.details = Some(detail);
        self
    }

    /// Add a suggestion
    pub fn with_suggestion(mut self, suggestion: String) -> Self {
        self.suggestions.push(suggestion);
        self
    }
}

impl std::fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        if let Some(ref details) = self.details {
            write!(f, "\nDetails: {}", details)?;
        }
        if !self.suggestions.is_empty() {
            write!(f, "\nSuggestions:")?;
            for suggestion in &self.suggestions {
                write!(f, "\n  - {}", suggestion)?;
            }
        }
        Ok(())
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    /// Operation affected a single record
    Warning,
    /// Operation failed
    Error,
    /// Service cannot run
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Warning => write!(f, "warning"),
            ErrorSeverity::Error => write!(f, "error"),
            ErrorSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Main error type for salesweb-core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown currency: {code}")]
    UnknownCurrency { code: String },

    #[error("Invalid exchange rate: {rate}")]
    InvalidExchangeRate { rate: f64 },

    #[error("Invalid record {record}: {reason}")]
    InvalidRecord { record: String, reason: String },

    #[error("Invalid amount: {message}")]
    InvalidAmount { message: String },

    #[error("Invalid report filter: {message}")]
    InvalidFilter { message: String },

    #[error("Export failed: {message}")]
    ExportError { message: String },

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl CoreError {
    /// Get the error code
    pub fn code(&self) -> ErrorCode {
        match self {
            CoreError::UnknownCurrency { .. } => ErrorCode::UnknownCurrency,
            CoreError::InvalidExchangeRate { .. } => ErrorCode::InvalidExchangeRate,
            CoreError::InvalidRecord { .. } => ErrorCode::InvalidRecord,
            CoreError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
            CoreError::InvalidFilter { .. } => ErrorCode::InvalidFilter,
            CoreError::ExportError { .. } => ErrorCode::ExportError,
            CoreError::Source(_) => ErrorCode::SourceError,
            CoreError::ConfigError { .. } => ErrorCode::ConfigError,
        }
    }

    /// Get the severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            CoreError::UnknownCurrency { .. } => ErrorSeverity::Warning,
            CoreError::InvalidExchangeRate { .. } => ErrorSeverity::Warning,
            CoreError::InvalidRecord { .. } => ErrorSeverity::Warning,
            CoreError::InvalidAmount { .. } => ErrorSeverity::Warning,
            CoreError::InvalidFilter { .. } => ErrorSeverity::Warning,
            CoreError::ExportError { .. } => ErrorSeverity::Error,
            CoreError::Source(_) => ErrorSeverity::Error,
            CoreError::ConfigError { .. } => ErrorSeverity::Critical,
        }
    }

    /// Whether the error is attached to a single record rather than the whole run
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            CoreError::UnknownCurrency { .. }
                | CoreError::InvalidExchangeRate { .. }
                | CoreError::InvalidRecord { .. }
                | CoreError::InvalidAmount { .. }
        )
    }

    /// Convert to detailed error info
    pub fn to_details(&self) -> ErrorDetails {
        let mut details = ErrorDetails::new(self.code(), self.to_string());

        match self {
            CoreError::UnknownCurrency { code } => {
                details = details.with_detail(serde_json::json!({ "currency": code }));
                details = details.with_suggestion(
                    "Supported currencies are listed in the currency scale table.".to_string()
                );
            }
            CoreError::InvalidExchangeRate { rate } => {
                details = details.with_detail(serde_json::json!({ "rate": rate }));
                details = details.with_suggestion(
                    "Exchange rates are base-currency units per native unit and must be greater than 0.".to_string()
                );
            }
            CoreError::InvalidRecord { record, .. } => {
                details = details.with_detail(serde_json::json!({ "record": record }));
                details = details.with_suggestion(
                    "Check the 'created' timestamp of the record upstream.".to_string()
                );
            }
            CoreError::InvalidFilter { .. } => {
                details = details.with_suggestion(
                    "start_date must not be after end_date.".to_string()
                );
            }
            CoreError::Source(_) => {
                details = details.with_suggestion(
                    "Re-fetch the record batches; the report is recomputed on every load.".to_string()
                );
            }
            _ => {}
        }

        details
    }
}

/// Result type with CoreError
pub type CoreResult<T> = Result<T, CoreError>;

impl From<salesweb_config::ConfigError> for CoreError {
    fn from(error: salesweb_config::ConfigError) -> Self {
        CoreError::ConfigError { message: error.to_string() }
    }
}

impl From<csv::Error> for CoreError {
    fn from(error: csv::Error) -> Self {
        CoreError::ExportError { message: error.to_string() }
    }
}

// ==================== Tests ====================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::UnknownCurrency.to_string(), "UNKNOWN_CURRENCY");
        assert_eq!(ErrorCode::InvalidExchangeRate.to_string(), "INVALID_EXCHANGE_RATE");
        assert_eq!(ErrorCode::InvalidRecord.to_string(), "INVALID_RECORD");
    }

    #[test]
    fn test_core_error_code_and_severity() {
        let error = CoreError::UnknownCurrency { code: "XYZ".to_string() };
        assert_eq!(error.code(), ErrorCode::UnknownCurrency);
        assert_eq!(error.severity(), ErrorSeverity::Warning);
        assert!(error.is_record_level());

        let error = CoreError::Source(SourceError::Unavailable { message: "timeout".to_string() });
        assert_eq!(error.code(), ErrorCode::SourceError);
        assert_eq!(error.severity(), ErrorSeverity::Error);
        assert!(!error.is_record_level());
    }

    #[test]
    fn test_source_error_is_transparent() {
        let error = CoreError::from(SourceError::Unavailable { message: "upstream 503".to_string() });
        assert_eq!(error.to_string(), "Record source unavailable: upstream 503");
    }

    #[test]
    fn test_error_details_exchange_rate() {
        let details = CoreError::InvalidExchangeRate { rate: -1.0 }.to_details();

        assert_eq!(details.code, ErrorCode::InvalidExchangeRate);
        assert!(details.details.is_some());
        assert!(!details.suggestions.is_empty());
    }

    #[test]
    fn test_config_error_conversion() {
        let error: CoreError = salesweb_config::ConfigError::InvalidValue {
            field: "report.timezone".to_string(),
            reason: "unknown".to_string(),
        }
        .into();
        assert_eq!(error.code(), ErrorCode::ConfigError);
        assert_eq!(error.severity(), ErrorSeverity::Critical);
    }
}
