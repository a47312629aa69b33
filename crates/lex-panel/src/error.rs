//! Custom error types for the panel cleaning pipeline.
//!
//! Unresolvable missing values are never errors here: they are left blank and
//! reported through the cleaning summary. The variants below cover input that
//! cannot be cleaned at all and failures of the surrounding I/O.
//!
//! Errors serialize as `{code, message}` so they can be handed to a frontend
//! or printed as JSON by the CLI.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the panel cleaning pipeline.
#[derive(Error, Debug)]
pub enum PanelError {
    /// A required logical column could not be resolved in the input table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A cell could not be parsed into its record field.
    #[error("Invalid value '{value}' in column '{column}' at row {row}: {reason}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
        reason: String,
    },

    /// A country's rows disagree on status and the policy is to fail.
    #[error("Conflicting statuses for country '{country}': {statuses:?}")]
    StatusConflict {
        country: String,
        statuses: Vec<String>,
    },

    /// The input table has no rows.
    #[error("Dataset is empty")]
    EmptyDataset,

    /// Report or dataset output failed.
    #[error("Failed to generate report: {0}")]
    ReportGenerationFailed(String),

    /// Internal error (an invariant the pipeline guarantees did not hold).
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<PanelError>,
    },
}

impl PanelError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        PanelError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidValue { .. } => "INVALID_VALUE",
            Self::StatusConflict { .. } => "STATUS_CONFLICT",
            Self::EmptyDataset => "EMPTY_DATASET",
            Self::ReportGenerationFailed(_) => "REPORT_GENERATION_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error is caused by the input data rather than the
    /// environment (fixing the file or the config makes it go away).
    pub fn is_data_error(&self) -> bool {
        match self {
            Self::ColumnNotFound(_)
            | Self::InvalidValue { .. }
            | Self::StatusConflict { .. }
            | Self::EmptyDataset
            | Self::InvalidConfig(_) => true,
            Self::WithContext { source, .. } => source.is_data_error(),
            _ => false,
        }
    }
}

impl From<crate::config::ConfigValidationError> for PanelError {
    fn from(err: crate::config::ConfigValidationError) -> Self {
        PanelError::InvalidConfig(err.to_string())
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for PanelError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("PanelError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for panel cleaning operations.
pub type Result<T> = std::result::Result<T, PanelError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| PanelError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(PanelError::EmptyDataset.error_code(), "EMPTY_DATASET");
        assert_eq!(
            PanelError::ColumnNotFound("status".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
        assert_eq!(
            PanelError::StatusConflict {
                country: "X".to_string(),
                statuses: vec!["Developing".to_string(), "Developed".to_string()],
            }
            .error_code(),
            "STATUS_CONFLICT"
        );
    }

    #[test]
    fn test_is_data_error() {
        assert!(PanelError::EmptyDataset.is_data_error());
        assert!(PanelError::ColumnNotFound("year".to_string()).is_data_error());
        assert!(!PanelError::Internal("bug".to_string()).is_data_error());
        assert!(
            PanelError::EmptyDataset
                .with_context("Loading input")
                .is_data_error()
        );
    }

    #[test]
    fn test_error_serialization() {
        let error = PanelError::InvalidValue {
            column: "Status".to_string(),
            row: 4,
            value: "Emerging".to_string(),
            reason: "expected Developing or Developed".to_string(),
        };
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("INVALID_VALUE"));
        assert!(json.contains("Emerging"));
        assert!(json.contains("row 4"));
    }

    #[test]
    fn test_with_context() {
        let error = PanelError::ColumnNotFound("country".to_string()).with_context("During load");
        assert!(error.to_string().contains("During load"));
        assert_eq!(error.error_code(), "COLUMN_NOT_FOUND");
    }

    #[test]
    fn test_config_error_conversion() {
        let err: PanelError =
            crate::config::ConfigValidationError::InvalidDecimals(42).into();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
        assert!(err.to_string().contains("42"));
    }
}
