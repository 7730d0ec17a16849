//! Error types for the report pipeline.
//!
//! Every stage of the pipeline returns [`ReportError`]. The variants map onto
//! the failure taxonomy callers present to users: unsupported uploads, files
//! that do not parse, filesystem problems and layout failures.
//!
//! Errors are serializable so a UI layer can forward them verbatim as
//! `{ code, message }` objects.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the report pipeline.
#[derive(Error, Debug)]
pub enum ReportError {
    /// The file extension is not one of csv, xlsx, xls or json.
    #[error("Unsupported file format: '{0}' (expected csv, xlsx, xls or json)")]
    UnsupportedFormat(String),

    /// The file could not be parsed as tabular data in its declared format.
    #[error("Failed to parse {format} file: {reason}")]
    Parse { format: String, reason: String },

    /// Document assembly cannot proceed.
    #[error("Failed to lay out report: {0}")]
    Layout(String),

    /// The chart backend rejected a drawing operation.
    #[error("Failed to render chart '{chart}': {reason}")]
    Render { chart: String, reason: String },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

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
        source: Box<ReportError>,
    },
}

impl ReportError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ReportError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a [`ReportError::Parse`] error.
    pub fn parse(format: impl Into<String>, reason: impl ToString) -> Self {
        ReportError::Parse {
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    /// Get error code for frontend handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::Parse { .. } => "PARSE_ERROR",
            Self::Layout(_) => "LAYOUT_ERROR",
            Self::Render { .. } => "RENDER_ERROR",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Strip any [`ReportError::WithContext`] wrappers.
    pub fn root(&self) -> &ReportError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the user can fix this by uploading a different file.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self.root(),
            Self::UnsupportedFormat(_) | Self::Parse { .. }
        )
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ReportError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ReportError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, ReportError>;

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
        self.map_err(|e| ReportError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ReportError::Io(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            ReportError::UnsupportedFormat("txt".to_string()).error_code(),
            "UNSUPPORTED_FORMAT"
        );
        assert_eq!(ReportError::parse("csv", "bad row").error_code(), "PARSE_ERROR");
        assert_eq!(ReportError::Layout("x".to_string()).error_code(), "LAYOUT_ERROR");
    }

    #[test]
    fn test_io_error_converts() {
        let err: ReportError = std::io::Error::other("disk full").into();
        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_is_input_error() {
        assert!(ReportError::UnsupportedFormat("txt".to_string()).is_input_error());
        assert!(ReportError::parse("json", "eof").is_input_error());
        assert!(!ReportError::Layout("overflow".to_string()).is_input_error());
    }

    #[test]
    fn test_error_serialization() {
        let error = ReportError::UnsupportedFormat("parquet".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("UNSUPPORTED_FORMAT"));
        assert!(json.contains("parquet"));
    }

    #[test]
    fn test_with_context() {
        let error = ReportError::parse("csv", "unterminated quote").with_context("Loading upload");
        assert!(error.to_string().contains("Loading upload"));
        assert_eq!(error.error_code(), "PARSE_ERROR");
        assert!(error.is_input_error());
    }
}
