//! Error types for ddlx-check.
//!
//! Every fallible operation in the crate returns [`DdlxError`]. Errors raised
//! while a single check is evaluated never reach the caller of the
//! orchestrator; they are folded into a
//! [`CheckOutcome::Failure`](crate::core::CheckOutcome) instead.

use thiserror::Error;

/// The main error type for ddlx-check.
#[derive(Error, Debug)]
pub enum DdlxError {
    /// Error that occurs when a constraint cannot be evaluated.
    #[error("Constraint evaluation failed for '{constraint}': {message}")]
    ConstraintEvaluation {
        /// Name of the constraint that failed
        constraint: String,
        /// Detailed error message
        message: String,
    },

    /// Error from DataFusion operations.
    #[error("DataFusion error: {0}")]
    DataFusion(#[from] datafusion::error::DataFusionError),

    /// Error from Arrow operations.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error from data source operations.
    #[error("Data source error: {message}")]
    DataSource {
        /// Type of data source (e.g., "CSV", "Memory")
        source_type: String,
        /// Detailed error message
        message: String,
        /// Optional underlying error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Error from I/O operations.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error when parsing a declared type or rule.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Error related to check configuration.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Error from serialization/deserialization operations.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Error when a required column is not found in the dataset.
    #[error("Column '{column}' not found in dataset")]
    ColumnNotFound { column: String },

    /// Generic internal error for unexpected conditions.
    #[error("Internal error: {0}")]
    Internal(String),

    /// Security-related error.
    #[error("Security error: {0}")]
    SecurityError(String),
}

/// A type alias for `Result<T, DdlxError>`.
pub type Result<T> = std::result::Result<T, DdlxError>;

impl DdlxError {
    /// Creates a new data source error.
    pub fn data_source(source_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new data source error with a source error.
    pub fn data_source_with_source(
        source_type: impl Into<String>,
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self::DataSource {
            source_type: source_type.into(),
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a new constraint evaluation error.
    pub fn constraint_evaluation(
        constraint: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ConstraintEvaluation {
            constraint: constraint.into(),
            message: message.into(),
        }
    }

    /// Creates a column-not-found error.
    pub fn column_not_found(column: impl Into<String>) -> Self {
        Self::ColumnNotFound {
            column: column.into(),
        }
    }
}

impl From<serde_json::Error> for DdlxError {
    fn from(err: serde_json::Error) -> Self {
        DdlxError::Serialization(err.to_string())
    }
}
