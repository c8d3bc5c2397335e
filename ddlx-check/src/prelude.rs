//! Prelude for commonly used types and traits in ddlx-check.

pub use crate::core::{
    CheckDefinition, CheckOutcome, CombinedReport, Constraint, Level, Orchestrator, SubCheck,
};
pub use crate::error::{DdlxError, Result};
pub use crate::formatters::{FormatterConfig, ReportFormatter};
pub use crate::logging::LogConfig;
pub use crate::sources::Dataset;
