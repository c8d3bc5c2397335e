//! Constraint trait and related types for validation rules.

use crate::prelude::*;
use async_trait::async_trait;
use datafusion::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

/// The status of a constraint evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintStatus {
    /// The constraint check passed
    Success,
    /// The constraint check failed
    Failure,
    /// The constraint check was skipped (e.g., no data)
    Skipped,
}

impl ConstraintStatus {
    /// Returns true if this is a Success status.
    pub fn is_success(&self) -> bool {
        matches!(self, ConstraintStatus::Success)
    }

    /// Returns true if this is a Failure status.
    pub fn is_failure(&self) -> bool {
        matches!(self, ConstraintStatus::Failure)
    }

    /// Returns the string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintStatus::Success => "success",
            ConstraintStatus::Failure => "failure",
            ConstraintStatus::Skipped => "skipped",
        }
    }
}

impl fmt::Display for ConstraintStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The result of evaluating a constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintResult {
    /// The status of the constraint evaluation
    pub status: ConstraintStatus,
    /// Optional metric value computed during evaluation
    pub metric: Option<f64>,
    /// Optional message providing additional context
    pub message: Option<String>,
}

impl ConstraintResult {
    /// Creates a successful constraint result.
    pub fn success() -> Self {
        Self {
            status: ConstraintStatus::Success,
            metric: None,
            message: None,
        }
    }

    /// Creates a successful constraint result with a metric.
    pub fn success_with_metric(metric: f64) -> Self {
        Self {
            status: ConstraintStatus::Success,
            metric: Some(metric),
            message: None,
        }
    }

    /// Creates a failed constraint result with a metric.
    pub fn failure_with_metric(metric: f64, message: impl Into<String>) -> Self {
        Self {
            status: ConstraintStatus::Failure,
            metric: Some(metric),
            message: Some(message.into()),
        }
    }

    /// Creates a skipped constraint result.
    pub fn skipped(message: impl Into<String>) -> Self {
        Self {
            status: ConstraintStatus::Skipped,
            metric: None,
            message: Some(message.into()),
        }
    }

    /// Builds a result by comparing a ratio against a minimum threshold.
    ///
    /// `describe` only runs when the ratio falls short.
    pub fn from_ratio<F>(ratio: f64, threshold: f64, describe: F) -> Self
    where
        F: FnOnce() -> String,
    {
        if ratio >= threshold {
            Self::success_with_metric(ratio)
        } else {
            Self::failure_with_metric(ratio, describe())
        }
    }
}

/// A validation constraint that can be evaluated against data.
///
/// Implementations read the name of the table under validation from
/// [`current_validation_context`](crate::core::current_validation_context),
/// so the same constraint can run against a full dataset or a filtered view.
///
/// Returning `Err` signals that the constraint could not be evaluated at all
/// (missing column, malformed expression, engine error). A constraint that
/// evaluated but did not hold returns `Ok` with a failure status.
#[async_trait]
pub trait Constraint: Debug + Send + Sync {
    /// Evaluates the constraint against the data in the session context.
    async fn evaluate(&self, ctx: &SessionContext) -> Result<ConstraintResult>;

    /// Returns the name of the constraint.
    fn name(&self) -> &str;

    /// Returns the column this constraint operates on (if single-column).
    fn column(&self) -> Option<&str> {
        None
    }

    /// Label identifying this constraint in result rows, e.g. `completeness(id)`.
    fn label(&self) -> String {
        match self.column() {
            Some(column) => format!("{}({column})", self.name()),
            None => self.name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_result_builders() {
        let success = ConstraintResult::success();
        assert_eq!(success.status, ConstraintStatus::Success);
        assert!(success.metric.is_none());

        let failure = ConstraintResult::failure_with_metric(0.3, "Below threshold");
        assert_eq!(failure.status, ConstraintStatus::Failure);
        assert_eq!(failure.metric, Some(0.3));
        assert_eq!(failure.message.as_deref(), Some("Below threshold"));

        let skipped = ConstraintResult::skipped("No data");
        assert_eq!(skipped.status, ConstraintStatus::Skipped);
    }

    #[test]
    fn test_from_ratio() {
        let passed = ConstraintResult::from_ratio(0.95, 0.9, || unreachable!());
        assert_eq!(passed, ConstraintResult::success_with_metric(0.95));

        let failed = ConstraintResult::from_ratio(0.5, 0.9, || "too low".to_string());
        assert!(failed.status.is_failure());
        assert_eq!(failed.message.as_deref(), Some("too low"));
    }

    #[test]
    fn test_status_display() {
        assert_eq!(ConstraintStatus::Success.to_string(), "success");
        assert_eq!(ConstraintStatus::Skipped.to_string(), "skipped");
    }
}
