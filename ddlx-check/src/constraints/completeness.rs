//! Completeness constraint for validating non-null ratios.

use super::{current_table, evaluate_ratio, resolve_column};
use crate::core::{Constraint, ConstraintResult};
use crate::prelude::*;
use crate::security::{InputValidator, SqlSecurity};
use async_trait::async_trait;
use datafusion::prelude::*;
use tracing::{debug, instrument};

/// A constraint that checks the fraction of non-null values in a column.
///
/// # Examples
///
/// ```rust
/// use ddlx_check::constraints::CompletenessConstraint;
/// use ddlx_check::core::Constraint;
///
/// let constraint = CompletenessConstraint::with_threshold("email", 0.95).unwrap();
/// assert_eq!(constraint.name(), "completeness");
/// ```
#[derive(Debug, Clone)]
pub struct CompletenessConstraint {
    column: String,
    threshold: f64,
}

impl CompletenessConstraint {
    /// Creates a constraint requiring at least `threshold` of rows to be non-null.
    pub fn with_threshold(column: impl Into<String>, threshold: f64) -> Result<Self> {
        let column = column.into();
        SqlSecurity::validate_identifier(&column)?;
        InputValidator::validate_percentage(threshold, "threshold")?;
        Ok(Self { column, threshold })
    }

    /// Creates a constraint requiring 100% completeness.
    pub fn complete(column: impl Into<String>) -> Result<Self> {
        Self::with_threshold(column, 1.0)
    }
}

#[async_trait]
impl Constraint for CompletenessConstraint {
    #[instrument(skip(self, ctx), fields(
        constraint.name = %self.name(),
        constraint.column = %self.column,
        constraint.threshold = %self.threshold
    ))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<ConstraintResult> {
        resolve_column(ctx, &self.column).await?;

        let column = SqlSecurity::escape_identifier(&self.column)?;
        let table = current_table()?;
        let sql = format!("SELECT COUNT({column}) AS matched, COUNT(*) AS total FROM {table}");

        let Some(completeness) = evaluate_ratio(ctx, self.name(), &sql).await? else {
            debug!(skip.reason = "No data to validate", "Skipping completeness");
            return Ok(ConstraintResult::skipped("No data to validate"));
        };

        Ok(ConstraintResult::from_ratio(completeness, self.threshold, || {
            format!(
                "Column '{}' completeness {:.2}% is below threshold {:.2}%",
                self.column,
                completeness * 100.0,
                self.threshold * 100.0
            )
        }))
    }

    fn name(&self) -> &str {
        "completeness"
    }

    fn column(&self) -> Option<&str> {
        Some(&self.column)
    }
}
