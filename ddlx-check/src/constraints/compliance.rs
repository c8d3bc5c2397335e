//! Compliance constraint: the fraction of rows satisfying a SQL predicate.

use super::{current_table, evaluate_ratio, resolve_column};
use crate::core::{Constraint, ConstraintResult};
use crate::prelude::*;
use crate::security::{InputValidator, SqlSecurity};
use async_trait::async_trait;
use datafusion::prelude::*;
use tracing::instrument;

/// Checks that at least `threshold` of rows satisfy a boolean SQL predicate.
///
/// Rows where the predicate evaluates to NULL count as not satisfying it.
///
/// # Examples
///
/// ```rust
/// use ddlx_check::constraints::ComplianceConstraint;
/// use ddlx_check::core::Constraint;
///
/// let like = ComplianceConstraint::like("Price", "%test%", 1.0).unwrap();
/// assert_eq!(like.predicate(), "CAST(\"Price\" AS VARCHAR) LIKE '%test%'");
/// assert_eq!(like.label(), "like_pattern(Price)");
///
/// let custom = ComplianceConstraint::new("positive_price", "Price > 0", 0.99).unwrap();
/// assert_eq!(custom.label(), "positive_price");
/// ```
#[derive(Debug, Clone)]
pub struct ComplianceConstraint {
    name: String,
    column: Option<String>,
    predicate: String,
    threshold: f64,
}

impl ComplianceConstraint {
    /// Creates a constraint over an arbitrary row predicate.
    pub fn new(
        name: impl Into<String>,
        predicate: impl Into<String>,
        threshold: f64,
    ) -> Result<Self> {
        let predicate = predicate.into();
        SqlSecurity::validate_sql_expression(&predicate)?;
        InputValidator::validate_percentage(threshold, "threshold")?;
        Ok(Self {
            name: name.into(),
            column: None,
            predicate,
            threshold,
        })
    }

    /// Values must match a SQL `LIKE` pattern (`%` and `_` wildcards).
    pub fn like(column: impl Into<String>, pattern: &str, threshold: f64) -> Result<Self> {
        let column = column.into();
        let escaped = SqlSecurity::escape_identifier(&column)?;
        let predicate = format!(
            "CAST({escaped} AS VARCHAR) LIKE '{}'",
            SqlSecurity::escape_string_literal(pattern)
        );
        Self::for_column("like_pattern", column, predicate, threshold)
    }

    /// Values must have a textual length greater than zero.
    pub fn not_empty(column: impl Into<String>, threshold: f64) -> Result<Self> {
        let column = column.into();
        let escaped = SqlSecurity::escape_identifier(&column)?;
        let predicate = format!("length(CAST({escaped} AS VARCHAR)) > 0");
        Self::for_column("not_empty", column, predicate, threshold)
    }

    fn for_column(
        name: &str,
        column: String,
        predicate: String,
        threshold: f64,
    ) -> Result<Self> {
        InputValidator::validate_percentage(threshold, "threshold")?;
        Ok(Self {
            name: name.to_string(),
            column: Some(column),
            predicate,
            threshold,
        })
    }

    /// The SQL predicate each row is tested against.
    pub fn predicate(&self) -> &str {
        &self.predicate
    }
}

#[async_trait]
impl Constraint for ComplianceConstraint {
    #[instrument(skip(self, ctx), fields(
        constraint.name = %self.name,
        predicate = %self.predicate
    ))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<ConstraintResult> {
        if let Some(column) = &self.column {
            resolve_column(ctx, column).await?;
        }

        let table = current_table()?;
        let sql = format!(
            "SELECT COUNT(CASE WHEN {predicate} THEN 1 END) AS matched, COUNT(*) AS total FROM {table}",
            predicate = self.predicate
        );

        let Some(ratio) = evaluate_ratio(ctx, &self.name, &sql).await? else {
            return Ok(ConstraintResult::skipped("No data to validate"));
        };

        Ok(ConstraintResult::from_ratio(ratio, self.threshold, || {
            format!(
                "{:.2}% of rows satisfy '{}', expected at least {:.2}%",
                ratio * 100.0,
                self.predicate,
                self.threshold * 100.0
            )
        }))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }
}
