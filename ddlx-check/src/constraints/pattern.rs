//! Regex pattern matching and literal containment.

use super::{current_table, evaluate_ratio, resolve_column};
use crate::core::{Constraint, ConstraintResult};
use crate::prelude::*;
use crate::security::{InputValidator, SqlSecurity};
use async_trait::async_trait;
use datafusion::prelude::*;
use tracing::{debug, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PatternKind {
    Regex,
    Contains,
}

/// Checks the fraction of rows whose value matches a regular expression.
///
/// Values are compared in their text form, so numeric columns can be matched
/// as well. Null values never match.
///
/// # Examples
///
/// ```rust
/// use ddlx_check::constraints::PatternConstraint;
/// use ddlx_check::core::Constraint;
///
/// let regex = PatternConstraint::regex("code", r"^\d{3}$", 1.0).unwrap();
/// assert_eq!(regex.label(), "pattern_match(code)");
///
/// let contains = PatternConstraint::contains("email", "@", 0.9).unwrap();
/// assert_eq!(contains.label(), "contains_value(email)");
/// ```
#[derive(Debug, Clone)]
pub struct PatternConstraint {
    column: String,
    /// Regex as written into the SQL literal, already quote-escaped.
    sql_pattern: String,
    display_pattern: String,
    threshold: f64,
    kind: PatternKind,
}

impl PatternConstraint {
    /// Requires at least `threshold` of rows to match `pattern`.
    pub fn regex(column: impl Into<String>, pattern: impl Into<String>, threshold: f64) -> Result<Self> {
        let pattern = pattern.into();
        Self::build(column.into(), pattern.clone(), pattern, threshold, PatternKind::Regex)
    }

    /// Requires at least `threshold` of rows to contain `value` as a literal substring.
    pub fn contains(column: impl Into<String>, value: impl Into<String>, threshold: f64) -> Result<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(DdlxError::Configuration(
                "contains_value requires a non-empty value".to_string(),
            ));
        }
        let pattern = regex::escape(&value);
        Self::build(column.into(), pattern, value, threshold, PatternKind::Contains)
    }

    fn build(
        column: String,
        pattern: String,
        display_pattern: String,
        threshold: f64,
        kind: PatternKind,
    ) -> Result<Self> {
        SqlSecurity::validate_identifier(&column)?;
        InputValidator::validate_percentage(threshold, "threshold")?;
        let sql_pattern = SqlSecurity::validate_regex_pattern(&pattern)?;
        Ok(Self {
            column,
            sql_pattern,
            display_pattern,
            threshold,
            kind,
        })
    }
}

#[async_trait]
impl Constraint for PatternConstraint {
    #[instrument(skip(self, ctx), fields(
        constraint.name = %self.name(),
        constraint.column = %self.column,
        pattern = %self.display_pattern
    ))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<ConstraintResult> {
        resolve_column(ctx, &self.column).await?;

        let column = SqlSecurity::escape_identifier(&self.column)?;
        let table = current_table()?;
        let sql = format!(
            "SELECT
                COUNT(CASE WHEN CAST({column} AS VARCHAR) ~ '{pattern}' THEN 1 END) AS matched,
                COUNT(*) AS total
             FROM {table}",
            pattern = self.sql_pattern
        );

        let Some(ratio) = evaluate_ratio(ctx, self.name(), &sql).await? else {
            return Ok(ConstraintResult::skipped("No data to validate"));
        };
        debug!(ratio, "Pattern ratio computed");

        Ok(ConstraintResult::from_ratio(ratio, self.threshold, || {
            let verb = match self.kind {
                PatternKind::Regex => "match pattern",
                PatternKind::Contains => "contain",
            };
            format!(
                "{:.2}% of values in column '{}' {verb} '{}', expected at least {:.2}%",
                ratio * 100.0,
                self.column,
                self.display_pattern,
                self.threshold * 100.0
            )
        }))
    }

    fn name(&self) -> &str {
        match self.kind {
            PatternKind::Regex => "pattern_match",
            PatternKind::Contains => "contains_value",
        }
    }

    fn column(&self) -> Option<&str> {
        Some(&self.column)
    }
}
