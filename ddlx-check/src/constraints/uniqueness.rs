//! Uniqueness constraint.

use super::{current_table, evaluate_ratio, resolve_column};
use crate::core::{Constraint, ConstraintResult};
use crate::prelude::*;
use crate::security::{InputValidator, SqlSecurity};
use async_trait::async_trait;
use datafusion::prelude::*;
use tracing::instrument;

/// Checks the fraction of rows whose value occurs exactly once in the column.
///
/// Null values never count as unique, so a fully unique column with nulls
/// falls below a threshold of 1.0.
#[derive(Debug, Clone)]
pub struct UniquenessConstraint {
    column: String,
    threshold: f64,
}

impl UniquenessConstraint {
    pub fn with_threshold(column: impl Into<String>, threshold: f64) -> Result<Self> {
        let column = column.into();
        SqlSecurity::validate_identifier(&column)?;
        InputValidator::validate_percentage(threshold, "threshold")?;
        Ok(Self { column, threshold })
    }

    /// Every row must hold a distinct, non-null value.
    pub fn unique(column: impl Into<String>) -> Result<Self> {
        Self::with_threshold(column, 1.0)
    }
}

#[async_trait]
impl Constraint for UniquenessConstraint {
    #[instrument(skip(self, ctx), fields(
        constraint.name = %self.name(),
        constraint.column = %self.column
    ))]
    async fn evaluate(&self, ctx: &SessionContext) -> Result<ConstraintResult> {
        resolve_column(ctx, &self.column).await?;

        let column = SqlSecurity::escape_identifier(&self.column)?;
        let table = current_table()?;
        let sql = format!(
            "SELECT
                COALESCE(SUM(CASE WHEN group_value IS NOT NULL AND occurrences = 1 THEN 1 ELSE 0 END), 0) AS matched,
                COALESCE(SUM(occurrences), 0) AS total
             FROM (SELECT {column} AS group_value, COUNT(*) AS occurrences FROM {table} GROUP BY {column})"
        );

        let Some(uniqueness) = evaluate_ratio(ctx, self.name(), &sql).await? else {
            return Ok(ConstraintResult::skipped("No data to validate"));
        };

        Ok(ConstraintResult::from_ratio(uniqueness, self.threshold, || {
            format!(
                "Column '{}' uniqueness {:.2}% is below threshold {:.2}%",
                self.column,
                uniqueness * 100.0,
                self.threshold * 100.0
            )
        }))
    }

    fn name(&self) -> &str {
        "uniqueness"
    }

    fn column(&self) -> Option<&str> {
        Some(&self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ConstraintStatus;
    use crate::sources::Dataset;
    use crate::test_helpers::{evaluate_constraint_with_context, people_dataset};
    use arrow::array::StringArray;
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_unique_column() {
        let dataset = people_dataset();
        let constraint = UniquenessConstraint::unique("Name").unwrap();
        let result = evaluate_constraint_with_context(&constraint, dataset.context(), "data")
            .await
            .unwrap();
        assert_eq!(result.status, ConstraintStatus::Success);
        assert_eq!(result.metric, Some(1.0));
    }

    #[tokio::test]
    async fn test_duplicates_and_nulls_reduce_uniqueness() {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Utf8, true)]));
        let batch = RecordBatch::try_new(
            schema,
            vec![Arc::new(StringArray::from(vec![
                Some("a"),
                Some("a"),
                Some("b"),
                None,
            ]))],
        )
        .unwrap();
        let dataset = Dataset::from_batches("data", vec![batch]).unwrap();

        let constraint = UniquenessConstraint::unique("id").unwrap();
        let result = evaluate_constraint_with_context(&constraint, dataset.context(), "data")
            .await
            .unwrap();
        assert_eq!(result.status, ConstraintStatus::Failure);
        // Only "b" occurs exactly once
        assert_eq!(result.metric, Some(0.25));
    }
}
