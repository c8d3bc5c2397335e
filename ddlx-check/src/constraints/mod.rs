//! Built-in constraint implementations.
//!
//! Each constraint maps onto one rule kind of the check configuration and is
//! evaluated as a single aggregate query against the table named by the
//! current [`ValidationContext`](crate::core::ValidationContext):
//!
//! | Rule kind | Constraint | Ratio |
//! |---|---|---|
//! | `non_null` | [`CompletenessConstraint`] | non-null rows / rows |
//! | `uniqueness` | [`UniquenessConstraint`] | rows with a value seen once / rows |
//! | `regex_pattern` | [`PatternConstraint::regex`] | matching rows / rows |
//! | `contains_value` | [`PatternConstraint::contains`] | rows containing the literal / rows |
//! | `like_pattern` | [`ComplianceConstraint::like`] | `LIKE` matches / rows |
//! | `not_empty` | [`ComplianceConstraint::not_empty`] | rows with `length > 0` / rows |
//! | `is_type` | [`DataTypeConstraint`] | rows conforming to the type / rows |
//!
//! A constraint passes when its ratio is at least its threshold. Evaluating
//! against a column that does not exist raises
//! [`DdlxError::ColumnNotFound`](crate::error::DdlxError::ColumnNotFound).
//!
//! ```rust
//! use ddlx_check::constraints::{CompletenessConstraint, PatternConstraint};
//! use ddlx_check::core::Constraint;
//!
//! # fn example() -> ddlx_check::prelude::Result<()> {
//! let complete = CompletenessConstraint::complete("id")?;
//! let pattern = PatternConstraint::regex("id", r"^[A-Z]{2}\d{4}$", 0.98)?;
//! assert_eq!(complete.label(), "completeness(id)");
//! assert_eq!(pattern.label(), "pattern_match(id)");
//! # Ok(())
//! # }
//! ```

mod completeness;
mod compliance;
mod datatype;
mod pattern;
mod uniqueness;

pub use completeness::CompletenessConstraint;
pub use compliance::ComplianceConstraint;
pub use datatype::{ConstrainableType, DataClass, DataTypeConstraint};
pub use pattern::PatternConstraint;
pub use uniqueness::UniquenessConstraint;

use crate::core::current_validation_context;
use crate::prelude::*;
use crate::security::SqlSecurity;
use arrow::array::{Array, Int64Array};
use arrow::datatypes::DataType;
use datafusion::common::TableReference;
use datafusion::prelude::*;

/// Looks up the Arrow type of `column` in the table under validation.
pub(crate) async fn resolve_column(ctx: &SessionContext, column: &str) -> Result<DataType> {
    let validation_ctx = current_validation_context();
    let df = ctx
        .table(TableReference::bare(validation_ctx.table_name()))
        .await?;
    df.schema()
        .field_with_unqualified_name(column)
        .map(|field| field.data_type().clone())
        .map_err(|_| DdlxError::column_not_found(column))
}

/// Quoted name of the table under validation.
pub(crate) fn current_table() -> Result<String> {
    SqlSecurity::escape_identifier(current_validation_context().table_name())
}

/// Runs a query returning `(matched, total)` counts and yields their ratio.
///
/// Returns `None` when the table has no rows.
pub(crate) async fn evaluate_ratio(
    ctx: &SessionContext,
    constraint: &str,
    sql: &str,
) -> Result<Option<f64>> {
    let batches = ctx.sql(sql).await?.collect().await?;

    let Some(batch) = batches.iter().find(|b| b.num_rows() > 0) else {
        return Ok(None);
    };

    let count_at = |index: usize, what: &str| -> Result<f64> {
        let array = batch
            .column(index)
            .as_any()
            .downcast_ref::<Int64Array>()
            .ok_or_else(|| {
                DdlxError::constraint_evaluation(constraint, format!("Failed to extract {what}"))
            })?;
        Ok(if array.is_null(0) {
            0.0
        } else {
            array.value(0) as f64
        })
    };

    let matched = count_at(0, "matched count")?;
    let total = count_at(1, "total count")?;

    if total == 0.0 {
        return Ok(None);
    }
    Ok(Some(matched / total))
}
