//! Shared fixtures for unit tests.

use crate::core::{
    validation_context::CURRENT_CONTEXT, Constraint, ConstraintResult, ValidationContext,
};
use crate::prelude::*;
use crate::sources::Dataset;
use arrow::array::{ArrayRef, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use datafusion::prelude::SessionContext;
use std::sync::Arc;

/// Four people; two are older than 18, one has no email.
pub fn people_dataset() -> Dataset {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Name", DataType::Utf8, false),
        Field::new("age", DataType::Int64, false),
        Field::new("email", DataType::Utf8, true),
        Field::new("score", DataType::Utf8, true),
    ]));

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(vec!["alice", "bob", "carol", "dave"])) as ArrayRef,
            Arc::new(Int64Array::from(vec![30, 17, 45, 12])),
            Arc::new(StringArray::from(vec![
                Some("alice@example.com"),
                Some("bob@example.com"),
                None,
                Some("dave-at-example"),
            ])),
            Arc::new(StringArray::from(vec![
                Some("1.5"),
                Some("20"),
                Some("n/a"),
                None,
            ])),
        ],
    )
    .unwrap();

    Dataset::from_batches("data", vec![batch]).unwrap()
}

/// Evaluates a constraint with the given table name in the validation context.
pub async fn evaluate_constraint_with_context(
    constraint: &dyn Constraint,
    ctx: &SessionContext,
    table_name: &str,
) -> Result<ConstraintResult> {
    CURRENT_CONTEXT
        .scope(
            ValidationContext::new(table_name.to_string()),
            constraint.evaluate(ctx),
        )
        .await
}

/// A constraint whose evaluation always raises.
#[derive(Debug)]
pub struct RaisingConstraint {
    pub message: String,
}

#[async_trait]
impl Constraint for RaisingConstraint {
    async fn evaluate(&self, _ctx: &SessionContext) -> Result<ConstraintResult> {
        Err(DdlxError::constraint_evaluation("raising", self.message.clone()))
    }

    fn name(&self) -> &str {
        "raising"
    }
}
