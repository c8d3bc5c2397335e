//! The verification seam between the orchestrator and the evaluation engine.

use super::validation_context::CURRENT_CONTEXT;
use super::{CheckStatus, Constraint, Level, ResultRow, ValidationContext};
use crate::logging::LogConfig;
use crate::prelude::*;
use crate::sources::Dataset;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::instrument;

/// One verification call: a described group of constraints at a level.
#[derive(Debug, Clone)]
pub struct VerificationRequest {
    pub description: String,
    pub level: Level,
    pub constraints: Vec<Arc<dyn Constraint>>,
}

impl VerificationRequest {
    pub fn new(
        description: impl Into<String>,
        level: Level,
        constraints: Vec<Arc<dyn Constraint>>,
    ) -> Self {
        Self {
            description: description.into(),
            level,
            constraints,
        }
    }
}

/// Evaluates constraint groups against a dataset.
///
/// Implementations return one row per constraint, leaving `check_category`,
/// `columns` and `filter` for the orchestrator to stamp. Any `Err` marks the
/// whole check as failed.
#[async_trait]
pub trait Verifier: Debug + Send + Sync {
    async fn verify(
        &self,
        dataset: &Dataset,
        request: VerificationRequest,
    ) -> Result<Vec<ResultRow>>;
}

/// Runs each constraint as a DataFusion query against the dataset's table.
#[derive(Debug, Clone, Default)]
pub struct DataFusionVerifier {
    log_config: LogConfig,
}

impl DataFusionVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_config(log_config: LogConfig) -> Self {
        Self { log_config }
    }
}

#[async_trait]
impl Verifier for DataFusionVerifier {
    #[instrument(skip(self, dataset, request), fields(
        table = %dataset.table_name(),
        check.description = %request.description,
        check.constraints = request.constraints.len()
    ))]
    async fn verify(
        &self,
        dataset: &Dataset,
        request: VerificationRequest,
    ) -> Result<Vec<ResultRow>> {
        let validation_ctx = ValidationContext::new(dataset.table_name());
        let mut evaluated = Vec::with_capacity(request.constraints.len());

        for constraint in &request.constraints {
            let result = CURRENT_CONTEXT
                .scope(
                    validation_ctx.clone(),
                    constraint.evaluate(dataset.context()),
                )
                .await?;

            if self.log_config.log_constraint_details {
                crate::perf_debug!(
                    self.log_config,
                    constraint.label = %constraint.label(),
                    constraint.status = %result.status,
                    constraint.metric = ?result.metric,
                    "Constraint evaluated"
                );
            }
            evaluated.push((constraint.label(), result));
        }

        let any_failed = evaluated.iter().any(|(_, r)| r.status.is_failure());
        let check_status = CheckStatus::from_outcome(request.level, any_failed);

        Ok(evaluated
            .into_iter()
            .map(|(label, result)| ResultRow {
                check: request.description.clone(),
                check_level: request.level,
                check_status,
                constraint: label,
                constraint_status: result.status,
                constraint_message: result.message.unwrap_or_default(),
                metric: result.metric,
                check_category: String::new(),
                columns: String::new(),
                filter: None,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::CompletenessConstraint;
    use crate::core::ConstraintStatus;
    use crate::test_helpers::{people_dataset, RaisingConstraint};

    #[tokio::test]
    async fn test_rows_follow_constraint_order() {
        let dataset = people_dataset();
        let request = VerificationRequest::new(
            "people",
            Level::Error,
            vec![
                Arc::new(CompletenessConstraint::complete("Name").unwrap()),
                Arc::new(CompletenessConstraint::complete("email").unwrap()),
            ],
        );

        let rows = DataFusionVerifier::new().verify(&dataset, request).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].constraint, "completeness(Name)");
        assert_eq!(rows[0].constraint_status, ConstraintStatus::Success);
        assert_eq!(rows[1].constraint, "completeness(email)");
        assert_eq!(rows[1].constraint_status, ConstraintStatus::Failure);
        assert!(rows.iter().all(|r| r.check_status == CheckStatus::Error));
        assert!(rows.iter().all(|r| r.check == "people"));
    }

    #[tokio::test]
    async fn test_all_passing_is_success() {
        let dataset = people_dataset();
        let request = VerificationRequest::new(
            "names",
            Level::Warning,
            vec![Arc::new(CompletenessConstraint::complete("Name").unwrap())],
        );
        let rows = DataFusionVerifier::new().verify(&dataset, request).await.unwrap();
        assert_eq!(rows[0].check_status, CheckStatus::Success);
        assert_eq!(rows[0].constraint_message, "");
    }

    #[tokio::test]
    async fn test_evaluation_error_propagates() {
        let dataset = people_dataset();
        let request = VerificationRequest::new(
            "broken",
            Level::Warning,
            vec![
                Arc::new(CompletenessConstraint::complete("Name").unwrap()),
                Arc::new(RaisingConstraint {
                    message: "engine exploded".to_string(),
                }),
            ],
        );
        let err = DataFusionVerifier::new()
            .verify(&dataset, request)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("engine exploded"));
    }
}
