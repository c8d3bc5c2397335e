//! Property-based tests for check orchestration.
//!
//! A scripted verifier stands in for the evaluation engine so that the
//! properties below can be checked over arbitrary mixes of clean and raising
//! checks:
//!
//! - every check yields exactly one outcome
//! - k raising checks out of N give k failures and the rows of the other N - k
//! - rows and failures keep declaration order at any concurrency
//! - running the same checks twice gives the same rows and failure messages

use arrow::array::Int64Array;
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use ddlx_check::core::{
    CheckDefinition, CheckStatus, ConstraintStatus, Level, Orchestrator, OrchestratorConfig,
    ResultRow, SubCheck, VerificationRequest, Verifier,
};
use ddlx_check::prelude::{DdlxError, Result};
use ddlx_check::sources::Dataset;
use proptest::prelude::*;
use std::sync::Arc;

/// Interprets the sub-check description: `raise:<msg>` fails, `rows:<n>` yields n rows.
#[derive(Debug)]
struct ScriptedVerifier;

#[async_trait]
impl Verifier for ScriptedVerifier {
    async fn verify(
        &self,
        _dataset: &Dataset,
        request: VerificationRequest,
    ) -> Result<Vec<ResultRow>> {
        if let Some(message) = request.description.strip_prefix("raise:") {
            return Err(DdlxError::Internal(message.to_string()));
        }

        let count: usize = request
            .description
            .strip_prefix("rows:")
            .and_then(|n| n.parse().ok())
            .unwrap_or(0);

        Ok((0..count)
            .map(|i| ResultRow {
                check: request.description.clone(),
                check_level: request.level,
                check_status: CheckStatus::Success,
                constraint: format!("scripted_{i}"),
                constraint_status: ConstraintStatus::Success,
                constraint_message: String::new(),
                metric: Some(1.0),
                check_category: String::new(),
                columns: String::new(),
                filter: None,
            })
            .collect())
    }
}

#[derive(Debug, Clone)]
enum Script {
    Rows(usize),
    Raise,
}

fn script_strategy() -> impl Strategy<Value = Vec<Script>> {
    prop::collection::vec(
        prop_oneof![
            (0usize..4).prop_map(Script::Rows),
            Just(Script::Raise),
        ],
        0..12,
    )
}

fn definitions(scripts: &[Script]) -> Vec<Arc<CheckDefinition>> {
    scripts
        .iter()
        .enumerate()
        .map(|(i, script)| {
            let description = match script {
                Script::Rows(n) => format!("rows:{n}"),
                Script::Raise => format!("raise:check {i} exploded"),
            };
            Arc::new(
                CheckDefinition::builder(format!("check_{i}"))
                    .level(Level::Warning)
                    .sub_check(SubCheck::unfiltered(description))
                    .build(),
            )
        })
        .collect()
}

fn dataset() -> Dataset {
    let schema = Arc::new(Schema::new(vec![Field::new("n", DataType::Int64, false)]));
    let batch = RecordBatch::try_new(schema, vec![Arc::new(Int64Array::from(vec![1, 2, 3]))])
        .unwrap();
    Dataset::from_batches("data", vec![batch]).unwrap()
}

proptest! {
    #[test]
    fn test_fault_isolation_and_order(scripts in script_strategy(), concurrency in 1usize..5) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let orchestrator = Orchestrator::builder()
                .verifier(ScriptedVerifier)
                .config(OrchestratorConfig::default().with_max_concurrent_checks(concurrency))
                .build()
                .unwrap();
            let checks = definitions(&scripts);
            let report = orchestrator.run_all(&dataset(), &checks).await;

            let expected_failures: Vec<String> = scripts
                .iter()
                .enumerate()
                .filter(|(_, s)| matches!(s, Script::Raise))
                .map(|(i, _)| format!("check_{i}"))
                .collect();
            let actual_failures: Vec<String> =
                report.failures.iter().map(|f| f.check_name.clone()).collect();
            prop_assert_eq!(actual_failures, expected_failures);

            let expected_rows: Vec<String> = scripts
                .iter()
                .enumerate()
                .flat_map(|(i, s)| match s {
                    Script::Rows(n) => vec![format!("check_{i}"); *n],
                    Script::Raise => Vec::new(),
                })
                .collect();
            let actual_rows: Vec<String> = report
                .results
                .rows()
                .iter()
                .map(|r| r.columns.clone())
                .collect();
            prop_assert_eq!(actual_rows, expected_rows);

            prop_assert_eq!(report.metrics.total_checks, scripts.len());
            prop_assert_eq!(
                report.metrics.succeeded_checks + report.metrics.failed_checks,
                scripts.len()
            );
            for failure in &report.failures {
                prop_assert!(failure.status().starts_with("failure: "));
                prop_assert!(failure.message.contains("exploded"));
            }
            Ok(())
        })?;
    }

    #[test]
    fn test_runs_are_idempotent(scripts in script_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let orchestrator = Orchestrator::builder()
                .verifier(ScriptedVerifier)
                .build()
                .unwrap();
            let checks = definitions(&scripts);
            let data = dataset();

            let first = orchestrator.run_all(&data, &checks).await;
            let second = orchestrator.run_all(&data, &checks).await;

            prop_assert_eq!(&first.results, &second.results);
            prop_assert_eq!(&first.failures, &second.failures);
            Ok(())
        })?;
    }

    #[test]
    fn test_all_raising_gives_empty_table(n in 0usize..10) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let orchestrator = Orchestrator::builder()
                .verifier(ScriptedVerifier)
                .build()
                .unwrap();
            let checks = definitions(&vec![Script::Raise; n]);
            let report = orchestrator.run_all(&dataset(), &checks).await;

            prop_assert!(report.results.is_empty());
            prop_assert_eq!(report.failures.len(), n);
            prop_assert_eq!(report.results.to_record_batch().unwrap().num_rows(), 0);
            Ok(())
        })?;
    }
}
