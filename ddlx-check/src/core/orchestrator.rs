//! Runs check definitions against a dataset and merges their outcomes.
//!
//! Every check is evaluated in isolation: an error raised while filtering or
//! verifying one check turns that check into a [`CheckOutcome::Failure`] and
//! the run moves on. Successful checks contribute their rows to one combined
//! [`ResultTable`] in declaration order.
//!
//! ```rust
//! use ddlx_check::constraints::{CompletenessConstraint, PatternConstraint};
//! use ddlx_check::core::{CheckDefinition, Orchestrator, SubCheck};
//! use ddlx_check::sources::Dataset;
//! use arrow::array::StringArray;
//! use arrow::datatypes::{DataType, Field, Schema};
//! use arrow::record_batch::RecordBatch;
//! use std::sync::Arc;
//!
//! # async fn example() -> ddlx_check::prelude::Result<()> {
//! let schema = Arc::new(Schema::new(vec![Field::new("col_a", DataType::Utf8, true)]));
//! let batch = RecordBatch::try_new(schema, vec![Arc::new(StringArray::from(vec!["x"]))])?;
//! let dataset = Dataset::from_batches("data", vec![batch])?;
//!
//! let orchestrator = Orchestrator::builder()
//!     .column_level_check(
//!         CheckDefinition::builder("col_a")
//!             .sub_check(SubCheck::unfiltered("col_a").constraint(CompletenessConstraint::complete("col_a")?))
//!             .build(),
//!     )
//!     .column_level_check(
//!         CheckDefinition::builder("col_b")
//!             .sub_check(SubCheck::unfiltered("col_b").constraint(PatternConstraint::regex("col_b", "^x$", 1.0)?))
//!             .build(),
//!     )
//!     .build()?;
//!
//! let report = orchestrator.check_table(&dataset).await;
//! assert_eq!(report.results.len(), 1);
//! assert_eq!(report.failures[0].check_name, "col_b");
//! # Ok(())
//! # }
//! ```

use super::{
    CheckDefinition, CheckOutcome, CombinedReport, DataFusionVerifier, ResultTable,
    VerificationRequest, Verifier,
};
use crate::logging::LogConfig;
use crate::prelude::*;
use crate::sources::Dataset;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Execution settings for an [`Orchestrator`].
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Checks evaluated at the same time; 1 runs them one after another.
    /// Outcome order is declaration order regardless.
    pub max_concurrent_checks: usize,
    pub log_config: LogConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_checks: 1,
            log_config: LogConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    /// One check in flight per CPU.
    pub fn parallel() -> Self {
        Self {
            max_concurrent_checks: num_cpus::get().max(1),
            ..Self::default()
        }
    }

    pub fn with_max_concurrent_checks(mut self, max: usize) -> Self {
        self.max_concurrent_checks = max.max(1);
        self
    }

    pub fn with_log_config(mut self, log_config: LogConfig) -> Self {
        self.log_config = log_config;
        self
    }
}

/// Runs column-level checks and combines their outcomes into one report.
#[derive(Debug, Clone)]
pub struct Orchestrator {
    verifier: Arc<dyn Verifier>,
    column_level_checks: Vec<Arc<CheckDefinition>>,
    config: OrchestratorConfig,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self {
            verifier: Arc::new(DataFusionVerifier::new()),
            column_level_checks: Vec::new(),
            config: OrchestratorConfig::default(),
        }
    }
}

impl Orchestrator {
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::new()
    }

    /// Orchestrator with the DataFusion verifier and no pre-declared checks.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn column_level_checks(&self) -> &[Arc<CheckDefinition>] {
        &self.column_level_checks
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Runs one check. Never fails: errors become [`CheckOutcome::Failure`].
    ///
    /// Sub-checks run in order, each against the full dataset or a filtered
    /// view of it. If any sub-check raises, rows gathered so far are
    /// discarded and the check fails as a whole.
    #[instrument(skip(self, dataset, check), fields(
        check.name = %check.name(),
        check.level = %check.level(),
        check.sub_checks = check.sub_checks().len()
    ))]
    pub async fn run_check(&self, dataset: &Dataset, check: &CheckDefinition) -> CheckOutcome {
        match self.evaluate_check(dataset, check).await {
            Ok(table) => {
                crate::perf_debug!(self.config.log_config, check.rows = table.len(), "Check evaluated");
                CheckOutcome::Success(table)
            }
            Err(e) => {
                let message = e.to_string();
                warn!(
                    check.name = %check.name(),
                    error = %self.config.log_config.truncate(&message),
                    "Check failed to evaluate"
                );
                CheckOutcome::Failure(message)
            }
        }
    }

    async fn evaluate_check(&self, dataset: &Dataset, check: &CheckDefinition) -> Result<ResultTable> {
        let mut table = ResultTable::new();

        for sub_check in check.sub_checks() {
            let request = VerificationRequest::new(
                sub_check.description(),
                check.level(),
                sub_check.constraints().to_vec(),
            );

            let rows = match sub_check.filter() {
                Some(predicate) => {
                    let view = dataset.filter(predicate).await?;
                    if self.config.log_config.log_data_operations {
                        crate::perf_debug!(
                            self.config.log_config,
                            filter = %predicate,
                            view.name = %view.table_name(),
                            "Evaluating filtered sub-check"
                        );
                    }
                    self.verifier.verify(&view, request).await?
                }
                None => self.verifier.verify(dataset, request).await?,
            };

            for mut row in rows {
                row.check_category = check.category().to_string();
                row.columns = check.target().to_string();
                row.filter = sub_check.filter().map(str::to_string);
                table.push(row);
            }
        }

        Ok(table)
    }

    /// Runs every check and merges the outcomes.
    ///
    /// The report lists successful rows and failures in the order the checks
    /// were given, whatever the configured concurrency.
    #[instrument(skip(self, dataset, checks), fields(
        table = %dataset.table_name(),
        checks = checks.len(),
        concurrency = self.config.max_concurrent_checks
    ))]
    pub async fn run_all(&self, dataset: &Dataset, checks: &[Arc<CheckDefinition>]) -> CombinedReport {
        info!(checks = checks.len(), "Starting check run");
        let start_time = Instant::now();
        let mut report = CombinedReport::new();

        let mut seen = HashSet::new();
        for check in checks {
            if !seen.insert(check.name()) {
                warn!(check.name = %check.name(), "Duplicate check name; failures will be ambiguous");
            }
        }

        let outcomes: Vec<_> = stream::iter(checks)
            .map(|check| async move { (check, self.run_check(dataset, check).await) })
            .buffered(self.config.max_concurrent_checks.max(1))
            .collect()
            .await;

        for (check, outcome) in outcomes {
            report.record(check.name(), outcome);
        }
        report.metrics.execution_time_ms = start_time.elapsed().as_millis() as u64;

        info!(
            metrics.total = report.metrics.total_checks,
            metrics.succeeded = report.metrics.succeeded_checks,
            metrics.failed = report.metrics.failed_checks,
            metrics.rows = report.metrics.result_rows,
            metrics.duration_ms = report.metrics.execution_time_ms,
            "Check run completed"
        );
        report
    }

    /// Runs the pre-declared column-level checks.
    pub async fn check_column_level(&self, dataset: &Dataset) -> CombinedReport {
        self.run_all(dataset, &self.column_level_checks).await
    }

    /// Runs every check category for the table. Currently column-level only.
    pub async fn check_table(&self, dataset: &Dataset) -> CombinedReport {
        self.check_column_level(dataset).await
    }
}

/// Builder for [`Orchestrator`].
#[derive(Debug, Default)]
pub struct OrchestratorBuilder {
    verifier: Option<Arc<dyn Verifier>>,
    column_level_checks: Vec<Arc<CheckDefinition>>,
    config: OrchestratorConfig,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the default [`DataFusionVerifier`].
    pub fn verifier(mut self, verifier: impl Verifier + 'static) -> Self {
        self.verifier = Some(Arc::new(verifier));
        self
    }

    pub fn column_level_check(mut self, check: impl Into<Arc<CheckDefinition>>) -> Self {
        self.column_level_checks.push(check.into());
        self
    }

    pub fn column_level_checks<I, C>(mut self, checks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Arc<CheckDefinition>>,
    {
        self.column_level_checks
            .extend(checks.into_iter().map(Into::into));
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds the orchestrator, rejecting duplicate check names.
    pub fn build(self) -> Result<Orchestrator> {
        let mut seen = HashSet::new();
        for check in &self.column_level_checks {
            if !seen.insert(check.name()) {
                return Err(DdlxError::Configuration(format!(
                    "Duplicate check name '{}'",
                    check.name()
                )));
            }
        }

        let verifier = match self.verifier {
            Some(verifier) => verifier,
            None => Arc::new(DataFusionVerifier::with_log_config(
                self.config.log_config.clone(),
            )),
        };

        Ok(Orchestrator {
            verifier,
            column_level_checks: self.column_level_checks,
            config: self.config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::{CompletenessConstraint, PatternConstraint};
    use crate::core::{ConstraintStatus, SubCheck};
    use crate::core::ResultRow;
    use crate::test_helpers::{people_dataset, RaisingConstraint};
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records when each verification started.
    #[derive(Debug, Default, Clone)]
    struct StampingVerifier {
        started: Arc<Mutex<Vec<DateTime<Utc>>>>,
    }

    #[async_trait]
    impl Verifier for StampingVerifier {
        async fn verify(
            &self,
            _dataset: &Dataset,
            _request: VerificationRequest,
        ) -> Result<Vec<ResultRow>> {
            self.started.lock().unwrap().push(Utc::now());
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok(Vec::new())
        }
    }

    fn completeness_check(name: &str, column: &str) -> CheckDefinition {
        CheckDefinition::builder(name)
            .sub_check(
                SubCheck::unfiltered(name)
                    .constraint(CompletenessConstraint::complete(column).unwrap()),
            )
            .build()
    }

    #[tokio::test]
    async fn test_run_check_tags_rows() {
        let dataset = people_dataset();
        let check = CheckDefinition::builder("people")
            .target("test.email")
            .sub_check(
                SubCheck::filtered("adults", "age > 18")
                    .constraint(CompletenessConstraint::complete("email").unwrap()),
            )
            .sub_check(
                SubCheck::unfiltered("everyone")
                    .constraint(CompletenessConstraint::complete("email").unwrap()),
            )
            .build();

        let outcome = Orchestrator::new().run_check(&dataset, &check).await;
        let table = outcome.table().unwrap();
        assert_eq!(table.len(), 2);

        let first = &table.rows()[0];
        assert_eq!(first.filter.as_deref(), Some("age > 18"));
        assert_eq!(first.check, "adults");
        assert_eq!(first.columns, "test.email");
        assert_eq!(first.check_category, "column level");
        // alice and carol are adults; carol has no email
        assert_eq!(first.metric, Some(0.5));

        let second = &table.rows()[1];
        assert_eq!(second.filter, None);
        assert_eq!(second.metric, Some(0.75));
    }

    #[tokio::test]
    async fn test_zero_sub_checks_is_empty_success() {
        let dataset = people_dataset();
        let check = CheckDefinition::builder("empty").build();
        let outcome = Orchestrator::new().run_check(&dataset, &check).await;
        assert_eq!(outcome, CheckOutcome::Success(ResultTable::new()));
    }

    #[tokio::test]
    async fn test_partial_rows_discarded_on_failure() {
        let dataset = people_dataset();
        let check = CheckDefinition::builder("mixed")
            .sub_check(
                SubCheck::unfiltered("ok")
                    .constraint(CompletenessConstraint::complete("Name").unwrap()),
            )
            .sub_check(SubCheck::unfiltered("broken").constraint(RaisingConstraint {
                message: "kaput".to_string(),
            }))
            .build();

        let outcome = Orchestrator::new().run_check(&dataset, &check).await;
        assert!(outcome.failure_message().unwrap().contains("kaput"));
    }

    #[tokio::test]
    async fn test_bad_filter_fails_check() {
        let dataset = people_dataset();
        let check = CheckDefinition::builder("filtered")
            .sub_check(
                SubCheck::filtered("bad", "no_such_column > 1")
                    .constraint(CompletenessConstraint::complete("Name").unwrap()),
            )
            .build();

        let outcome = Orchestrator::new().run_check(&dataset, &check).await;
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn test_run_all_isolates_failures() {
        let dataset = people_dataset();
        let checks: Vec<Arc<CheckDefinition>> = vec![
            Arc::new(completeness_check("col_a", "Name")),
            Arc::new(
                CheckDefinition::builder("col_b")
                    .sub_check(
                        SubCheck::unfiltered("col_b")
                            .constraint(PatternConstraint::regex("col_b", "^x$", 1.0).unwrap()),
                    )
                    .build(),
            ),
            Arc::new(completeness_check("email", "email")),
        ];

        let report = Orchestrator::new().run_all(&dataset, &checks).await;
        assert_eq!(report.results.len(), 2);
        assert_eq!(report.results.rows()[0].check, "col_a");
        assert_eq!(report.results.rows()[1].check, "email");
        assert_eq!(
            report.results.rows()[1].constraint_status,
            ConstraintStatus::Failure
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].check_name, "col_b");
        assert!(report.failures[0].status().starts_with("failure: "));
        assert!(report.failures[0].message.contains("col_b"));
        assert_eq!(report.metrics.total_checks, 3);
    }

    #[tokio::test]
    async fn test_concurrent_run_keeps_order() {
        let dataset = people_dataset();
        let checks: Vec<Arc<CheckDefinition>> = ["Name", "age", "email", "score"]
            .iter()
            .map(|c| Arc::new(completeness_check(c, c)))
            .collect();

        let orchestrator = Orchestrator::builder()
            .config(OrchestratorConfig::default().with_max_concurrent_checks(4))
            .build()
            .unwrap();
        let report = orchestrator.run_all(&dataset, &checks).await;

        let order: Vec<_> = report.results.rows().iter().map(|r| r.check.as_str()).collect();
        assert_eq!(order, vec!["Name", "age", "email", "score"]);
    }

    #[tokio::test]
    async fn test_check_table_runs_declared_checks() {
        let dataset = people_dataset();
        let orchestrator = Orchestrator::builder()
            .column_level_check(completeness_check("names", "Name"))
            .build()
            .unwrap();

        let report = orchestrator.check_table(&dataset).await;
        assert_eq!(report.results.len(), 1);
        assert!(report.failures.is_empty());
    }

    #[tokio::test]
    async fn test_report_timestamp_marks_run_start() {
        let dataset = people_dataset();
        let verifier = StampingVerifier::default();
        let orchestrator = Orchestrator::builder()
            .verifier(verifier.clone())
            .column_level_check(CheckDefinition::builder("a").sub_check(SubCheck::unfiltered("a")).build())
            .column_level_check(CheckDefinition::builder("b").sub_check(SubCheck::unfiltered("b")).build())
            .build()
            .unwrap();

        let report = orchestrator.check_table(&dataset).await;
        let run_started = DateTime::parse_from_rfc3339(&report.timestamp)
            .unwrap()
            .with_timezone(&Utc);

        let started = verifier.started.lock().unwrap().clone();
        assert_eq!(started.len(), 2);
        assert!(started.iter().all(|t| run_started <= *t));
    }

    #[test]
    fn test_builder_rejects_duplicate_names() {
        let result = Orchestrator::builder()
            .column_level_check(completeness_check("dup", "Name"))
            .column_level_check(completeness_check("dup", "age"))
            .build();
        assert!(matches!(result, Err(DdlxError::Configuration(_))));
    }
}
