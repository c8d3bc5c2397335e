//! Check outcomes and the combined report.

use super::{CheckStatus, ConstraintStatus, Level};
use crate::prelude::*;
use arrow::array::{ArrayRef, Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// One constraint's result within a check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    /// Description of the sub-check that produced the row
    pub check: String,
    pub check_level: Level,
    pub check_status: CheckStatus,
    /// Constraint label, e.g. `completeness(id)`
    pub constraint: String,
    pub constraint_status: ConstraintStatus,
    #[serde(default)]
    pub constraint_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric: Option<f64>,
    pub check_category: String,
    pub columns: String,
    /// Filter predicate the row was evaluated under, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

/// Ordered result rows sharing one fixed schema.
///
/// An empty table is a valid, explicit state: a run where no check succeeded
/// still reports a table, just with zero rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultTable {
    rows: Vec<ResultRow>,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    /// Arrow schema of [`to_record_batch`](Self::to_record_batch).
    pub fn schema() -> SchemaRef {
        Arc::new(Schema::new(vec![
            Field::new("check", DataType::Utf8, false),
            Field::new("check_level", DataType::Utf8, false),
            Field::new("check_status", DataType::Utf8, false),
            Field::new("constraint", DataType::Utf8, false),
            Field::new("constraint_status", DataType::Utf8, false),
            Field::new("constraint_message", DataType::Utf8, false),
            Field::new("metric", DataType::Float64, true),
            Field::new("check_category", DataType::Utf8, false),
            Field::new("columns", DataType::Utf8, false),
            Field::new("filter", DataType::Utf8, true),
        ]))
    }

    /// Converts the rows into a single Arrow batch; an empty table gives an
    /// empty batch with the full schema.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let text = |f: fn(&ResultRow) -> &str| -> ArrayRef {
            Arc::new(StringArray::from_iter_values(self.rows.iter().map(f)))
        };

        let columns: Vec<ArrayRef> = vec![
            text(|r| &r.check),
            text(|r| r.check_level.as_str()),
            text(|r| r.check_status.as_str()),
            text(|r| &r.constraint),
            text(|r| r.constraint_status.as_str()),
            text(|r| &r.constraint_message),
            Arc::new(Float64Array::from_iter(self.rows.iter().map(|r| r.metric))),
            text(|r| &r.check_category),
            text(|r| &r.columns),
            Arc::new(StringArray::from_iter(
                self.rows.iter().map(|r| r.filter.as_deref()),
            )),
        ];

        Ok(RecordBatch::try_new(Self::schema(), columns)?)
    }

    /// Appends every row of `other`, keeping order.
    pub fn append(&mut self, other: ResultTable) {
        self.rows.extend(other.rows);
    }

    pub fn push(&mut self, row: ResultRow) {
        self.rows.push(row);
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl IntoIterator for ResultTable {
    type Item = ResultRow;
    type IntoIter = std::vec::IntoIter<ResultRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

/// What running one check produced.
///
/// `Failure` means the check could not be evaluated (an error was raised),
/// not that its constraints were violated; violations are successes whose
/// rows carry a failing status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "lowercase")]
pub enum CheckOutcome {
    Success(ResultTable),
    Failure(String),
}

impl CheckOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, CheckOutcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, CheckOutcome::Failure(_))
    }

    pub fn table(&self) -> Option<&ResultTable> {
        match self {
            CheckOutcome::Success(table) => Some(table),
            CheckOutcome::Failure(_) => None,
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            CheckOutcome::Success(_) => None,
            CheckOutcome::Failure(message) => Some(message),
        }
    }
}

/// A check that raised, keyed by its name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckFailure {
    pub check_name: String,
    pub message: String,
}

impl CheckFailure {
    pub fn new(check_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            check_name: check_name.into(),
            message: message.into(),
        }
    }

    /// Status text in the `failure: <message>` form.
    pub fn status(&self) -> String {
        format!("failure: {}", self.message)
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.check_name, self.status())
    }
}

/// Counters collected by a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Number of checks attempted
    pub total_checks: usize,
    /// Checks that evaluated without raising
    pub succeeded_checks: usize,
    /// Checks that raised
    pub failed_checks: usize,
    /// Rows in the combined result table
    pub result_rows: usize,
    /// Rows whose constraint did not hold
    pub failed_constraints: usize,
    /// Wall-clock duration of the run in milliseconds
    pub execution_time_ms: u64,
}

impl RunMetrics {
    /// Percentage of checks that evaluated cleanly (100 when none ran).
    pub fn success_rate(&self) -> f64 {
        if self.total_checks == 0 {
            100.0
        } else {
            (self.succeeded_checks as f64 / self.total_checks as f64) * 100.0
        }
    }
}

/// Merged results of running a batch of checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinedReport {
    /// Rows of every successful check, in declaration order
    pub results: ResultTable,
    /// Checks that raised, in declaration order
    pub failures: Vec<CheckFailure>,
    pub metrics: RunMetrics,
    /// When the run started (RFC 3339)
    pub timestamp: String,
}

impl CombinedReport {
    pub fn new() -> Self {
        Self {
            results: ResultTable::new(),
            failures: Vec::new(),
            metrics: RunMetrics::default(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Folds one check's outcome into the report.
    pub fn record(&mut self, check_name: &str, outcome: CheckOutcome) {
        self.metrics.total_checks += 1;
        match outcome {
            CheckOutcome::Success(table) => {
                self.metrics.succeeded_checks += 1;
                self.metrics.failed_constraints += table
                    .rows()
                    .iter()
                    .filter(|r| r.constraint_status.is_failure())
                    .count();
                self.results.append(table);
                self.metrics.result_rows = self.results.len();
            }
            CheckOutcome::Failure(message) => {
                self.metrics.failed_checks += 1;
                self.failures.push(CheckFailure::new(check_name, message));
            }
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// True when nothing raised and every constraint held.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.metrics.failed_constraints == 0
    }

    /// Failures as `(check name, status)` pairs.
    pub fn failure_pairs(&self) -> Vec<(String, String)> {
        self.failures
            .iter()
            .map(|f| (f.check_name.clone(), f.status()))
            .collect()
    }
}

impl Default for CombinedReport {
    fn default() -> Self {
        Self::new()
    }
}
