//! # ddlx-check - Column-Level Data Quality Checks
//!
//! ddlx-check runs named, column-level data quality checks against a tabular
//! dataset held in Apache DataFusion. Each check bundles constraints, optionally
//! scoped to the rows matching a filter, and every check is isolated: a check
//! that cannot be evaluated is reported as a failure while the remaining checks
//! still run.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ddlx_check::config::TableChecksConfig;
//! use ddlx_check::core::OrchestratorConfig;
//! use ddlx_check::formatters::{HumanFormatter, ReportFormatter};
//! use ddlx_check::sources::{CsvOptions, Dataset};
//!
//! # async fn example() -> ddlx_check::prelude::Result<()> {
//! let config = TableChecksConfig::from_path("checks.json")?;
//! let dataset = Dataset::from_csv("data.csv", CsvOptions::default()).await?;
//!
//! let orchestrator = config.orchestrator(OrchestratorConfig::default())?;
//! let report = orchestrator.check_table(&dataset).await;
//!
//! println!("{}", HumanFormatter::new().format(&report)?);
//! for failure in &report.failures {
//!     eprintln!("{}: {}", failure.check_name, failure.status());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`core`]: check definitions, the orchestrator and the verification seam
//! - [`constraints`]: completeness, uniqueness, pattern, compliance and type rules
//! - [`config`]: JSON configuration that builds check definitions
//! - [`sources`]: datasets backed by CSV files or Arrow record batches
//! - [`formatters`]: human, JSON and Markdown reports

pub mod config;
pub mod constraints;
pub mod core;
pub mod error;
pub mod formatters;
pub mod logging;
pub mod prelude;
pub mod security;
pub mod sources;

#[cfg(test)]
pub mod test_helpers;
