//! Core types for defining and running checks.
//!
//! ## Overview
//!
//! - **[`CheckDefinition`]**: a named check made of one or more [`SubCheck`]s
//! - **[`SubCheck`]**: constraints evaluated against all rows or a filtered subset
//! - **[`Constraint`]**: an individual rule (implemented in the `constraints` module)
//! - **[`Verifier`]**: evaluates a group of constraints and returns result rows
//! - **[`Orchestrator`]**: runs checks with per-check fault isolation
//! - **[`CombinedReport`]**: the merged result table plus the failed checks
//!
//! ## Architecture
//!
//! ```text
//! Orchestrator
//!     ├── CheckDefinition "column_level_checks_id"
//!     │   ├── SubCheck (no filter)    ── Verifier ──> rows
//!     │   └── SubCheck ("Price > 1")  ── Verifier ──> rows
//!     └── CheckDefinition "column_level_checks_price"
//!         └── SubCheck (no filter)    ── Verifier ──> error ──> failure
//! ```

pub mod constraint;
pub mod definition;
pub mod level;
pub mod orchestrator;
pub mod outcome;
pub mod validation_context;
pub mod verification;

pub use constraint::{Constraint, ConstraintResult, ConstraintStatus};
pub use definition::{CheckDefinition, CheckDefinitionBuilder, SubCheck, COLUMN_LEVEL_CATEGORY};
pub use level::{CheckStatus, Level};
pub use orchestrator::{Orchestrator, OrchestratorBuilder, OrchestratorConfig};
pub use outcome::{CheckFailure, CheckOutcome, CombinedReport, ResultRow, ResultTable, RunMetrics};
pub use validation_context::{current_validation_context, ValidationContext};
pub use verification::{DataFusionVerifier, VerificationRequest, Verifier};
