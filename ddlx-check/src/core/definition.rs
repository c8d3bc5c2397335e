//! Declarative check definitions.
//!
//! A [`CheckDefinition`] bundles one or more [`SubCheck`]s under a unique
//! name. Each sub-check is a list of constraints, optionally scoped to the
//! rows matching a filter predicate. An unfiltered check is simply a
//! definition with a single sub-check whose filter is `None`.

use super::{Constraint, Level};
use std::fmt;
use std::sync::Arc;

/// Category tag attached to rows produced by column-level checks.
pub const COLUMN_LEVEL_CATEGORY: &str = "column level";

/// A list of constraints evaluated against the full dataset or a filtered subset.
#[derive(Clone)]
pub struct SubCheck {
    filter: Option<String>,
    description: String,
    constraints: Vec<Arc<dyn Constraint>>,
}

impl SubCheck {
    /// Sub-check over every row.
    pub fn unfiltered(description: impl Into<String>) -> Self {
        Self {
            filter: None,
            description: description.into(),
            constraints: Vec::new(),
        }
    }

    /// Sub-check over the rows satisfying `filter`, a SQL boolean expression.
    pub fn filtered(description: impl Into<String>, filter: impl Into<String>) -> Self {
        Self {
            filter: Some(filter.into()),
            description: description.into(),
            constraints: Vec::new(),
        }
    }

    pub fn constraint(mut self, constraint: impl Constraint + 'static) -> Self {
        self.constraints.push(Arc::new(constraint));
        self
    }

    pub fn arc_constraint(mut self, constraint: Arc<dyn Constraint>) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn constraints_from(
        mut self,
        constraints: impl IntoIterator<Item = Arc<dyn Constraint>>,
    ) -> Self {
        self.constraints.extend(constraints);
        self
    }

    pub fn filter(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn constraints(&self) -> &[Arc<dyn Constraint>] {
        &self.constraints
    }
}

impl fmt::Debug for SubCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubCheck")
            .field("filter", &self.filter)
            .field("description", &self.description)
            .field(
                "constraints",
                &self.constraints.iter().map(|c| c.label()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// A named, self-contained validation unit.
///
/// The name is the key under which a failure is reported; the target is the
/// `columns` tag stamped on every result row.
///
/// # Examples
///
/// ```rust
/// use ddlx_check::constraints::CompletenessConstraint;
/// use ddlx_check::core::{CheckDefinition, Level, SubCheck};
///
/// # fn example() -> ddlx_check::prelude::Result<()> {
/// let check = CheckDefinition::builder("column_level_checks_id")
///     .description("Id must be present")
///     .level(Level::Error)
///     .target("orders.id")
///     .sub_check(SubCheck::unfiltered("Id must be present").constraint(CompletenessConstraint::complete("id")?))
///     .build();
///
/// assert_eq!(check.name(), "column_level_checks_id");
/// assert_eq!(check.target(), "orders.id");
/// assert_eq!(check.sub_checks().len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CheckDefinition {
    name: String,
    description: String,
    level: Level,
    category: String,
    target: Option<String>,
    sub_checks: Vec<SubCheck>,
}

impl CheckDefinition {
    pub fn builder(name: impl Into<String>) -> CheckDefinitionBuilder {
        CheckDefinitionBuilder::new(name)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// The `columns` tag for result rows, defaulting to the check name.
    pub fn target(&self) -> &str {
        self.target.as_deref().unwrap_or(&self.name)
    }

    pub fn sub_checks(&self) -> &[SubCheck] {
        &self.sub_checks
    }

    /// Total number of constraints across all sub-checks.
    pub fn constraint_count(&self) -> usize {
        self.sub_checks.iter().map(|s| s.constraints().len()).sum()
    }
}

/// Builder for [`CheckDefinition`].
#[derive(Debug)]
pub struct CheckDefinitionBuilder {
    name: String,
    description: Option<String>,
    level: Level,
    category: String,
    target: Option<String>,
    sub_checks: Vec<SubCheck>,
}

impl CheckDefinitionBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            level: Level::default(),
            category: COLUMN_LEVEL_CATEGORY.to_string(),
            target: None,
            sub_checks: Vec::new(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn sub_check(mut self, sub_check: SubCheck) -> Self {
        self.sub_checks.push(sub_check);
        self
    }

    pub fn sub_checks(mut self, sub_checks: impl IntoIterator<Item = SubCheck>) -> Self {
        self.sub_checks.extend(sub_checks);
        self
    }

    /// Finishes the definition. The description defaults to the name.
    pub fn build(self) -> CheckDefinition {
        CheckDefinition {
            description: self.description.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            level: self.level,
            category: self.category,
            target: self.target,
            sub_checks: self.sub_checks,
        }
    }
}
