//! JSON check configuration.
//!
//! A configuration describes one table and, per column, groups of rules that
//! share a row filter. [`TableChecksConfig::to_check_definitions`] turns it
//! into one [`CheckDefinition`] per column that has rules. Declaring a column
//! `not_null`, `primary_key` or with a `data_type` adds the matching rules to
//! its unfiltered group.
//!
//! ```json
//! {
//!   "table": "test",
//!   "level": "warning",
//!   "columns": [
//!     {
//!       "name": "Id",
//!       "data_type": "VARCHAR(10)",
//!       "primary_key": true,
//!       "rules": [
//!         { "rules": [{ "type": "non_null" }, { "type": "is_type" }] },
//!         { "filter": "Price > 1", "rules": [{ "type": "regex_pattern", "pattern": "^\\d+$", "threshold": 0.9 }] }
//!       ]
//!     }
//!   ]
//! }
//! ```

use crate::constraints::{
    CompletenessConstraint, ComplianceConstraint, DataClass, DataTypeConstraint,
    PatternConstraint, UniquenessConstraint,
};
use crate::core::{
    CheckDefinition, Constraint, Level, Orchestrator, OrchestratorConfig, SubCheck,
    COLUMN_LEVEL_CATEGORY,
};
use crate::prelude::*;
use crate::security::SqlSecurity;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

fn default_threshold() -> f64 {
    1.0
}

/// A single column rule. The JSON `type` field selects the variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ColumnRule {
    /// SQL `LIKE` pattern with `%` and `_` wildcards
    LikePattern {
        pattern: String,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    RegexPattern {
        pattern: String,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    /// Literal substring
    ContainsValue {
        value: String,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    Uniqueness {
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    NonNull {
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    NotEmpty {
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
    /// Values conform to the declared SQL type; falls back to the column's `data_type`
    IsType {
        #[serde(default)]
        data_type: Option<String>,
        #[serde(default = "default_threshold")]
        threshold: f64,
    },
}

impl ColumnRule {
    /// Builds the constraint enforcing this rule on `column`.
    pub fn to_constraint(&self, column: &ColumnConfig) -> Result<Arc<dyn Constraint>> {
        let name = column.name.as_str();
        let constraint: Arc<dyn Constraint> = match self {
            ColumnRule::LikePattern { pattern, threshold } => {
                Arc::new(ComplianceConstraint::like(name, pattern, *threshold)?)
            }
            ColumnRule::RegexPattern { pattern, threshold } => {
                Arc::new(PatternConstraint::regex(name, pattern.as_str(), *threshold)?)
            }
            ColumnRule::ContainsValue { value, threshold } => {
                Arc::new(PatternConstraint::contains(name, value.as_str(), *threshold)?)
            }
            ColumnRule::Uniqueness { threshold } => {
                Arc::new(UniquenessConstraint::with_threshold(name, *threshold)?)
            }
            ColumnRule::NonNull { threshold } => {
                Arc::new(CompletenessConstraint::with_threshold(name, *threshold)?)
            }
            ColumnRule::NotEmpty { threshold } => {
                Arc::new(ComplianceConstraint::not_empty(name, *threshold)?)
            }
            ColumnRule::IsType {
                data_type,
                threshold,
            } => {
                let declared = data_type
                    .as_deref()
                    .or(column.data_type.as_deref())
                    .ok_or_else(|| {
                        DdlxError::Configuration(format!(
                            "is_type rule on column '{name}' needs a data_type"
                        ))
                    })?;
                Arc::new(DataTypeConstraint::for_declared_type(name, declared, *threshold)?)
            }
        };
        Ok(constraint)
    }
}

/// Rules sharing one optional row filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleGroupConfig {
    /// SQL predicate selecting the rows the rules apply to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
    pub rules: Vec<ColumnRule>,
}

impl RuleGroupConfig {
    /// The filter text, with blank filters treated as absent.
    pub fn filter_text(&self) -> Option<&str> {
        self.filter
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub name: String,
    /// Declared SQL type, e.g. `VARCHAR(10)`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
    #[serde(default)]
    pub not_null: bool,
    #[serde(default)]
    pub primary_key: bool,
    #[serde(default)]
    pub rules: Vec<RuleGroupConfig>,
}

impl ColumnConfig {
    /// Rules that follow from the column declaration itself.
    ///
    /// `not_null` and `primary_key` imply `non_null`, `primary_key` also
    /// implies `uniqueness`, and a declared type implies `is_type`. A rule is
    /// left out when an unfiltered group already states the same kind, and
    /// types without a value class (dates, times) imply nothing.
    pub fn implied_rules(&self) -> Result<Vec<ColumnRule>> {
        let explicit: Vec<_> = self
            .rules
            .iter()
            .filter(|g| g.filter_text().is_none())
            .flat_map(|g| g.rules.iter().map(std::mem::discriminant))
            .collect();

        let mut implied = Vec::new();
        if self.not_null || self.primary_key {
            implied.push(ColumnRule::NonNull {
                threshold: default_threshold(),
            });
        }
        if self.primary_key {
            implied.push(ColumnRule::Uniqueness {
                threshold: default_threshold(),
            });
        }
        if let Some(declared) = self.data_type.as_deref() {
            let class = DataClass::from_str(declared).map_err(|e| {
                DdlxError::Configuration(format!("Column '{}': {e}", self.name))
            })?;
            if class.constrainable_type().is_ok() {
                implied.push(ColumnRule::IsType {
                    data_type: None,
                    threshold: default_threshold(),
                });
            } else {
                debug!(column = %self.name, data_type = %declared, "No implied type check for declared type");
            }
        }

        implied.retain(|rule| !explicit.contains(&std::mem::discriminant(rule)));
        Ok(implied)
    }
}

/// Column-level checks for one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableChecksConfig {
    pub table: String,
    #[serde(default)]
    pub level: Level,
    pub columns: Vec<ColumnConfig>,
}

/// Merges rule groups whose filter text is identical.
///
/// Groups keep the position of their first appearance; rules of later
/// duplicates are appended in order.
pub fn combine_identical_filters(groups: Vec<RuleGroupConfig>) -> Vec<RuleGroupConfig> {
    let mut combined: Vec<RuleGroupConfig> = Vec::with_capacity(groups.len());

    for group in groups {
        let key = group.filter_text().map(str::to_string);
        match combined
            .iter_mut()
            .find(|existing| existing.filter_text() == key.as_deref())
        {
            Some(existing) => existing.rules.extend(group.rules),
            None => combined.push(RuleGroupConfig {
                filter: key,
                rules: group.rules,
            }),
        }
    }

    combined
}

impl TableChecksConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DdlxError::data_source_with_source(
                "Config",
                format!("Failed to read {}", path.display()),
                Box::new(e),
            )
        })?;
        let config = Self::from_json_str(&contents)?;
        info!(config.path = %path.display(), config.table = %config.table, "Loaded check configuration");
        Ok(config)
    }

    /// Checks names and filters without building constraints.
    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(DdlxError::Configuration(
                "Table name cannot be empty".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for column in &self.columns {
            SqlSecurity::validate_identifier(&column.name)?;
            if !seen.insert(column.name.to_lowercase()) {
                return Err(DdlxError::Configuration(format!(
                    "Column '{}' is configured more than once",
                    column.name
                )));
            }
            for group in &column.rules {
                if let Some(filter) = group.filter_text() {
                    SqlSecurity::validate_sql_expression(filter)?;
                }
            }
        }
        Ok(())
    }

    /// Name of the check generated for `column`.
    pub fn check_name(column: &str) -> String {
        format!("column_level_checks_{}", column.to_lowercase())
    }

    /// One definition per column that has rules, in column order.
    pub fn to_check_definitions(&self) -> Result<Vec<CheckDefinition>> {
        let mut definitions = Vec::new();

        for column in &self.columns {
            let implied = column.implied_rules()?;
            let mut declared = Vec::with_capacity(column.rules.len() + 1);
            if !implied.is_empty() {
                declared.push(RuleGroupConfig {
                    filter: None,
                    rules: implied,
                });
            }
            declared.extend(column.rules.iter().cloned());

            let groups = combine_identical_filters(declared);
            if groups.iter().all(|g| g.rules.is_empty()) {
                debug!(column = %column.name, "Column has no rules, skipping");
                continue;
            }

            let description = format!(
                "Autogenerated check for column level rules for table {} and column {}",
                self.table, column.name
            );

            let mut sub_checks = Vec::with_capacity(groups.len());
            for group in groups.iter().filter(|g| !g.rules.is_empty()) {
                let constraints = group
                    .rules
                    .iter()
                    .map(|rule| rule.to_constraint(column))
                    .collect::<Result<Vec<_>>>()
                    .map_err(|e| {
                        DdlxError::Configuration(format!(
                            "Invalid rule for column '{}': {e}",
                            column.name
                        ))
                    })?;

                let sub_check = match group.filter_text() {
                    Some(filter) => {
                        SubCheck::filtered(format!("{description} with filter {filter}"), filter)
                    }
                    None => SubCheck::unfiltered(description.clone()),
                };
                sub_checks.push(sub_check.constraints_from(constraints));
            }

            definitions.push(
                CheckDefinition::builder(Self::check_name(&column.name))
                    .description(description)
                    .level(self.level)
                    .category(COLUMN_LEVEL_CATEGORY)
                    .target(format!("{}.{}", self.table, column.name).to_lowercase())
                    .sub_checks(sub_checks)
                    .build(),
            );
        }

        Ok(definitions)
    }

    /// Orchestrator with this table's column-level checks pre-declared.
    pub fn orchestrator(&self, config: OrchestratorConfig) -> Result<Orchestrator> {
        Orchestrator::builder()
            .config(config)
            .column_level_checks(self.to_check_definitions()?)
            .build()
    }
}
