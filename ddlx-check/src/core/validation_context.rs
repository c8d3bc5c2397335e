//! Validation context for passing the table under validation to constraints.

use std::sync::Arc;

/// Runtime context for constraint evaluation.
///
/// Holds the name of the table a constraint should query. The orchestrator
/// sets it per sub-check, so a constraint transparently runs against either
/// the full dataset or a filtered view.
#[derive(Debug, Clone)]
pub struct ValidationContext {
    table_name: Arc<str>,
}

impl ValidationContext {
    /// Creates a new validation context with the specified table name.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use ddlx_check::core::ValidationContext;
    ///
    /// let ctx = ValidationContext::new("customer_data");
    /// assert_eq!(ctx.table_name(), "customer_data");
    /// ```
    pub fn new(table_name: impl Into<Arc<str>>) -> Self {
        Self {
            table_name: table_name.into(),
        }
    }

    /// Returns the name of the table being validated.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }
}

impl Default for ValidationContext {
    fn default() -> Self {
        Self::new(crate::sources::DEFAULT_TABLE_NAME)
    }
}

tokio::task_local! {
    pub static CURRENT_CONTEXT: ValidationContext;
}

/// Gets the current validation context.
///
/// Returns the default context (table `data`) if no context has been set.
pub fn current_validation_context() -> ValidationContext {
    CURRENT_CONTEXT
        .try_with(|ctx| ctx.clone())
        .unwrap_or_default()
}
