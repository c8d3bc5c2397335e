//! Dataset handles and data loading.
//!
//! A [`Dataset`] pairs a DataFusion [`SessionContext`] with the name of the
//! table to validate. Loading data is the caller's business; this module only
//! offers the common entry points (CSV with an inferred schema, in-memory Arrow
//! batches, or an existing context) and the filtered views checks evaluate
//! against.

use crate::prelude::*;
use crate::security::SqlSecurity;
use arrow::record_batch::RecordBatch;
use datafusion::common::TableReference;
use datafusion::datasource::MemTable;
use datafusion::execution::context::SessionConfig;
use datafusion::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Table name used when none is given.
pub const DEFAULT_TABLE_NAME: &str = "data";

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(0);

/// Options for reading a delimited text file.
#[derive(Debug, Clone)]
pub struct CsvOptions {
    /// Whether the file has a header row
    pub has_header: bool,
    /// Field delimiter (default: ',')
    pub delimiter: u8,
    /// Maximum records to read for schema inference
    pub schema_infer_max_records: usize,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            has_header: true,
            delimiter: b',',
            schema_infer_max_records: 1000,
        }
    }
}

/// A read-only handle to the tabular data under validation.
///
/// Cloning is cheap: clones share the underlying session.
///
/// # Examples
///
/// ```rust,no_run
/// use ddlx_check::sources::{CsvOptions, Dataset};
///
/// # async fn example() -> ddlx_check::prelude::Result<()> {
/// let dataset = Dataset::from_csv("data/test.csv", CsvOptions::default()).await?;
/// assert_eq!(dataset.table_name(), "data");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Dataset {
    ctx: SessionContext,
    table_name: Arc<str>,
}

impl std::fmt::Debug for Dataset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("table_name", &self.table_name)
            .finish_non_exhaustive()
    }
}

impl Dataset {
    /// Wraps an existing session in which `table_name` is already registered.
    pub fn new(ctx: SessionContext, table_name: impl Into<String>) -> Result<Self> {
        let table_name = table_name.into();
        SqlSecurity::validate_identifier(&table_name)?;
        Ok(Self {
            ctx,
            table_name: table_name.into(),
        })
    }

    /// Session configuration used for datasets created by this module.
    ///
    /// Identifier normalization is disabled so that filter predicates and
    /// column names keep the casing of the source header.
    pub fn session_config() -> SessionConfig {
        SessionConfig::new().set_bool("datafusion.sql_parser.enable_ident_normalization", false)
    }

    /// Loads a delimited text file as table [`DEFAULT_TABLE_NAME`].
    #[instrument(skip(path, options), fields(path = %path.as_ref().display()))]
    pub async fn from_csv(path: impl AsRef<Path>, options: CsvOptions) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_str().ok_or_else(|| {
            DdlxError::data_source("CSV", format!("Path is not valid UTF-8: {}", path.display()))
        })?;
        if !path.exists() {
            return Err(DdlxError::data_source(
                "CSV",
                format!("File not found: {path_str}"),
            ));
        }

        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{ext}"))
            .unwrap_or_default();

        let ctx = SessionContext::new_with_config(Self::session_config());
        let read_options = CsvReadOptions::new()
            .has_header(options.has_header)
            .delimiter(options.delimiter)
            .schema_infer_max_records(options.schema_infer_max_records)
            .file_extension(&extension);

        ctx.register_csv(DEFAULT_TABLE_NAME, path_str, read_options)
            .await
            .map_err(|e| {
                DdlxError::data_source_with_source(
                    "CSV",
                    format!("Failed to register {path_str}"),
                    Box::new(e),
                )
            })?;

        info!(table.name = DEFAULT_TABLE_NAME, source.path = %path_str, "Registered CSV dataset");
        Self::new(ctx, DEFAULT_TABLE_NAME)
    }

    /// Registers in-memory Arrow batches as table `table_name`.
    ///
    /// All batches must share one schema; at least one batch is required.
    pub fn from_batches(table_name: impl Into<String>, batches: Vec<RecordBatch>) -> Result<Self> {
        let table_name = table_name.into();
        SqlSecurity::validate_identifier(&table_name)?;

        let schema = batches
            .first()
            .map(|batch| batch.schema())
            .ok_or_else(|| DdlxError::data_source("Memory", "At least one batch is required"))?;

        let table = MemTable::try_new(schema, vec![batches])?;
        let ctx = SessionContext::new_with_config(Self::session_config());
        ctx.register_table(TableReference::bare(table_name.as_str()), Arc::new(table))?;

        debug!(table.name = %table_name, "Registered in-memory dataset");
        Self::new(ctx, table_name)
    }

    /// Returns the underlying DataFusion session.
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Returns the name of the table holding this dataset's rows.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Counts the rows of this dataset.
    pub async fn row_count(&self) -> Result<usize> {
        let df = self
            .ctx
            .table(TableReference::bare(self.table_name.as_ref()))
            .await?;
        Ok(df.count().await?)
    }

    /// Restricts this dataset to rows matching a SQL predicate.
    ///
    /// The view is registered under a fresh name in the same session and
    /// removed again when the returned [`FilteredView`] is dropped. The
    /// original table is untouched, so other checks keep seeing every row.
    #[instrument(skip(self), fields(table.name = %self.table_name))]
    pub async fn filter(&self, predicate: &str) -> Result<FilteredView> {
        SqlSecurity::validate_sql_expression(predicate)?;

        let source = SqlSecurity::escape_identifier(&self.table_name)?;
        let view_name = format!(
            "{}__filtered_{}",
            self.table_name,
            NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed)
        );

        let df = self
            .ctx
            .sql(&format!("SELECT * FROM {source} WHERE {predicate}"))
            .await?;
        self.ctx
            .register_table(TableReference::bare(view_name.as_str()), df.into_view())?;

        debug!(view.name = %view_name, filter = %predicate, "Registered filtered view");
        Ok(FilteredView {
            dataset: Dataset {
                ctx: self.ctx.clone(),
                table_name: view_name.into(),
            },
        })
    }
}

/// A dataset restricted by a row filter.
///
/// Derefs to [`Dataset`]; deregisters its view on drop.
#[derive(Debug)]
pub struct FilteredView {
    dataset: Dataset,
}

impl std::ops::Deref for FilteredView {
    type Target = Dataset;

    fn deref(&self) -> &Dataset {
        &self.dataset
    }
}

impl Drop for FilteredView {
    fn drop(&mut self) {
        let reference = TableReference::bare(self.dataset.table_name.as_ref());
        if let Err(e) = self.dataset.ctx.deregister_table(reference) {
            debug!(view.name = %self.dataset.table_name, error = %e, "Failed to deregister view");
        }
    }
}
