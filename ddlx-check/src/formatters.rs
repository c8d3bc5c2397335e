//! Rendering of combined check reports.
//!
//! Three formatters share the [`ReportFormatter`] trait: [`HumanFormatter`]
//! for terminals, [`JsonFormatter`] for machines and [`MarkdownFormatter`] for
//! documentation. All of them render an empty result table as an explicit
//! "no results" state rather than omitting it.
//!
//! # Examples
//!
//! ```rust
//! use ddlx_check::core::CombinedReport;
//! use ddlx_check::formatters::{HumanFormatter, ReportFormatter};
//!
//! let report = CombinedReport::new();
//! let output = HumanFormatter::new().format(&report).unwrap();
//! assert!(output.contains("No results"));
//! ```

use crate::core::{CombinedReport, ResultRow, ResultTable};
use crate::prelude::*;
use arrow::util::pretty::pretty_format_batches;
use serde_json::json;
use std::fmt::Write;
use std::str::FromStr;

const EMPTY_RESULTS: &str = "No results: no check produced result rows";

/// Options shared by all formatters.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the run metrics summary
    pub include_metrics: bool,
    /// Include the list of checks that failed to evaluate
    pub include_failures: bool,
    /// Include rows whose constraint held, not just violations
    pub include_passing_rows: bool,
    /// Maximum number of result rows to render (`None` for all)
    pub max_rows: Option<usize>,
    /// ANSI colors in human output
    pub use_colors: bool,
    pub include_timestamps: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_metrics: true,
            include_failures: true,
            include_passing_rows: true,
            max_rows: None,
            use_colors: true,
            include_timestamps: true,
        }
    }
}

impl FormatterConfig {
    /// Summary and failures only.
    pub fn minimal() -> Self {
        Self {
            include_metrics: true,
            include_failures: true,
            include_passing_rows: false,
            max_rows: Some(0),
            use_colors: false,
            include_timestamps: false,
        }
    }

    /// Plain text, violations only, bounded output.
    pub fn ci() -> Self {
        Self {
            include_metrics: true,
            include_failures: true,
            include_passing_rows: false,
            max_rows: Some(50),
            use_colors: false,
            include_timestamps: true,
        }
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    pub fn with_max_rows(mut self, max_rows: Option<usize>) -> Self {
        self.max_rows = max_rows;
        self
    }

    pub fn with_passing_rows(mut self, include: bool) -> Self {
        self.include_passing_rows = include;
        self
    }

    /// Rows to render under this configuration, and how many were left out.
    fn select_rows<'a>(&self, table: &'a ResultTable) -> (Vec<&'a ResultRow>, usize) {
        let candidates: Vec<&ResultRow> = table
            .rows()
            .iter()
            .filter(|r| self.include_passing_rows || !r.constraint_status.is_success())
            .collect();
        let limit = self.max_rows.unwrap_or(candidates.len()).min(candidates.len());
        let hidden = candidates.len() - limit;
        (candidates.into_iter().take(limit).collect(), hidden)
    }
}

/// Converts a report into a textual representation.
pub trait ReportFormatter {
    fn format(&self, report: &CombinedReport) -> Result<String>;

    fn format_with_config(&self, report: &CombinedReport, _config: &FormatterConfig) -> Result<String> {
        self.format(report)
    }
}

/// Output format selector, e.g. for a `--format` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    #[default]
    Human,
    Json,
    Markdown,
}

impl OutputFormat {
    /// Boxed formatter for this format.
    pub fn formatter(&self, config: FormatterConfig) -> Box<dyn ReportFormatter> {
        match self {
            OutputFormat::Human => Box::new(HumanFormatter::with_config(config)),
            OutputFormat::Json => Box::new(JsonFormatter::with_config(config)),
            OutputFormat::Markdown => Box::new(MarkdownFormatter::with_config(config)),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = DdlxError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "human" | "text" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            other => Err(DdlxError::Configuration(format!(
                "Unknown output format '{other}', expected human, json or markdown"
            ))),
        }
    }
}

fn render_error(e: std::fmt::Error) -> DdlxError {
    DdlxError::Internal(format!("Failed to render report: {e}"))
}

/// Serializes the report as JSON.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &CombinedReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &CombinedReport, config: &FormatterConfig) -> Result<String> {
        let (rows, hidden) = config.select_rows(&report.results);

        let mut value = json!({
            "results": rows,
            "failures": report.failures.iter().map(|f| json!({
                "check": f.check_name,
                "status": f.status(),
            })).collect::<Vec<_>>(),
        });

        if hidden > 0 {
            value["hidden_rows"] = json!(hidden);
        }
        if !config.include_failures {
            if let Some(object) = value.as_object_mut() {
                object.remove("failures");
            }
        }
        if config.include_metrics {
            value["metrics"] = serde_json::to_value(&report.metrics)?;
        }
        if config.include_timestamps {
            value["timestamp"] = json!(report.timestamp);
        }

        let output = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(output)
    }
}

/// Console output: summary, result table and failures.
///
/// The result table is drawn with Arrow's pretty printer.
#[derive(Debug, Clone)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn paint(config: &FormatterConfig, code: &str, text: &str) -> String {
        if config.use_colors {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    /// Pretty-printed result rows, or `None` when no row is selected.
    fn results_grid(report: &CombinedReport, config: &FormatterConfig) -> Result<(Option<String>, usize)> {
        let (rows, hidden) = config.select_rows(&report.results);
        if rows.is_empty() {
            return Ok((None, hidden));
        }
        let selected = ResultTable::from_rows(rows.into_iter().cloned().collect());
        let batch = selected.to_record_batch()?;
        Ok((Some(pretty_format_batches(&[batch])?.to_string()), hidden))
    }

    fn render(
        report: &CombinedReport,
        config: &FormatterConfig,
        grid: Option<String>,
        hidden: usize,
        w: &mut String,
    ) -> std::fmt::Result {
        writeln!(w)?;
        if report.is_clean() {
            writeln!(w, "✅ {}", Self::paint(config, "32", "All checks passed"))?;
        } else if report.has_failures() {
            writeln!(w, "❌ {}", Self::paint(config, "31", "Some checks failed to evaluate"))?;
        } else {
            writeln!(w, "⚠️  {}", Self::paint(config, "33", "Constraint violations found"))?;
        }

        if config.include_timestamps {
            writeln!(w, "Timestamp: {}", report.timestamp)?;
        }

        if config.include_metrics {
            let m = &report.metrics;
            writeln!(w)?;
            writeln!(w, "📊 Summary:")?;
            writeln!(w, "   Checks: {}", m.total_checks)?;
            writeln!(w, "   Evaluated: {}", m.succeeded_checks)?;
            writeln!(w, "   Failed to evaluate: {}", m.failed_checks)?;
            writeln!(w, "   Result rows: {}", m.result_rows)?;
            writeln!(w, "   Violated constraints: {}", m.failed_constraints)?;
            writeln!(w, "   Execution Time: {}ms", m.execution_time_ms)?;
        }

        writeln!(w)?;
        if report.results.is_empty() {
            writeln!(w, "{EMPTY_RESULTS}")?;
        } else {
            if let Some(grid) = grid {
                writeln!(w, "{grid}")?;
            }
            if hidden > 0 {
                writeln!(w, "   ... {hidden} more rows not shown")?;
            }
        }

        if config.include_failures && !report.failures.is_empty() {
            writeln!(w)?;
            writeln!(w, "🔍 Checks that failed to evaluate:")?;
            for failure in &report.failures {
                writeln!(
                    w,
                    "   {} {}",
                    Self::paint(config, "31", &failure.check_name),
                    failure.status()
                )?;
            }
        }

        Ok(())
    }
}

impl Default for HumanFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &CombinedReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &CombinedReport, config: &FormatterConfig) -> Result<String> {
        let (grid, hidden) = Self::results_grid(report, config)?;
        let mut output = String::new();
        Self::render(report, config, grid, hidden, &mut output).map_err(render_error)?;
        Ok(output)
    }
}

/// Markdown report with a results table and a failures section.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the level of the top heading (1-6).
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 6);
        self
    }

    fn heading(&self, offset: u8) -> String {
        "#".repeat((self.heading_level + offset).min(6) as usize)
    }

    fn render(&self, report: &CombinedReport, config: &FormatterConfig, w: &mut String) -> std::fmt::Result {
        writeln!(w, "{} Data Quality Report", self.heading(0))?;
        writeln!(w)?;

        if config.include_timestamps {
            writeln!(w, "**Timestamp:** {}", report.timestamp)?;
            writeln!(w)?;
        }

        if config.include_metrics {
            let m = &report.metrics;
            writeln!(w, "{} Summary", self.heading(1))?;
            writeln!(w)?;
            writeln!(w, "| Metric | Value |")?;
            writeln!(w, "|--------|-------|")?;
            writeln!(w, "| Checks | {} |", m.total_checks)?;
            writeln!(w, "| Evaluated | {} |", m.succeeded_checks)?;
            writeln!(w, "| Failed to evaluate | {} |", m.failed_checks)?;
            writeln!(w, "| Result rows | {} |", m.result_rows)?;
            writeln!(w, "| Violated constraints | {} |", m.failed_constraints)?;
            writeln!(w)?;
        }

        writeln!(w, "{} Results", self.heading(1))?;
        writeln!(w)?;
        if report.results.is_empty() {
            writeln!(w, "_{EMPTY_RESULTS}_")?;
        } else {
            let (rows, hidden) = config.select_rows(&report.results);
            if !rows.is_empty() {
                writeln!(
                    w,
                    "| Check | Level | Status | Constraint | Constraint Status | Metric | Columns | Filter | Message |"
                )?;
                writeln!(w, "|---|---|---|---|---|---|---|---|---|")?;
                for row in rows {
                    writeln!(
                        w,
                        "| {} | {} | {} | {} | {} | {} | {} | {} | {} |",
                        escape_cell(&row.check),
                        row.check_level,
                        row.check_status,
                        escape_cell(&row.constraint),
                        row.constraint_status,
                        row.metric.map(|m| format!("{m:.3}")).unwrap_or_default(),
                        escape_cell(&row.columns),
                        escape_cell(row.filter.as_deref().unwrap_or("")),
                        escape_cell(&row.constraint_message),
                    )?;
                }
            }
            if hidden > 0 {
                writeln!(w)?;
                writeln!(w, "_{hidden} more rows not shown_")?;
            }
        }

        if config.include_failures && !report.failures.is_empty() {
            writeln!(w)?;
            writeln!(w, "{} Failed Checks", self.heading(1))?;
            writeln!(w)?;
            for failure in &report.failures {
                writeln!(
                    w,
                    "- **{}**: {}",
                    escape_cell(&failure.check_name),
                    escape_cell(&failure.status())
                )?;
            }
        }

        Ok(())
    }
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|").replace('\n', " ")
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &CombinedReport) -> Result<String> {
        self.format_with_config(report, &self.config)
    }

    fn format_with_config(&self, report: &CombinedReport, config: &FormatterConfig) -> Result<String> {
        let mut output = String::new();
        self.render(report, config, &mut output).map_err(render_error)?;
        Ok(output)
    }
}
