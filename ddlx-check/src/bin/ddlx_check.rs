//! Runs the column-level checks of a JSON configuration against a CSV file.
//!
//! Exit status is 0 when every check evaluated, 1 when at least one check
//! failed to evaluate and 2 when the inputs could not be loaded.

use clap::Parser;
use ddlx_check::config::TableChecksConfig;
use ddlx_check::core::{CombinedReport, OrchestratorConfig};
use ddlx_check::formatters::{FormatterConfig, OutputFormat};
use ddlx_check::logging::setup::{init_logging, LoggingConfig};
use ddlx_check::logging::LogConfig;
use ddlx_check::prelude::{ReportFormatter, Result};
use ddlx_check::sources::{CsvOptions, Dataset};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Check configuration (JSON)
    config: PathBuf,

    /// CSV file with a header row
    data: PathBuf,

    /// Report format: human, json or markdown
    #[arg(long, default_value = "human")]
    format: OutputFormat,

    /// Number of checks evaluated at the same time
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Only show rows whose constraint did not hold
    #[arg(long)]
    violations_only: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,

    /// Debug logging, including per-constraint details
    #[arg(short, long)]
    verbose: bool,
}

async fn run(args: &Args) -> Result<CombinedReport> {
    let config = TableChecksConfig::from_path(&args.config)?;
    let dataset = Dataset::from_csv(&args.data, CsvOptions::default()).await?;

    let log_config = if args.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };
    let orchestrator = config.orchestrator(
        OrchestratorConfig::default()
            .with_max_concurrent_checks(args.concurrency)
            .with_log_config(log_config),
    )?;

    Ok(orchestrator.check_table(&dataset).await)
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let logging = if args.verbose {
        LoggingConfig::development()
    } else {
        LoggingConfig::default()
    };
    if let Err(e) = init_logging(logging.with_json_format(args.json_logs)) {
        eprintln!("{e}");
    }

    let report = match run(&args).await {
        Ok(report) => report,
        Err(e) => {
            error!(error = %e, "Failed to run checks");
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    };

    let formatter_config = FormatterConfig::default()
        .with_colors(std::io::stdout().is_terminal())
        .with_passing_rows(!args.violations_only);
    match args.format.formatter(formatter_config).format(&report) {
        Ok(output) => println!("{output}"),
        Err(e) => {
            eprintln!("error: {e}");
            return ExitCode::from(2);
        }
    }

    if report.has_failures() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}
