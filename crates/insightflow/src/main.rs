//! CLI entry point for the InsightFlow report pipeline.

use anyhow::{Result, anyhow};
use clap::Parser;
use dotenv::dotenv;
use insightflow::utils::{format_thousands, timestamp_filename, validate_file_extension};
use insightflow::{Pipeline, PipelineConfig, PipelineResult, ReportSpec, Upload};
use std::path::{Path, PathBuf};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    author = "InsightFlow Team",
    version,
    about = "Automated dataset report generator",
    long_about = "Loads a CSV, Excel or JSON dataset, computes summary statistics, \
                  renders charts and writes a paginated PDF report.\n\n\
                  EXAMPLES:\n  \
                  # Basic usage\n  \
                  insightflow -i data.csv\n\n  \
                  # Custom title and destination\n  \
                  insightflow -i sales.xlsx -t \"Q3 Sales\" -o reports/ --output-name q3\n\n  \
                  # Text-only report, machine-readable result\n  \
                  insightflow -i data.json --no-visuals --json"
)]
struct Args {
    /// Path to the dataset (.csv, .xlsx, .xls or .json)
    #[arg(short, long)]
    input: String,

    /// Report title
    #[arg(short, long, default_value = "Data Analysis Report")]
    title: String,

    /// Output directory for the report
    #[arg(short, long, default_value = "./output_reports")]
    output: String,

    /// Custom report file name
    ///
    /// If not specified, uses "InsightFlow_Report_{timestamp}.pdf"
    #[arg(long)]
    output_name: Option<String>,

    /// Leave the chart section out of the report
    #[arg(long)]
    no_visuals: bool,

    /// Output the pipeline result as JSON instead of a human-readable summary
    ///
    /// Disables all progress logs; only the JSON result is written to stdout.
    #[arg(long)]
    json: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Directory for per-run temporary files
    #[arg(long)]
    workspace: Option<PathBuf>,

    /// TrueType font used for chart text
    #[arg(long)]
    font: Option<PathBuf>,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled to ensure
/// only JSON is written to stdout.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    dotenv().ok();

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }
    if !validate_file_extension(&args.input) {
        return Err(anyhow!(
            "Unsupported file format: {} (expected .csv, .xlsx, .xls or .json)",
            args.input
        ));
    }

    let mut config_builder = PipelineConfig::builder();
    if let Some(ref workspace) = args.workspace {
        config_builder = config_builder.workspace_root(workspace);
    }
    if let Some(ref font) = args.font {
        config_builder = config_builder.font_path(font);
    }
    let config = config_builder.build()?;

    let pipeline = build_pipeline(&args, config)?;

    let target = Path::new(&args.output).join(report_file_name(args.output_name.as_deref()));
    let spec = ReportSpec::new(&args.title, target).include_visuals(!args.no_visuals);

    info!("Loading dataset from: {}", args.input);
    let upload = Upload::from_path(&args.input)?;

    info!("{}", "=".repeat(80));
    info!("Starting report pipeline...");
    info!("{}", "=".repeat(80));

    match pipeline.run(&upload, &spec) {
        Ok(result) => handle_pipeline_output(&result, &args),
        Err(e) => {
            error!("Pipeline failed: [{}] {}", e.error_code(), e);
            Err(anyhow!("Pipeline failed: {}", e))
        }
    }
}

fn build_pipeline(args: &Args, config: PipelineConfig) -> Result<Pipeline> {
    let mut builder = Pipeline::builder().config(config);

    if !args.quiet && !args.json {
        builder = builder.on_progress(|update| {
            info!(
                "[{:.0}%] {}: {}",
                update.progress * 100.0,
                update.stage.display_name(),
                update.message
            );
        });
    }

    Ok(builder.build()?)
}

/// File name for the report; `.pdf` is appended to custom names lacking it.
fn report_file_name(output_name: Option<&str>) -> String {
    match output_name {
        Some(name) if name.to_ascii_lowercase().ends_with(".pdf") => name.to_string(),
        Some(name) => format!("{name}.pdf"),
        None => timestamp_filename("InsightFlow_Report", "pdf"),
    }
}

/// Print the result as JSON (`--json`) or as a human-readable summary.
fn handle_pipeline_output(result: &PipelineResult, args: &Args) -> Result<()> {
    if args.json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    print_human_readable_summary(result, args);
    Ok(())
}

fn print_human_readable_summary(result: &PipelineResult, args: &Args) {
    let stats = &result.stats;

    println!();
    println!("{}", "=".repeat(80));
    println!("REPORT COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        args.input,
        format_thousands(stats.total_records),
        stats.columns.len()
    );
    println!(
        "Output: {} ({} pages, {} bytes)",
        result.report.path.display(),
        result.report.page_count,
        format_thousands(result.report.bytes_written)
    );
    println!();

    println!("Summary:");
    println!("  Duration: {}ms", result.duration_ms);
    println!("  Missing data points: {}", format_thousands(stats.total_missing()));
    println!("  Numeric columns: {}", stats.numeric_column_count());
    if result.charts.is_empty() {
        println!("  Charts: none");
    } else {
        let names: Vec<&str> = result.charts.iter().map(|c| c.display_name()).collect();
        println!("  Charts: {}", names.join(", "));
    }
    println!();

    if !stats.numeric_stats.is_empty() {
        println!("Numeric Columns:");
        println!(
            "  {:<20} {:>8} {:>12} {:>12} {:>12} {:>12}",
            "Column", "Count", "Mean", "Std", "Min", "Max"
        );
        println!("  {}", "-".repeat(78));
        for (name, summary) in &stats.numeric_stats {
            println!(
                "  {:<20} {:>8} {:>12} {:>12} {:>12} {:>12}",
                truncate_str(name, 19),
                summary.count,
                fmt_stat(summary.mean),
                fmt_stat(summary.std),
                fmt_stat(summary.min),
                fmt_stat(summary.max)
            );
        }
        println!();
    }

    println!("{}", "=".repeat(80));
}

fn fmt_stat(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.3}"))
}

/// Truncate a string to a maximum display length.
fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{kept}...")
    }
}
