//! CLI entry point for the panel cleaning pipeline.

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use lex_panel::frame::count_zero_blanks;
use lex_panel::{
    CleaningConfig, CleaningReport, CleaningResult, MissingValuePolicy, Pipeline,
    ReportGenerator, StatusConflictPolicy, ZeroPolicy, load_csv,
};
use polars::prelude::DataFrame;
use std::path::{Path, PathBuf};
use tracing::{error, info};

/// CLI-compatible status conflict policy enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliStatusConflict {
    /// Fill with "Developing" when a country's rows disagree
    PreferDeveloping,
    /// Leave blank statuses of conflicting countries unfilled
    LeaveBlank,
    /// Stop with an error on the first conflicting country
    Fail,
}

impl From<CliStatusConflict> for StatusConflictPolicy {
    fn from(cli: CliStatusConflict) -> Self {
        match cli {
            CliStatusConflict::PreferDeveloping => StatusConflictPolicy::PreferDeveloping,
            CliStatusConflict::LeaveBlank => StatusConflictPolicy::LeaveBlank,
            CliStatusConflict::Fail => StatusConflictPolicy::Fail,
        }
    }
}

/// Numeric measures whose zero handling can be changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum CliMeasure {
    LifeExpectancy,
    AdultMortality,
    Gdp,
    Bmi,
}

#[derive(Parser, Debug)]
#[command(
    author = "Lex Machina Team",
    version,
    about = "Country-year panel deduplication and imputation",
    long_about = "Cleans a life expectancy panel: one row per (country, year), blank \
                  statuses filled from the country's other years, blank life expectancy \
                  interpolated from adjacent years.\n\n\
                  EXAMPLES:\n  \
                  # Basic usage\n  \
                  lex-panel -i data.csv\n\n  \
                  # WHO export headers\n  \
                  lex-panel -i who.csv --country-column Country --life-expectancy-column 'Life expectancy '\n\n  \
                  # Dry run to preview actions\n  \
                  lex-panel -i data.csv --dry-run"
)]
struct Args {
    /// Path to the CSV file to clean
    #[arg(short, long)]
    input: String,

    /// Output directory for results
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Custom output file name (without extension)
    ///
    /// If not specified, uses "cleaned_panel"
    #[arg(long)]
    output_name: Option<String>,

    /// How to resolve countries whose rows disagree on status
    #[arg(long, value_enum, default_value = "prefer-developing")]
    status_conflict: CliStatusConflict,

    /// Treat zero as a real value in this measure (repeatable)
    ///
    /// By default a zero in any numeric measure means "not recorded"
    #[arg(long, value_enum)]
    zero_is_value: Vec<CliMeasure>,

    /// Decimal places kept on interpolated life expectancy
    #[arg(long, default_value = "1")]
    decimals: u32,

    /// Disable status imputation
    #[arg(long)]
    no_status_fill: bool,

    /// Disable life expectancy interpolation
    #[arg(long)]
    no_interpolation: bool,

    /// Header of the country column
    #[arg(long)]
    country_column: Option<String>,

    /// Header of the year column
    #[arg(long)]
    year_column: Option<String>,

    /// Header of the status column
    #[arg(long)]
    status_column: Option<String>,

    /// Header of the life expectancy column
    #[arg(long)]
    life_expectancy_column: Option<String>,

    /// Preview what the pipeline will do without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Output JSON to stdout instead of human-readable summary
    ///
    /// Disables all progress logs; only outputs the final JSON report.
    #[arg(long)]
    json: bool,

    /// Write a detailed JSON report to the output directory
    ///
    /// The report will be saved as <input_name>_report.json
    #[arg(short = 'r', long)]
    emit_report: bool,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
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

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    info!("Loading dataset from: {}", args.input);
    let data = load_csv(&args.input)?;
    info!("Dataset loaded successfully: {:?}", data.shape());

    let config = build_config(&args)?;

    if args.dry_run {
        return run_dry_run(&args, config, data);
    }

    let pipeline = build_pipeline(&args, config)?;
    run_pipeline(pipeline, &args, data)
}

/// Build the cleaning configuration from CLI flags.
///
/// Report output is handled here through `--emit-report`, so the pipeline's
/// own report writing is disabled.
fn build_config(args: &Args) -> Result<CleaningConfig> {
    let zero_policy = |measure: CliMeasure| {
        if args.zero_is_value.contains(&measure) {
            ZeroPolicy::Value
        } else {
            ZeroPolicy::Missing
        }
    };
    let missing_values = MissingValuePolicy {
        life_expectancy: zero_policy(CliMeasure::LifeExpectancy),
        adult_mortality: zero_policy(CliMeasure::AdultMortality),
        gdp: zero_policy(CliMeasure::Gdp),
        bmi: zero_policy(CliMeasure::Bmi),
    };

    let mut builder = CleaningConfig::builder()
        .output_dir(&args.output)
        .status_conflict_policy(args.status_conflict.into())
        .missing_values(missing_values)
        .interpolation_decimals(args.decimals)
        .fill_status(!args.no_status_fill)
        .interpolate_life_expectancy(!args.no_interpolation)
        .generate_reports(false)
        .save_to_disk(!args.dry_run);

    if let Some(ref name) = args.output_name {
        builder = builder.output_name(name);
    }
    if let Some(ref name) = args.country_column {
        builder = builder.country_column(name);
    }
    if let Some(ref name) = args.year_column {
        builder = builder.year_column(name);
    }
    if let Some(ref name) = args.status_column {
        builder = builder.status_column(name);
    }
    if let Some(ref name) = args.life_expectancy_column {
        builder = builder.life_expectancy_column(name);
    }

    Ok(builder.build()?)
}

fn build_pipeline(args: &Args, config: CleaningConfig) -> Result<Pipeline> {
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

/// Run dry-run mode - clean in memory and show what would happen
///
/// Note: This function uses `println!` intentionally for user-facing CLI output.
fn run_dry_run(args: &Args, config: CleaningConfig, data: DataFrame) -> Result<()> {
    let zero_blanks = count_zero_blanks(&data, &config)?;
    let original_shape = data.shape();
    let pipeline = build_pipeline(args, config)?;
    let result = pipeline.process(data)?;
    let summary = &result.summary;

    if args.json {
        let report = build_report(args, &result, original_shape, pipeline.config());
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("\n{}", "=".repeat(80));
    println!("DRY RUN - Preview of cleaning actions");
    println!("{}\n", "=".repeat(80));

    println!("DATASET OVERVIEW");
    println!("{}", "-".repeat(40));
    println!("  File: {}", args.input);
    println!("  Rows: {}", original_shape.0);
    println!("  Columns: {}", original_shape.1);
    println!("  Countries: {}", summary.missing_before.countries);
    println!();

    println!("BLANK VALUES");
    println!("{}", "-".repeat(40));
    println!("{:<20} {:>10} {:>10}", "Field", "Before", "After");
    println!("{}", "-".repeat(42));
    let rows = [
        ("status", summary.missing_before.blank_status, summary.missing_after.blank_status),
        (
            "life_expectancy",
            summary.missing_before.blank_life_expectancy,
            summary.missing_after.blank_life_expectancy,
        ),
        (
            "adult_mortality",
            summary.missing_before.blank_adult_mortality,
            summary.missing_after.blank_adult_mortality,
        ),
        ("gdp", summary.missing_before.blank_gdp, summary.missing_after.blank_gdp),
        ("bmi", summary.missing_before.blank_bmi, summary.missing_after.blank_bmi),
    ];
    for (field, before, after) in rows {
        println!("{:<20} {:>10} {:>10}", field, before, after);
    }
    println!(
        "  Completeness: {:.1}% -> {:.1}% ({:+.1} points)",
        summary.missing_before.completeness * 100.0,
        summary.missing_after.completeness * 100.0,
        summary.completeness_improvement()
    );
    let mut zero_columns: Vec<_> = zero_blanks.iter().filter(|(_, n)| **n > 0).collect();
    zero_columns.sort();
    for (column, count) in zero_columns {
        println!("  ({} zeros in '{}' count as blank)", count, column);
    }
    println!();

    println!("PROPOSED ACTIONS");
    println!("{}", "-".repeat(40));
    println!("  1. Remove {} duplicate records", summary.duplicates_removed());
    for removed in summary.removed_records.iter().take(10) {
        println!(
            "     - row {} ({}), duplicate of row {}",
            removed.row_id, removed.key, removed.kept_row_id
        );
    }
    if summary.removed_records.len() > 10 {
        println!("     ... and {} more", summary.removed_records.len() - 10);
    }
    if args.no_status_fill {
        println!("  2. Status imputation disabled");
    } else {
        println!("  2. Fill {} blank statuses", summary.statuses_filled);
    }
    for conflict in &summary.status_conflicts {
        let statuses: Vec<&str> = conflict.statuses.iter().map(|s| s.as_str()).collect();
        println!(
            "     ! '{}' has conflicting statuses: {}",
            conflict.country,
            statuses.join(", ")
        );
    }
    if args.no_interpolation {
        println!("  3. Life expectancy interpolation disabled");
    } else {
        println!(
            "  3. Interpolate {} blank life expectancy values",
            summary.life_expectancy_interpolated
        );
    }
    println!();

    println!("OUTPUT FILES (will be created)");
    println!("{}", "-".repeat(40));
    println!(
        "  - {}",
        ReportGenerator::from_config(pipeline.config()).dataset_path().display()
    );
    if args.emit_report {
        println!("  - {}/{}_report.json", args.output, extract_file_stem(&args.input));
    }
    println!();

    println!("{}", "=".repeat(80));
    println!("To execute this cleaning, run without --dry-run");
    if !args.emit_report {
        println!("Add --emit-report to save a detailed JSON report");
    }
    println!("{}", "=".repeat(80));

    Ok(())
}

/// Run pipeline and print results
fn run_pipeline(pipeline: Pipeline, args: &Args, data: DataFrame) -> Result<()> {
    info!("{}", "=".repeat(80));
    info!("Starting panel cleaning pipeline...");
    info!("{}", "=".repeat(80));

    let original_shape = data.shape();

    match pipeline.process(data) {
        Ok(result) => handle_pipeline_output(&pipeline, &result, original_shape, args),
        Err(e) => {
            error!("Pipeline failed: {}", e);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&e)?);
            }
            Err(anyhow!("Pipeline failed: {}", e))
        }
    }
}

fn build_report(
    args: &Args,
    result: &CleaningResult,
    original_shape: (usize, usize),
    config: &CleaningConfig,
) -> CleaningReport {
    ReportGenerator::build_report(
        Some(&args.input),
        result.output_path.as_deref(),
        original_shape,
        result.data.shape(),
        &result.summary,
        config,
    )
}

/// Handle pipeline output based on CLI flags.
///
/// Output behavior:
/// - Default: Print human-readable summary to stdout
/// - `--json`: Print JSON to stdout only (no logs)
/// - `--emit-report`: Write JSON report to file
fn handle_pipeline_output(
    pipeline: &Pipeline,
    result: &CleaningResult,
    original_shape: (usize, usize),
    args: &Args,
) -> Result<()> {
    let report = build_report(args, result, original_shape, pipeline.config());

    if args.emit_report {
        let generator = ReportGenerator::new(PathBuf::from(&args.output), None);
        let report_path = generator.write_report_to_file(&report, &extract_file_stem(&args.input))?;
        info!("Report written to: {}", report_path.display());
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    print_human_readable_summary(&report);
    Ok(())
}

/// Extract the file stem (name without extension) from a path.
fn extract_file_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output")
        .to_string()
}

/// Print a human-readable summary of the cleaning results.
fn print_human_readable_summary(report: &CleaningReport) {
    let summary = &report.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("CLEANING COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        report.input_file.as_deref().unwrap_or("-"),
        report.original_shape.0,
        report.original_shape.1
    );
    if let Some(ref output_file) = report.output_file {
        println!(
            "Output: {} ({} rows x {} columns)",
            output_file, report.final_shape.0, report.final_shape.1
        );
    }
    println!();

    println!("Cleaning Summary:");
    println!("  Duration: {}ms", summary.duration_ms);
    println!(
        "  Rows: {} -> {} ({} duplicates removed)",
        summary.rows_before,
        summary.rows_after,
        summary.duplicates_removed()
    );
    println!("  Statuses filled: {}", summary.statuses_filled);
    println!(
        "  Life expectancy interpolated: {}",
        summary.life_expectancy_interpolated
    );
    println!(
        "  Completeness: {:.1}% -> {:.1}% ({:+.1} points)",
        summary.missing_before.completeness * 100.0,
        summary.missing_after.completeness * 100.0,
        summary.completeness_improvement()
    );
    println!();

    if !summary.actions.is_empty() {
        println!("Actions Taken:");
        for action in summary.actions.iter().take(10) {
            println!("  - [{}] {}", action.action_type.display_name(), action.description);
        }
        if summary.actions.len() > 10 {
            println!("  ... and {} more actions", summary.actions.len() - 10);
        }
        println!();
    }

    if !summary.warnings.is_empty() {
        println!("Warnings:");
        for warning in &summary.warnings {
            println!("  ! {}", warning);
        }
        println!();
    }

    println!("Use --json for machine-readable output");
    println!("Use --emit-report to save detailed JSON report");
    println!("{}", "=".repeat(80));
}
