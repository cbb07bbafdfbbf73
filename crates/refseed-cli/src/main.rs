mod logging;

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use thiserror::Error;

use refseed_core::{DependencyGraph, Error as CoreError, SchemaCatalog, SnapshotCatalog};
use refseed_generate::output::write_bytes_atomic;
use refseed_generate::{
    OutputFormat, SynthesisConfig, SynthesisError, TableSynthesisEngine, write_statements,
};

use logging::init_logging;

#[derive(Debug, Error)]
pub(crate) enum CliError {
    #[error("core error: {0}")]
    Core(#[from] CoreError),
    #[error("{0}")]
    Synthesis(#[from] SynthesisError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("logging error: {0}")]
    Logging(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

#[derive(Parser, Debug)]
#[command(name = "refseed", version, about = "Referential test data for relational schemas")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Synthesize rows for every table and write them as SQL.
    Generate(GenerateArgs),
    /// Print the table processing order.
    Order(OrderArgs),
}

#[derive(Args, Debug)]
struct GenerateArgs {
    /// Catalog snapshot describing tables, columns and foreign keys.
    #[arg(long, value_name = "SCHEMA_JSON")]
    catalog: PathBuf,
    /// TOML run configuration (row counts, overrides, access rules).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Destination SQL file.
    #[arg(long, default_value = "output.sql")]
    out: PathBuf,
    /// Output format: insert or copy.
    #[arg(long)]
    format: Option<String>,
    /// Seed for the random source.
    #[arg(long)]
    seed: Option<u64>,
    /// Prefix insert output with TRUNCATE ... RESTART IDENTITY.
    #[arg(long, default_value_t = false)]
    truncate: bool,
    /// Row count override, repeatable (`--rows author=10`).
    #[arg(long = "rows", value_name = "TABLE=COUNT")]
    rows: Vec<String>,
    /// Write the run report as JSON.
    #[arg(long)]
    report: Option<PathBuf>,
    /// Write JSON logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct OrderArgs {
    /// Catalog snapshot describing tables, columns and foreign keys.
    #[arg(long, value_name = "SCHEMA_JSON")]
    catalog: PathBuf,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => run_generate(args),
        Command::Order(args) => run_order(args),
    }
}

fn run_generate(args: GenerateArgs) -> Result<(), CliError> {
    init_logging(args.log_file.as_deref())?;

    let mut config = match &args.config {
        Some(path) => SynthesisConfig::load(path)?,
        None => SynthesisConfig::default(),
    };
    if let Some(format) = &args.format {
        config.format = Some(format.clone());
    }
    if args.truncate {
        config.truncate = true;
    }
    for entry in &args.rows {
        let (table, count) = parse_row_count(entry)?;
        config.rows.insert(table, count);
    }

    let format = config.output_format()?;
    if config.truncate && format == OutputFormat::Copy {
        tracing::warn!(event = "truncate_ignored", format = %format);
    }
    let seed = args
        .seed
        .or(config.seed)
        .unwrap_or_else(rand::random::<u64>);

    let timer = Instant::now();
    tracing::info!(
        event = "run_started",
        catalog = %args.catalog.display(),
        format = %format,
        seed
    );

    let catalog = SnapshotCatalog::load(&args.catalog)?;
    let mut engine =
        TableSynthesisEngine::new(&catalog, config.build_registry()?, config.options()?)?;
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let dataset = engine.generate_all(&config.rows, &mut rng)?;

    let bytes = write_statements(&args.out, format, &dataset, config.truncate)?;
    tracing::info!(
        event = "statements_written",
        path = %args.out.display(),
        bytes
    );

    if let Some(path) = &args.report {
        write_report(path, &dataset.report)?;
        tracing::info!(event = "report_written", path = %path.display());
    }

    tracing::info!(
        event = "run_finished",
        status = "success",
        rows = dataset.report.rows_generated(),
        duration_ms = timer.elapsed().as_millis() as u64
    );
    Ok(())
}

fn run_order(args: OrderArgs) -> Result<(), CliError> {
    let catalog = SnapshotCatalog::load(&args.catalog)?;
    let graph = DependencyGraph::new(catalog.dependency_edges()?);
    let levels = graph.levels()?;

    for (depth, level) in levels.iter().enumerate() {
        println!("{depth}: {}", level.join(", "));
    }
    Ok(())
}

fn parse_row_count(entry: &str) -> Result<(String, u64), CliError> {
    let (table, count) = entry
        .split_once('=')
        .ok_or_else(|| CliError::InvalidConfig(format!("expected TABLE=COUNT, got '{entry}'")))?;
    let count = count.trim().parse::<u64>().map_err(|_| {
        CliError::InvalidConfig(format!("row count for '{table}' is not a number: '{count}'"))
    })?;
    Ok((table.trim().to_string(), count))
}

fn write_report(path: &Path, report: &refseed_generate::SynthesisReport) -> Result<(), CliError> {
    let data = serde_json::to_vec_pretty(report)?;
    write_bytes_atomic(path, &data)?;
    Ok(())
}
