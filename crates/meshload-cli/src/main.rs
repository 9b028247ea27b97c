use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use meshload_catalog::{BigQueryAdapter, TableIdentifier, WarehouseAdapter};
use meshload_core::{Config, EnvConfig, RunClock, RunReport};
use meshload_engine::{extract_dir, Pipeline, PipelineOptions};

const DEFAULT_CONFIG: &str = "meshload.toml";

/// meshload - load data mesh product metadata into BigQuery
#[derive(Parser)]
#[command(name = "meshload")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: meshload.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding one subdirectory per data product
    #[arg(long, global = true)]
    products_dir: Option<PathBuf>,

    /// Snapshot table schema template
    #[arg(long, global = true)]
    schema: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the snapshot table and append to the history table
    Load {
        /// Write a JSON run report to this file
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Print the rows a load would insert, without touching the warehouse
    Extract {
        /// Write rows to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = load_config(cli.config.as_deref())?;

    // Flag paths are relative to the working directory, not the config file
    let cwd = std::env::current_dir().context("Cannot read working directory")?;
    if let Some(dir) = cli.products_dir {
        config.products_dir = cwd.join(dir);
    }
    if let Some(schema) = cli.schema {
        config.snapshot_schema = cwd.join(schema);
    }

    match cli.command {
        Commands::Load { report } => load_command(&config, report.as_deref()).await,
        Commands::Extract { output } => extract_command(&config, output.as_deref()),
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = if let Some(path) = path {
        Config::from_file(path).with_context(|| format!("Failed to load config {}", path.display()))?
    } else if Path::new(DEFAULT_CONFIG).exists() {
        Config::from_file(Path::new(DEFAULT_CONFIG))
            .with_context(|| format!("Failed to load config {}", DEFAULT_CONFIG))?
    } else {
        tracing::debug!("no config file found, using defaults");
        Config::default()
    };

    Ok(config)
}

/// Load command - full run against BigQuery
async fn load_command(config: &Config, report_path: Option<&Path>) -> Result<()> {
    let env = EnvConfig::from_env().context("Missing required environment")?;
    let options = PipelineOptions::from_config(config, &env);

    let adapter = connect(config, &env).await?;
    let pipeline = Pipeline::new(&*adapter, options);
    check_history_table(&*adapter, &pipeline.history_table()).await?;
    tracing::info!(warehouse = adapter.name(), project = %env.project_name, "connected");

    let mut report = RunReport::new();
    let result = pipeline.run(&mut report).await;

    if let Some(path) = report_path {
        report
            .save_to_file(path)
            .with_context(|| format!("Failed to write report {}", path.display()))?;
        tracing::info!(path = %path.display(), "report written");
    }

    result.with_context(|| format!("Run {} failed", report.run_id))?;
    print_summary(&pipeline, &report);
    Ok(())
}

async fn connect(config: &Config, env: &EnvConfig) -> Result<Box<dyn WarehouseAdapter>> {
    let adapter = match &config.warehouse.credentials {
        Some(key_file) => {
            let key_file = config.resolve(key_file);
            tracing::debug!(path = %key_file.display(), "using service account key");
            BigQueryAdapter::from_service_account_file(&env.project_name, &key_file).await
        }
        None => {
            tracing::debug!("using application default credentials");
            BigQueryAdapter::with_adc(&env.project_name).await
        }
    }
    .context("Failed to create BigQuery client")?;

    Ok(Box::new(adapter))
}

/// Fail before any write when the history table is unreachable
///
/// Only needs table metadata access, the same permission the load itself uses.
async fn check_history_table(adapter: &dyn WarehouseAdapter, table: &TableIdentifier) -> Result<()> {
    let exists = adapter
        .table_exists(table)
        .await
        .with_context(|| format!("Failed to reach {} on {}", table, adapter.name()))?;

    if !exists {
        anyhow::bail!("History table {} does not exist", table);
    }
    Ok(())
}

/// Extract command - dry run of discovery and normalization
fn extract_command(config: &Config, output: Option<&Path>) -> Result<()> {
    let products_dir = config.products_path();
    let batches = extract_dir(&products_dir, &RunClock::start())
        .with_context(|| format!("Failed to extract {}", products_dir.display()))?;

    let json = serde_json::to_string_pretty(&batches.to_json())?;
    match output {
        Some(path) => {
            std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "{} {} rows per table to {}",
                "Wrote".green(),
                batches.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn print_summary(pipeline: &Pipeline<'_>, report: &RunReport) {
    println!();
    println!("{}", "Metadata load complete".green().bold());
    println!("  {} {}", "Run:".cyan(), report.run_id);
    println!("  {} {}", "Products:".cyan(), report.products);
    println!("  {} {}", "Contracts:".cyan(), report.contracts);
    println!(
        "  {} {} rows -> {}",
        "Snapshot:".cyan(),
        report.snapshot_rows,
        pipeline.snapshot_table()
    );
    println!(
        "  {} {} rows -> {}",
        "History:".cyan(),
        report.history_rows,
        pipeline.history_table()
    );
}
