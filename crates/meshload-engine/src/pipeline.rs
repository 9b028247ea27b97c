//! Run orchestration
//!
//! A run walks a fixed sequence of stages:
//!
//! ```text
//! START -> DISCOVER -> EXTRACT_AND_NORMALIZE -> RESET_SNAPSHOT_TABLE
//!       -> LOAD_SNAPSHOT -> LOAD_HISTORY -> DONE
//! ```
//!
//! The first failing stage moves the run to `FAILED` and nothing after it
//! executes. Every document is extracted before the warehouse is touched, so
//! one bad document leaves both tables as they were.

use std::path::{Path, PathBuf};
use std::time::Instant;

use meshload_catalog::{TableIdentifier, WarehouseAdapter};
use meshload_core::{
    Config, EnvConfig, FlatContractRecord, PipelineStage, PollConfig, RunClock, RunReport, StageOutcome,
    TableIds,
};
use meshload_docs::{discover, extract_contract, extract_product, read_document, DocumentError, ProductEntry};

use crate::error::{LoadError, PipelineError};
use crate::lifecycle::TableLifecycle;
use crate::loader::Loader;
use crate::normalizer::RowBatches;

/// Everything a run needs besides the warehouse client
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Root of the product directories
    pub products_dir: PathBuf,

    /// Snapshot table schema template
    pub snapshot_schema: PathBuf,

    pub tables: TableIds,

    pub poll: PollConfig,
}

impl PipelineOptions {
    /// Options for a configuration in a given environment
    pub fn from_config(config: &Config, env: &EnvConfig) -> Self {
        Self {
            products_dir: config.products_path(),
            snapshot_schema: config.snapshot_schema_path(),
            tables: config.table_ids(env),
            poll: config.poll.clone(),
        }
    }
}

/// Drives one run against a warehouse adapter
pub struct Pipeline<'a> {
    adapter: &'a dyn WarehouseAdapter,
    options: PipelineOptions,
    clock: RunClock,
}

impl<'a> Pipeline<'a> {
    pub fn new(adapter: &'a dyn WarehouseAdapter, options: PipelineOptions) -> Self {
        Self {
            adapter,
            options,
            clock: RunClock::start(),
        }
    }

    /// Use a fixed clock instead of the wall clock
    pub fn with_clock(mut self, clock: RunClock) -> Self {
        self.clock = clock;
        self
    }

    pub fn snapshot_table(&self) -> TableIdentifier {
        TableIdentifier::snapshot_of(&self.options.tables)
    }

    pub fn history_table(&self) -> TableIdentifier {
        TableIdentifier::history_of(&self.options.tables)
    }

    /// Discover and extract every document without touching the warehouse
    pub fn extract(&self) -> Result<RowBatches, PipelineError> {
        extract_dir(&self.options.products_dir, &self.clock)
    }

    /// Execute all stages, recording each one in `report`
    ///
    /// The report is closed as `DONE` or `FAILED` before returning.
    pub async fn run(&self, report: &mut RunReport) -> Result<(), PipelineError> {
        tracing::info!(
            run_id = %report.run_id,
            snapshot = %self.snapshot_table(),
            history = %self.history_table(),
            "starting run"
        );

        let started = Instant::now();
        let entries = finish_stage(
            report,
            PipelineStage::Discover,
            started,
            discover_products(&self.options.products_dir),
        )?;
        report.products = entries.len();

        let started = Instant::now();
        let batches = finish_stage(
            report,
            PipelineStage::ExtractAndNormalize,
            started,
            extract_products(&entries, &self.clock),
        )?;
        report.contracts = batches.len();

        let started = Instant::now();
        let result = self.reset_snapshot().await;
        finish_stage(report, PipelineStage::ResetSnapshotTable, started, result)?;

        let started = Instant::now();
        let result = Loader::new(self.adapter)
            .append_snapshot(&self.snapshot_table(), &batches.snapshot)
            .await
            .map_err(|source| load_failed(PipelineStage::LoadSnapshot, source));
        let rows = finish_stage(report, PipelineStage::LoadSnapshot, started, result)?;
        report.snapshot_rows = rows;

        let started = Instant::now();
        let result = Loader::new(self.adapter)
            .append_history(&self.history_table(), &batches.history, &report.run_id)
            .await
            .map_err(|source| load_failed(PipelineStage::LoadHistory, source));
        let rows = finish_stage(report, PipelineStage::LoadHistory, started, result)?;
        report.history_rows = rows;

        report.finish(PipelineStage::Done);
        tracing::info!(
            run_id = %report.run_id,
            products = report.products,
            contracts = report.contracts,
            "run complete"
        );
        Ok(())
    }

    async fn reset_snapshot(&self) -> Result<(), PipelineError> {
        TableLifecycle::new(self.adapter, self.options.poll.clone())
            .reset_table(&self.snapshot_table(), &self.options.snapshot_schema)
            .await
            .map_err(|source| load_failed(PipelineStage::ResetSnapshotTable, source))
    }
}

/// Discover and extract every document under `products_dir`
pub fn extract_dir(products_dir: &Path, clock: &RunClock) -> Result<RowBatches, PipelineError> {
    let entries = discover_products(products_dir)?;
    extract_products(&entries, clock)
}

fn discover_products(products_dir: &Path) -> Result<Vec<ProductEntry>, PipelineError> {
    discover(products_dir).map_err(|source| PipelineError::Document {
        stage: PipelineStage::Discover,
        source,
    })
}

/// Extract every product and its contracts, in discovery order
fn extract_products(entries: &[ProductEntry], clock: &RunClock) -> Result<RowBatches, PipelineError> {
    let stage = PipelineStage::ExtractAndNormalize;
    let document_failed = |source: DocumentError| PipelineError::Document { stage, source };

    let mut batches = RowBatches::new();
    for entry in entries {
        let product = read_document(&entry.product_file)
            .and_then(|doc| extract_product(&doc))
            .map_err(document_failed)?;

        let contracts = entry
            .contract_files
            .iter()
            .map(|path| read_document(path).and_then(|doc| extract_contract(&doc)))
            .collect::<Result<Vec<FlatContractRecord>, _>>()
            .map_err(document_failed)?;

        tracing::debug!(product = %entry.name, contracts = contracts.len(), "extracted product");
        batches.add_product(&product, &contracts, clock);
    }

    tracing::info!(rows = batches.len(), "normalized records");
    Ok(batches)
}

fn load_failed(stage: PipelineStage, source: LoadError) -> PipelineError {
    PipelineError::Load { stage, source }
}

/// Record a stage outcome; a failure also closes the report as `FAILED`
fn finish_stage<T>(
    report: &mut RunReport,
    stage: PipelineStage,
    started: Instant,
    result: Result<T, PipelineError>,
) -> Result<T, PipelineError> {
    let elapsed_ms = started.elapsed().as_millis() as u64;

    match &result {
        Ok(_) => {
            tracing::debug!(stage = %stage, elapsed_ms, "stage complete");
            report.record_stage(StageOutcome {
                stage,
                succeeded: true,
                elapsed_ms,
                error: None,
            });
            report.state = stage.next();
        }
        Err(e) => {
            tracing::error!(stage = %stage, error = %e, "run aborted");
            report.record_stage(StageOutcome {
                stage,
                succeeded: false,
                elapsed_ms,
                error: Some(e.to_string()),
            });
            report.finish(PipelineStage::Failed);
        }
    }

    result
}
