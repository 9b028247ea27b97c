//! Load and pipeline errors

use meshload_catalog::{RowError, WarehouseError};
use meshload_core::{PipelineStage, SchemaError};
use meshload_docs::DocumentError;

/// Errors raised while resetting or loading warehouse tables
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Failed to reset table {table}: {source}")]
    TableReset {
        table: String,
        #[source]
        source: WarehouseError,
    },

    #[error("Table {table} still not visible after {attempts} existence checks")]
    Timeout { table: String, attempts: u32 },

    #[error("Insertion errors in {table}: {}", format_failures(.failures))]
    Insertion {
        table: String,
        failures: Vec<RowError>,
    },

    #[error("Error appending data to table {table}: {source}")]
    Warehouse {
        table: String,
        #[source]
        source: WarehouseError,
    },

    #[error(transparent)]
    Schema(#[from] SchemaError),
}

fn format_failures(failures: &[RowError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// A run failure and the stage it happened in
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("{stage} failed: {source}")]
    Document {
        stage: PipelineStage,
        #[source]
        source: DocumentError,
    },

    #[error("{stage} failed: {source}")]
    Load {
        stage: PipelineStage,
        #[source]
        source: LoadError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> PipelineStage {
        match self {
            Self::Document { stage, .. } | Self::Load { stage, .. } => *stage,
        }
    }
}
