//! meshload engine - transform and load
//!
//! This crate implements the run itself:
//! - Normalizing extracted records into snapshot and history rows
//! - Recreating the snapshot table and waiting until it is visible
//! - Appending row batches to the snapshot and history tables
//! - Driving the stages of a run in order

pub mod error;
pub mod normalizer;
pub mod lifecycle;
pub mod loader;
pub mod pipeline;

pub use error::{LoadError, PipelineError};
pub use normalizer::{build_rows, RowBatches};
pub use lifecycle::TableLifecycle;
pub use loader::Loader;
pub use pipeline::{extract_dir, Pipeline, PipelineOptions};
