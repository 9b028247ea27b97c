//! meshload core
//!
//! Domain model shared by every meshload crate: the flattened product and
//! contract records, the rows written to the warehouse, the snapshot schema
//! template, run configuration and the run report.
//! Row field names are part of the warehouse schema - never rename them.

pub mod record;
pub mod clock;
pub mod schema;
pub mod config;
pub mod report;

pub use record::{history_insert_id, FlatProductRecord, FlatContractRecord, MetadataRecord, SnapshotRow, HistoryRow};
pub use clock::{RunClock, RunInstant};
pub use schema::{FieldMode, FieldDefinition, TableSchema, SchemaError};
pub use config::{Config, EnvConfig, PollConfig, WarehouseConfig, ConfigError, construct_dataset_name, construct_table_ids, TableIds};
pub use report::{RunReport, ReportVersion, PipelineStage, StageOutcome};
