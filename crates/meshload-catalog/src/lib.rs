//! Warehouse access for the snapshot and history tables
//!
//! The pipeline only needs four table operations: delete, create, existence
//! check and streaming row insert. [`WarehouseAdapter`] names them;
//! [`BigQueryAdapter`] talks to Google BigQuery and [`MockAdapter`] keeps
//! tables in memory for tests and dry runs.
//!
//! ## Features
//!
//! - `bigquery` - Google BigQuery support
//!
//! ## Example
//!
//! ```rust,ignore
//! use meshload_catalog::{BigQueryAdapter, WarehouseAdapter, TableIdentifier};
//!
//! let adapter = BigQueryAdapter::with_adc("my-project").await?;
//! let table = TableIdentifier::new("my-project", "data_mesh_contracts", "metadata_history");
//! let exists = adapter.table_exists(&table).await?;
//! ```

pub mod adapter;
pub mod bigquery;
pub mod mock;

pub use adapter::{WarehouseAdapter, TableIdentifier, WarehouseError, InsertRow, RowError};
pub use bigquery::BigQueryAdapter;
pub use mock::{MockAdapter, MockAdapterBuilder, Operation};
