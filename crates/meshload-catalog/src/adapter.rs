//! Warehouse adapter trait and table identifiers

use meshload_core::{TableIds, TableSchema};
use serde_json::Value;
use std::fmt;

/// Identifies a table in a warehouse
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableIdentifier {
    /// Project id
    pub project: String,

    /// Dataset name
    pub dataset: String,

    /// Table name
    pub table: String,
}

impl TableIdentifier {
    /// Create a new table identifier
    pub fn new(project: impl Into<String>, dataset: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            dataset: dataset.into(),
            table: table.into(),
        }
    }

    /// The snapshot table of a table id set
    pub fn snapshot_of(ids: &TableIds) -> Self {
        Self::new(&ids.project, &ids.dataset, &ids.snapshot_table)
    }

    /// The history table of a table id set
    pub fn history_of(ids: &TableIds) -> Self {
        Self::new(&ids.project, &ids.dataset, &ids.history_table)
    }

    /// Get fully qualified name
    pub fn fqn(&self) -> String {
        format!("{}.{}.{}", self.project, self.dataset, self.table)
    }
}

impl fmt::Display for TableIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn())
    }
}

/// One row of a streaming insert
#[derive(Debug, Clone, PartialEq)]
pub struct InsertRow {
    /// De-duplication id honored by the warehouse on a best-effort basis
    pub insert_id: Option<String>,

    /// JSON object keyed by column name
    pub json: Value,
}

impl InsertRow {
    pub fn new(json: Value) -> Self {
        Self { insert_id: None, json }
    }

    pub fn with_insert_id(mut self, insert_id: impl Into<String>) -> Self {
        self.insert_id = Some(insert_id.into());
        self
    }
}

/// A row the warehouse refused
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// Position of the row in the insert request
    pub index: usize,

    pub reasons: Vec<String>,
}

impl fmt::Display for RowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row {}: {}", self.index, self.reasons.join("; "))
    }
}

/// Errors returned by warehouse calls
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WarehouseError {
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl WarehouseError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::TableNotFound(_))
    }
}

/// Table operations the loader needs from a warehouse
#[async_trait::async_trait]
pub trait WarehouseAdapter: Send + Sync {
    /// Get the adapter name (e.g., "BigQuery", "Mock")
    fn name(&self) -> &'static str;

    /// Delete a table; `TableNotFound` when it does not exist
    async fn delete_table(&self, table: &TableIdentifier) -> Result<(), WarehouseError>;

    /// Create a table with the given columns
    async fn create_table(&self, table: &TableIdentifier, schema: &TableSchema) -> Result<(), WarehouseError>;

    /// Whether the table is visible to metadata reads
    ///
    /// A freshly created table may report `false` for a while.
    async fn table_exists(&self, table: &TableIdentifier) -> Result<bool, WarehouseError>;

    /// Stream rows into a table in one request
    ///
    /// Returns the rows the warehouse refused; an empty list means every row
    /// was accepted.
    async fn insert_rows(
        &self,
        table: &TableIdentifier,
        rows: &[InsertRow],
    ) -> Result<Vec<RowError>, WarehouseError>;
}
