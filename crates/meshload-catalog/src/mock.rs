//! Mock warehouse adapter for testing
//!
//! Tables live in memory. It's useful for:
//! - Unit testing the table lifecycle and loader
//! - End-to-end pipeline tests without credentials
//! - Simulating warehouse failures and metadata lag
//!
//! ## Usage
//!
//! ```rust,ignore
//! use meshload_catalog::{MockAdapter, WarehouseAdapter, TableIdentifier, InsertRow};
//!
//! let adapter = MockAdapter::new();
//! let table = TableIdentifier::new("project", "dataset", "metadata_history");
//! adapter.add_table(table.clone(), schema).await;
//!
//! adapter.insert_rows(&table, &[InsertRow::new(row)]).await?;
//! assert_eq!(adapter.row_count(&table).await, 1);
//! ```
//!
//! ## Simulating Failures
//!
//! ```rust,ignore
//! // Newly created tables stay invisible for two existence checks
//! let adapter = MockAdapter::new().with_visibility_lag(2);
//!
//! // Fail one operation on one table
//! adapter.fail_on(Operation::Delete, &table, WarehouseError::PermissionDenied("no".into())).await;
//! ```

use crate::adapter::{InsertRow, RowError, TableIdentifier, WarehouseAdapter, WarehouseError};
use meshload_core::TableSchema;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Adapter operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Delete,
    Create,
    Exists,
    Insert,
}

/// In-memory table
#[derive(Debug, Clone, Default)]
struct MockTable {
    /// Rows are checked against the schema when one is set
    schema: Option<TableSchema>,

    rows: Vec<Value>,

    /// Insert ids already accepted
    insert_ids: HashSet<String>,

    /// Existence checks that still report `false`
    hidden_checks: u32,
}

/// Mock warehouse adapter for testing
///
/// Clones share state, so a test can keep a handle while the pipeline owns
/// another.
pub struct MockAdapter {
    /// Tables by FQN
    tables: Arc<RwLock<HashMap<String, MockTable>>>,

    /// Errors to return for an operation on a table FQN
    errors: Arc<RwLock<HashMap<(Operation, String), WarehouseError>>>,

    /// Existence checks issued, by table FQN
    exists_checks: Arc<RwLock<HashMap<String, u32>>>,

    /// Existence checks a new table stays invisible for
    visibility_lag: u32,

    /// Simulate call latency (milliseconds)
    latency_ms: u64,

    /// Name to return from name() method
    adapter_name: &'static str,
}

impl MockAdapter {
    /// Create a new mock adapter with no tables
    pub fn new() -> Self {
        MockAdapterBuilder::new().build()
    }

    /// Add (or replace) an empty table
    pub async fn add_table(&self, table: TableIdentifier, schema: TableSchema) {
        self.tables.write().await.insert(
            table.fqn(),
            MockTable {
                schema: Some(schema),
                ..MockTable::default()
            },
        );
    }

    /// Add a table that accepts any row
    pub async fn add_schemaless_table(&self, table: TableIdentifier) {
        self.tables.write().await.insert(table.fqn(), MockTable::default());
    }

    /// Make one operation on one table fail until cleared
    pub async fn fail_on(&self, operation: Operation, table: &TableIdentifier, error: WarehouseError) {
        self.errors.write().await.insert((operation, table.fqn()), error);
    }

    /// Clear all configured errors
    pub async fn clear_errors(&self) {
        self.errors.write().await.clear();
    }

    /// Newly created tables report absent for `checks` existence checks
    pub fn with_visibility_lag(mut self, checks: u32) -> Self {
        self.visibility_lag = checks;
        self
    }

    /// Check if a table exists, ignoring visibility lag
    pub async fn has_table(&self, table: &TableIdentifier) -> bool {
        self.tables.read().await.contains_key(&table.fqn())
    }

    /// Rows stored in a table, in insertion order
    pub async fn rows(&self, table: &TableIdentifier) -> Vec<Value> {
        self.tables
            .read()
            .await
            .get(&table.fqn())
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    pub async fn row_count(&self, table: &TableIdentifier) -> usize {
        self.tables
            .read()
            .await
            .get(&table.fqn())
            .map_or(0, |t| t.rows.len())
    }

    /// Schema a table was created with
    pub async fn schema(&self, table: &TableIdentifier) -> Option<TableSchema> {
        self.tables
            .read()
            .await
            .get(&table.fqn())
            .and_then(|t| t.schema.clone())
    }

    /// Get all table FQNs
    pub async fn get_table_names(&self) -> Vec<String> {
        self.tables.read().await.keys().cloned().collect()
    }

    /// Number of existence checks issued for a table
    pub async fn exists_checks(&self, table: &TableIdentifier) -> u32 {
        self.exists_checks
            .read()
            .await
            .get(&table.fqn())
            .copied()
            .unwrap_or(0)
    }

    /// Simulate latency if configured
    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(std::time::Duration::from_millis(self.latency_ms)).await;
        }
    }

    async fn configured_error(&self, operation: Operation, table: &TableIdentifier) -> Result<(), WarehouseError> {
        match self.errors.read().await.get(&(operation, table.fqn())) {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

impl Default for MockAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MockAdapter {
    fn clone(&self) -> Self {
        Self {
            tables: Arc::clone(&self.tables),
            errors: Arc::clone(&self.errors),
            exists_checks: Arc::clone(&self.exists_checks),
            visibility_lag: self.visibility_lag,
            latency_ms: self.latency_ms,
            adapter_name: self.adapter_name,
        }
    }
}

#[async_trait::async_trait]
impl WarehouseAdapter for MockAdapter {
    fn name(&self) -> &'static str {
        self.adapter_name
    }

    async fn delete_table(&self, table: &TableIdentifier) -> Result<(), WarehouseError> {
        self.simulate_latency().await;
        self.configured_error(Operation::Delete, table).await?;

        self.tables
            .write()
            .await
            .remove(&table.fqn())
            .map(|_| ())
            .ok_or_else(|| WarehouseError::TableNotFound(table.fqn()))
    }

    async fn create_table(&self, table: &TableIdentifier, schema: &TableSchema) -> Result<(), WarehouseError> {
        self.simulate_latency().await;
        self.configured_error(Operation::Create, table).await?;

        let mut tables = self.tables.write().await;
        if tables.contains_key(&table.fqn()) {
            return Err(WarehouseError::AlreadyExists(table.fqn()));
        }

        tables.insert(
            table.fqn(),
            MockTable {
                schema: Some(schema.clone()),
                hidden_checks: self.visibility_lag,
                ..MockTable::default()
            },
        );
        Ok(())
    }

    async fn table_exists(&self, table: &TableIdentifier) -> Result<bool, WarehouseError> {
        self.simulate_latency().await;
        *self.exists_checks.write().await.entry(table.fqn()).or_insert(0) += 1;
        self.configured_error(Operation::Exists, table).await?;

        let mut tables = self.tables.write().await;
        match tables.get_mut(&table.fqn()) {
            Some(entry) if entry.hidden_checks > 0 => {
                entry.hidden_checks -= 1;
                Ok(false)
            }
            Some(_) => Ok(true),
            None => Ok(false),
        }
    }

    async fn insert_rows(
        &self,
        table: &TableIdentifier,
        rows: &[InsertRow],
    ) -> Result<Vec<RowError>, WarehouseError> {
        self.simulate_latency().await;
        self.configured_error(Operation::Insert, table).await?;

        let mut tables = self.tables.write().await;
        let entry = tables
            .get_mut(&table.fqn())
            .ok_or_else(|| WarehouseError::TableNotFound(table.fqn()))?;

        let mut row_errors = Vec::new();
        for (index, row) in rows.iter().enumerate() {
            let reasons = match (&row.json, &entry.schema) {
                (Value::Object(object), Some(schema)) => schema.check_row(object),
                (Value::Object(_), None) => Vec::new(),
                _ => vec!["row is not a JSON object".to_string()],
            };
            if !reasons.is_empty() {
                row_errors.push(RowError { index, reasons });
            }
        }

        // One bad row rejects the whole request
        if !row_errors.is_empty() {
            return Ok(row_errors);
        }

        for row in rows {
            if let Some(id) = &row.insert_id {
                if !entry.insert_ids.insert(id.clone()) {
                    continue;
                }
            }
            entry.rows.push(row.json.clone());
        }

        Ok(Vec::new())
    }
}

/// Builder for creating MockAdapter with predefined tables
///
/// # Example
///
/// ```rust,ignore
/// let adapter = MockAdapterBuilder::new()
///     .with_table(TableIdentifier::new("p", "d", "metadata_history"), schema)
///     .with_visibility_lag(1)
///     .build();
/// ```
pub struct MockAdapterBuilder {
    tables: HashMap<String, MockTable>,
    errors: HashMap<(Operation, String), WarehouseError>,
    visibility_lag: u32,
    latency_ms: u64,
    adapter_name: &'static str,
}

impl MockAdapterBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
            errors: HashMap::new(),
            visibility_lag: 0,
            latency_ms: 0,
            adapter_name: "Mock",
        }
    }

    /// Add a table with a schema
    pub fn with_table(mut self, table: TableIdentifier, schema: TableSchema) -> Self {
        self.tables.insert(
            table.fqn(),
            MockTable {
                schema: Some(schema),
                ..MockTable::default()
            },
        );
        self
    }

    /// Add an error for an operation on a table
    pub fn with_error(mut self, operation: Operation, table: &TableIdentifier, error: WarehouseError) -> Self {
        self.errors.insert((operation, table.fqn()), error);
        self
    }

    pub fn with_visibility_lag(mut self, checks: u32) -> Self {
        self.visibility_lag = checks;
        self
    }

    /// Configure latency
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set adapter name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.adapter_name = name;
        self
    }

    /// Build the MockAdapter
    pub fn build(self) -> MockAdapter {
        MockAdapter {
            tables: Arc::new(RwLock::new(self.tables)),
            errors: Arc::new(RwLock::new(self.errors)),
            exists_checks: Arc::new(RwLock::new(HashMap::new())),
            visibility_lag: self.visibility_lag,
            latency_ms: self.latency_ms,
            adapter_name: self.adapter_name,
        }
    }
}

impl Default for MockAdapterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshload_core::{FieldDefinition, FieldMode};
    use serde_json::json;

    fn schema() -> TableSchema {
        TableSchema::from_fields(vec![
            FieldDefinition::new("id", "STRING").with_mode(FieldMode::Required),
            FieldDefinition::new("tags", "STRING").with_mode(FieldMode::Repeated),
        ])
    }

    fn table() -> TableIdentifier {
        TableIdentifier::new("project", "dataset", "history")
    }

    #[tokio::test]
    async fn test_mock_adapter_create_and_insert() {
        let adapter = MockAdapter::new();
        adapter.create_table(&table(), &schema()).await.unwrap();

        assert!(adapter.table_exists(&table()).await.unwrap());

        let errors = adapter
            .insert_rows(&table(), &[InsertRow::new(json!({"id": "a", "tags": ["x"]}))])
            .await
            .unwrap();
        assert!(errors.is_empty());
        assert_eq!(adapter.row_count(&table()).await, 1);
    }

    #[tokio::test]
    async fn test_mock_adapter_create_existing_fails() {
        let adapter = MockAdapter::new();
        adapter.add_table(table(), schema()).await;

        let result = adapter.create_table(&table(), &schema()).await;
        assert!(matches!(result, Err(WarehouseError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn test_mock_adapter_delete_missing() {
        let adapter = MockAdapter::new();
        let result = adapter.delete_table(&table()).await;
        assert!(matches!(result, Err(WarehouseError::TableNotFound(_))));
    }

    #[tokio::test]
    async fn test_mock_adapter_visibility_lag() {
        let adapter = MockAdapter::new().with_visibility_lag(2);
        adapter.create_table(&table(), &schema()).await.unwrap();

        assert!(!adapter.table_exists(&table()).await.unwrap());
        assert!(!adapter.table_exists(&table()).await.unwrap());
        assert!(adapter.table_exists(&table()).await.unwrap());
        assert_eq!(adapter.exists_checks(&table()).await, 3);
    }

    #[tokio::test]
    async fn test_mock_adapter_bad_row_rejects_request() {
        let adapter = MockAdapter::new();
        adapter.add_table(table(), schema()).await;

        let errors = adapter
            .insert_rows(
                &table(),
                &[
                    InsertRow::new(json!({"id": "a"})),
                    InsertRow::new(json!({"tags": ["x"]})),
                    InsertRow::new(json!("not an object")),
                ],
            )
            .await
            .unwrap();

        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].index, 1);
        assert_eq!(errors[0].reasons, vec!["missing required field: id".to_string()]);
        assert_eq!(errors[1].index, 2);
        assert_eq!(adapter.row_count(&table()).await, 0);
    }

    #[tokio::test]
    async fn test_mock_adapter_insert_id_dedup() {
        let adapter = MockAdapter::new();
        adapter.add_schemaless_table(table()).await;

        let row = InsertRow::new(json!({"id": "a"})).with_insert_id("row-a");
        adapter.insert_rows(&table(), &[row.clone()]).await.unwrap();
        adapter.insert_rows(&table(), &[row, InsertRow::new(json!({"id": "b"}))]).await.unwrap();

        assert_eq!(adapter.rows(&table()).await, vec![json!({"id": "a"}), json!({"id": "b"})]);
    }

    #[tokio::test]
    async fn test_mock_adapter_configured_error() {
        let adapter = MockAdapter::new();
        adapter.add_table(table(), schema()).await;
        adapter
            .fail_on(
                Operation::Delete,
                &table(),
                WarehouseError::PermissionDenied("Access denied".to_string()),
            )
            .await;

        let result = adapter.delete_table(&table()).await;
        assert!(matches!(result, Err(WarehouseError::PermissionDenied(_))));
        assert!(adapter.has_table(&table()).await);

        adapter.clear_errors().await;
        adapter.delete_table(&table()).await.unwrap();
        assert!(!adapter.has_table(&table()).await);
    }

    #[tokio::test]
    async fn test_mock_adapter_builder() {
        let adapter = MockAdapterBuilder::new()
            .with_table(table(), schema())
            .with_error(Operation::Insert, &table(), WarehouseError::NetworkError("reset".into()))
            .with_name("TestBigQuery")
            .with_latency(1)
            .build();

        assert_eq!(adapter.name(), "TestBigQuery");
        assert_eq!(adapter.schema(&table()).await, Some(schema()));
        assert_eq!(adapter.get_table_names().await, vec![table().fqn()]);

        let result = adapter.insert_rows(&table(), &[]).await;
        assert!(matches!(result, Err(WarehouseError::NetworkError(_))));
    }

    #[tokio::test]
    async fn test_mock_adapter_clone_shares_tables() {
        let adapter = MockAdapter::new();
        let cloned = adapter.clone();

        cloned.add_table(table(), schema()).await;
        assert!(adapter.has_table(&table()).await);
    }
}
