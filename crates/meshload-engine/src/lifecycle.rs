//! Snapshot table lifecycle
//!
//! A reset deletes the table, creates it again from the schema template and
//! then polls until the warehouse reports it. BigQuery metadata is eventually
//! consistent, so a table can be missing for a while after `create_table`
//! returns.

use std::path::Path;

use meshload_catalog::{TableIdentifier, WarehouseAdapter, WarehouseError};
use meshload_core::{PollConfig, TableSchema};

use crate::error::LoadError;

/// Recreates tables through a warehouse adapter
pub struct TableLifecycle<'a> {
    adapter: &'a dyn WarehouseAdapter,
    poll: PollConfig,
}

impl<'a> TableLifecycle<'a> {
    pub fn new(adapter: &'a dyn WarehouseAdapter, poll: PollConfig) -> Self {
        Self { adapter, poll }
    }

    /// Delete and recreate `table` from the template at `template`, then wait
    /// for it to become visible.
    ///
    /// The template is read before anything is deleted, so a broken template
    /// leaves the current table untouched.
    pub async fn reset_table(&self, table: &TableIdentifier, template: &Path) -> Result<(), LoadError> {
        let schema = TableSchema::from_template_file(template).map_err(|e| {
            tracing::error!(path = %template.display(), error = %e, "cannot load schema template");
            LoadError::Schema(e)
        })?;

        self.recreate(table, &schema).await
    }

    /// Delete and recreate `table` with `schema`, then wait for it
    pub async fn recreate(&self, table: &TableIdentifier, schema: &TableSchema) -> Result<(), LoadError> {
        tracing::info!(table = %table, "resetting table");

        match self.adapter.delete_table(table).await {
            Ok(()) => tracing::debug!(table = %table, "table deleted"),
            Err(e) if e.is_not_found() => {
                tracing::warn!(table = %table, "table did not exist, creating it");
            }
            Err(e) => return Err(reset_failed(table, e)),
        }

        self.adapter
            .create_table(table, schema)
            .await
            .map_err(|e| reset_failed(table, e))?;
        tracing::debug!(table = %table, columns = schema.fields.len(), "table created");

        self.wait_until_visible(table).await
    }

    /// Poll existence at the configured interval, at most `max_attempts` times
    pub async fn wait_until_visible(&self, table: &TableIdentifier) -> Result<(), LoadError> {
        let attempts = self.poll.max_attempts;

        for attempt in 1..=attempts {
            let exists = self
                .adapter
                .table_exists(table)
                .await
                .map_err(|e| reset_failed(table, e))?;

            if exists {
                tracing::info!(table = %table, attempt, "table is visible");
                return Ok(());
            }

            tracing::debug!(table = %table, attempt, max_attempts = attempts, "table not visible yet");
            if attempt < attempts {
                tokio::time::sleep(self.poll.interval()).await;
            }
        }

        tracing::error!(table = %table, attempts, "gave up waiting for table");
        Err(LoadError::Timeout {
            table: table.fqn(),
            attempts,
        })
    }
}

fn reset_failed(table: &TableIdentifier, source: WarehouseError) -> LoadError {
    tracing::error!(table = %table, error = %source, "table reset failed");
    LoadError::TableReset {
        table: table.fqn(),
        source,
    }
}
