//! Row batch loading

use meshload_catalog::{InsertRow, TableIdentifier, WarehouseAdapter};
use meshload_core::{history_insert_id, HistoryRow, SnapshotRow};

use crate::error::LoadError;

/// Appends row batches with one streaming insert per table
pub struct Loader<'a> {
    adapter: &'a dyn WarehouseAdapter,
}

impl<'a> Loader<'a> {
    pub fn new(adapter: &'a dyn WarehouseAdapter) -> Self {
        Self { adapter }
    }

    /// Append snapshot rows
    pub async fn append_snapshot(&self, table: &TableIdentifier, rows: &[SnapshotRow]) -> Result<usize, LoadError> {
        let rows: Vec<InsertRow> = rows.iter().map(|r| InsertRow::new(r.to_json())).collect();
        self.append(table, &rows).await
    }

    /// Append history rows of run `run_id`, each tagged with its insert id
    pub async fn append_history(
        &self,
        table: &TableIdentifier,
        rows: &[HistoryRow],
        run_id: &str,
    ) -> Result<usize, LoadError> {
        let rows: Vec<InsertRow> = rows
            .iter()
            .enumerate()
            .map(|(index, r)| InsertRow::new(r.to_json()).with_insert_id(history_insert_id(run_id, index)))
            .collect();
        self.append(table, &rows).await
    }

    /// Send `rows` in one request and return how many were sent
    ///
    /// An empty batch makes no warehouse call.
    pub async fn append(&self, table: &TableIdentifier, rows: &[InsertRow]) -> Result<usize, LoadError> {
        if rows.is_empty() {
            tracing::info!(table = %table, "no rows to append");
            return Ok(0);
        }

        let failures = self.adapter.insert_rows(table, rows).await.map_err(|e| {
            tracing::error!(table = %table, error = %e, "error appending data");
            LoadError::Warehouse {
                table: table.fqn(),
                source: e,
            }
        })?;

        if !failures.is_empty() {
            for failure in &failures {
                tracing::error!(table = %table, row = failure.index, reasons = ?failure.reasons, "row rejected");
            }
            return Err(LoadError::Insertion {
                table: table.fqn(),
                failures,
            });
        }

        tracing::info!(table = %table, rows = rows.len(), "rows appended");
        Ok(rows.len())
    }
}
