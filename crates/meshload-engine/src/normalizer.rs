//! Record normalization
//!
//! Every contract of a product yields exactly one snapshot row and one
//! history row. Both rows of a pair carry the same `date` and the same
//! captured instant.

use meshload_core::{FlatContractRecord, FlatProductRecord, HistoryRow, MetadataRecord, RunClock, SnapshotRow};
use serde_json::{json, Value};

/// Build the snapshot and history rows for one product/contract pair
pub fn build_rows(
    product: &FlatProductRecord,
    contract: &FlatContractRecord,
    clock: &RunClock,
) -> (SnapshotRow, HistoryRow) {
    let merged = MetadataRecord::merge(product, contract);
    let stamp = clock.stamp();
    (merged.snapshot_row(&stamp), merged.history_row(&stamp))
}

/// All rows of a run, in discovery order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowBatches {
    pub snapshot: Vec<SnapshotRow>,
    pub history: Vec<HistoryRow>,
}

impl RowBatches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the rows for every contract of one product
    pub fn add_product(
        &mut self,
        product: &FlatProductRecord,
        contracts: &[FlatContractRecord],
        clock: &RunClock,
    ) {
        for contract in contracts {
            let (snapshot, history) = build_rows(product, contract, clock);
            self.snapshot.push(snapshot);
            self.history.push(history);
        }
    }

    /// Number of contracts (rows per table)
    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }

    /// `{"snapshot": [...], "history": [...]}` with rows as they would be inserted
    pub fn to_json(&self) -> Value {
        json!({
            "snapshot": self.snapshot.iter().map(SnapshotRow::to_json).collect::<Vec<_>>(),
            "history": self.history.iter().map(HistoryRow::to_json).collect::<Vec<_>>(),
        })
    }
}
