//! Flattened records and warehouse rows
//!
//! Field names match the snapshot/history table columns exactly and are
//! part of the warehouse contract.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::clock::RunInstant;

/// Scalar fields extracted from a data product document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatProductRecord {
    pub dp_id: String,

    pub dp_name: String,

    #[serde(rename = "dp_owner_dataDomain")]
    pub dp_owner_data_domain: String,

    pub dp_owner_contact: String,

    /// Empty when the product has no `dataAssetOwner`
    #[serde(rename = "da_owner_dataDomain")]
    pub da_owner_data_domain: String,

    /// Empty when the product has no `dataAssetOwner`
    pub da_owner_contact: String,

    pub dp_maturity: String,
}

impl FlatProductRecord {
    /// Column/value pairs keyed by column name
    pub fn fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("dp_id".into(), Value::String(self.dp_id.clone()));
        map.insert("dp_name".into(), Value::String(self.dp_name.clone()));
        map.insert("dp_owner_dataDomain".into(), Value::String(self.dp_owner_data_domain.clone()));
        map.insert("dp_owner_contact".into(), Value::String(self.dp_owner_contact.clone()));
        map.insert("da_owner_dataDomain".into(), Value::String(self.da_owner_data_domain.clone()));
        map.insert("da_owner_contact".into(), Value::String(self.da_owner_contact.clone()));
        map.insert("dp_maturity".into(), Value::String(self.dp_maturity.clone()));
        map
    }
}

/// Fields extracted from a data contract document
///
/// Port and quality descriptors are stored as JSON text, not as nested
/// values: the warehouse columns are plain strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatContractRecord {
    pub dpc_id: String,

    pub dpc_name: String,

    pub dpc_version: String,

    /// One JSON text per input port, in document order
    pub dpc_input_port: Vec<String>,

    /// JSON text of `output.storage`
    pub dpc_output_port: String,

    /// One JSON text per quality rule, in document order
    pub dpc_quality: Vec<String>,
}

impl FlatContractRecord {
    /// Column/value pairs keyed by column name
    pub fn fields(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("dpc_id".into(), Value::String(self.dpc_id.clone()));
        map.insert("dpc_name".into(), Value::String(self.dpc_name.clone()));
        map.insert("dpc_version".into(), Value::String(self.dpc_version.clone()));
        map.insert("dpc_input_port".into(), strings(&self.dpc_input_port));
        map.insert("dpc_output_port".into(), Value::String(self.dpc_output_port.clone()));
        map.insert("dpc_quality".into(), strings(&self.dpc_quality));
        map
    }
}

fn strings(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}

/// A product record merged with one of its contract records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord {
    fields: Map<String, Value>,
}

impl MetadataRecord {
    /// Merge product and contract fields into one base mapping.
    ///
    /// Product fields are written first and contract fields overlay them,
    /// so on a key collision the contract value wins. The two records use
    /// disjoint prefixes (`dp_`/`da_` and `dpc_`), so no collision occurs
    /// for well-formed records.
    pub fn merge(product: &FlatProductRecord, contract: &FlatContractRecord) -> Self {
        let mut fields = product.fields();
        for (key, value) in contract.fields() {
            fields.insert(key, value);
        }
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Snapshot row stamped with the given instant
    pub fn snapshot_row(&self, stamp: &RunInstant) -> SnapshotRow {
        SnapshotRow {
            base: self.fields.clone(),
            last_updated: stamp.timestamp(),
            date: stamp.date_string(),
        }
    }

    /// History row stamped with the given instant
    pub fn history_row(&self, stamp: &RunInstant) -> HistoryRow {
        HistoryRow {
            base: self.fields.clone(),
            ingested_timestamp: stamp.timestamp(),
            date: stamp.date_string(),
        }
    }
}

/// Row of the snapshot table (latest full scan)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow {
    #[serde(flatten)]
    pub base: Map<String, Value>,

    /// ISO-8601 UTC instant
    pub last_updated: String,

    /// Run date, `YYYY-MM-DD`
    pub date: String,
}

impl SnapshotRow {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.base.get(key)
    }

    /// JSON object handed to the warehouse
    pub fn to_json(&self) -> Value {
        let mut object = self.base.clone();
        object.insert("last_updated".into(), Value::String(self.last_updated.clone()));
        object.insert("date".into(), Value::String(self.date.clone()));
        Value::Object(object)
    }
}

/// Row of the history table (append-only, one per contract per run)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    #[serde(flatten)]
    pub base: Map<String, Value>,

    /// ISO-8601 UTC instant
    pub ingested_timestamp: String,

    /// Run date, `YYYY-MM-DD`
    pub date: String,
}

impl HistoryRow {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.base.get(key)
    }

    /// JSON object handed to the warehouse
    pub fn to_json(&self) -> Value {
        let mut object = self.base.clone();
        object.insert(
            "ingested_timestamp".into(),
            Value::String(self.ingested_timestamp.clone()),
        );
        object.insert("date".into(), Value::String(self.date.clone()));
        Value::Object(object)
    }
}

/// Streaming insert id of the `index`-th history row of run `run_id`
///
/// Unique per run and row, so a resent request inside the warehouse's de-dup
/// window is absorbed while rows of other runs or other contracts never are.
pub fn history_insert_id(run_id: &str, index: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(run_id.as_bytes());
    hasher.update(b"\n");
    hasher.update(index.to_le_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn product() -> FlatProductRecord {
        FlatProductRecord {
            dp_id: "sales".into(),
            dp_name: "Sales".into(),
            dp_owner_data_domain: "commerce".into(),
            dp_owner_contact: "a@x.com".into(),
            da_owner_data_domain: String::new(),
            da_owner_contact: String::new(),
            dp_maturity: "managed".into(),
        }
    }

    fn contract() -> FlatContractRecord {
        FlatContractRecord {
            dpc_id: "c1".into(),
            dpc_name: "Sales Contract".into(),
            dpc_version: "1.0".into(),
            dpc_input_port: vec![r#"{"name": "orders"}"#.into()],
            dpc_output_port: r#"{"table": "sales"}"#.into(),
            dpc_quality: vec![],
        }
    }

    fn stamp() -> RunInstant {
        RunInstant {
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            at: Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap(),
        }
    }

    #[test]
    fn product_fields_use_column_names() {
        let fields = product().fields();
        assert_eq!(fields.len(), 7);
        assert_eq!(fields["dp_owner_dataDomain"], Value::from("commerce"));
        assert_eq!(fields["da_owner_contact"], Value::from(""));
    }

    #[test]
    fn product_serde_matches_fields() {
        let record = product();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json, Value::Object(record.fields()));
    }

    #[test]
    fn merge_contains_both_records() {
        let merged = MetadataRecord::merge(&product(), &contract());
        assert_eq!(merged.fields().len(), 13);
        assert_eq!(merged.get("dp_id"), Some(&Value::from("sales")));
        assert_eq!(merged.get("dpc_id"), Some(&Value::from("c1")));
        assert_eq!(merged.get("dpc_quality"), Some(&Value::Array(vec![])));
    }

    #[test]
    fn rows_share_stamp() {
        let merged = MetadataRecord::merge(&product(), &contract());
        let stamp = stamp();
        let snapshot = merged.snapshot_row(&stamp);
        let history = merged.history_row(&stamp);

        assert_eq!(snapshot.date, "2024-03-01");
        assert_eq!(history.date, snapshot.date);
        assert_eq!(snapshot.last_updated, history.ingested_timestamp);
        assert_eq!(snapshot.base, history.base);
    }

    #[test]
    fn snapshot_json_has_stamp_columns() {
        let row = MetadataRecord::merge(&product(), &contract()).snapshot_row(&stamp());
        let json = row.to_json();
        assert_eq!(json["last_updated"], Value::from("2024-03-01T08:30:00.000000+00:00"));
        assert_eq!(json["date"], Value::from("2024-03-01"));
        assert!(json.get("ingested_timestamp").is_none());
        assert_eq!(serde_json::to_value(&row).unwrap(), json);
    }

    #[test]
    fn history_insert_id_is_scoped_to_run_and_row() {
        let id = history_insert_id("0a1b2c3d4e5f", 0);
        assert_eq!(id.len(), 64);
        assert_eq!(id, history_insert_id("0a1b2c3d4e5f", 0));

        // Identical row content in another slot or another run still gets its own id
        assert_ne!(id, history_insert_id("0a1b2c3d4e5f", 1));
        assert_ne!(id, history_insert_id("9f8e7d6c5b4a", 0));
    }
}
