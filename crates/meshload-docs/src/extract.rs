//! Field extraction
//!
//! Flattens a data product or data contract document into its fixed record.
//! Required keys must be present and non-null; `dataAssetOwner.*` defaults
//! to an empty string.

use meshload_core::{FlatContractRecord, FlatProductRecord};
use serde_yaml::Value;

use crate::error::{DocumentError, DocumentKind};
use crate::json_text::to_json_text;
use crate::reader::Document;

/// Flatten a data contract document
pub fn extract_contract(doc: &Document) -> Result<FlatContractRecord, DocumentError> {
    let result = flatten_contract(doc);
    if let Err(e) = &result {
        tracing::error!(path = %doc.path.display(), error = %e, "invalid data contract");
    }
    result
}

/// Flatten a data product document
pub fn extract_product(doc: &Document) -> Result<FlatProductRecord, DocumentError> {
    let result = flatten_product(doc);
    if let Err(e) = &result {
        tracing::error!(path = %doc.path.display(), error = %e, "invalid data product");
    }
    result
}

fn flatten_contract(doc: &Document) -> Result<FlatContractRecord, DocumentError> {
    let kind = DocumentKind::Contract;

    let dpc_id = required(doc, kind, &["metadata", "contractId"])?;
    let dpc_name = required(doc, kind, &["metadata", "contractName"])?;
    let dpc_version = required(doc, kind, &["metadata", "version"])?;

    let dpc_input_port = as_sequence(doc.lookup(&["inputs"]))
        .into_iter()
        .map(|port| descriptor_text(doc, "inputs", port))
        .collect::<Result<Vec<_>, _>>()?;

    let empty = Value::Mapping(Default::default());
    let storage = match doc.lookup(&["output", "storage"]) {
        None | Some(Value::Null) => &empty,
        Some(storage) => storage,
    };
    let dpc_output_port = descriptor_text(doc, "output.storage", storage)?;

    let dpc_quality = as_sequence(doc.lookup(&["quality"]))
        .into_iter()
        .map(|rule| descriptor_text(doc, "quality", rule))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(FlatContractRecord {
        dpc_id,
        dpc_name,
        dpc_version,
        dpc_input_port,
        dpc_output_port,
        dpc_quality,
    })
}

fn flatten_product(doc: &Document) -> Result<FlatProductRecord, DocumentError> {
    let kind = DocumentKind::Product;

    Ok(FlatProductRecord {
        dp_id: required(doc, kind, &["id"])?,
        dp_name: required(doc, kind, &["name"])?,
        dp_owner_data_domain: required(doc, kind, &["dataProductOwner", "dataDomain"])?,
        dp_owner_contact: required(doc, kind, &["dataProductOwner", "contact"])?,
        da_owner_data_domain: optional(doc, &["dataAssetOwner", "dataDomain"])?,
        da_owner_contact: optional(doc, &["dataAssetOwner", "contact"])?,
        dp_maturity: required(doc, kind, &["maturity"])?,
    })
}

/// A single descriptor becomes a one-element sequence; absent or null is empty
fn as_sequence(value: Option<&Value>) -> Vec<&Value> {
    match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Sequence(items)) => items.iter().collect(),
        Some(single) => vec![single],
    }
}

fn descriptor_text(doc: &Document, field: &str, value: &Value) -> Result<String, DocumentError> {
    to_json_text(value).map_err(|e| DocumentError::Serialization {
        field: field.to_string(),
        path: doc.path.clone(),
        reason: e.to_string(),
    })
}

fn required(doc: &Document, kind: DocumentKind, keys: &[&str]) -> Result<String, DocumentError> {
    let key = keys.join(".");
    match doc.lookup(keys) {
        None | Some(Value::Null) => Err(DocumentError::MissingField {
            kind,
            key,
            path: doc.path.clone(),
        }),
        Some(value) => scalar_text(doc, &key, value),
    }
}

fn optional(doc: &Document, keys: &[&str]) -> Result<String, DocumentError> {
    match doc.lookup(keys) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(value) => scalar_text(doc, &keys.join("."), value),
    }
}

/// Text for a column value; numbers and booleans use their YAML spelling
fn scalar_text(doc: &Document, key: &str, value: &Value) -> Result<String, DocumentError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => descriptor_text(doc, key, other),
    }
}
