//! Extraction behavior on realistic product and contract documents

use meshload_docs::{extract_contract, extract_product, Document, DocumentError, DocumentKind};
use pretty_assertions::assert_eq;

const CONTRACT: &str = r#"
metadata:
  contractId: c1
  contractName: Sales Contract
  version: "1.0"
inputs:
  - name: orders
    type: bigquery
    location:
      project: shop
      dataset: raw
      table: orders
  - name: customers
    type: gcs
    path: gs://shop/customers/*.parquet
output:
  storage:
    type: bigquery
    project: analytics
    dataset: sales
    table: daily_sales
    partitioning:
      field: date
      granularity: DAY
quality:
  - type: not_null
    column: order_id
  - type: freshness
    max_delay_hours: 24
"#;

const PRODUCT: &str = r#"
id: sales
name: Sales
dataProductOwner:
  dataDomain: commerce
  contact: a@x.com
dataAssetOwner:
  dataDomain: finance
  contact: b@x.com
maturity: managed
"#;

fn doc(yaml: &str) -> Document {
    Document::parse("fixture.yaml", yaml).unwrap()
}

fn json(text: &str) -> serde_json::Value {
    serde_json::from_str(text).unwrap()
}

#[test]
fn test_output_port_decodes_to_storage() {
    let document = doc(CONTRACT);
    let contract = extract_contract(&document).unwrap();

    let storage = serde_json::to_value(document.lookup(&["output", "storage"]).unwrap()).unwrap();
    assert_eq!(json(&contract.dpc_output_port), storage);
}

#[test]
fn test_ports_and_rules_keep_order() {
    let contract = extract_contract(&doc(CONTRACT)).unwrap();

    assert_eq!(contract.dpc_id, "c1");
    assert_eq!(contract.dpc_name, "Sales Contract");
    assert_eq!(contract.dpc_version, "1.0");

    assert_eq!(contract.dpc_input_port.len(), 2);
    assert_eq!(json(&contract.dpc_input_port[0])["name"], "orders");
    assert_eq!(json(&contract.dpc_input_port[1])["path"], "gs://shop/customers/*.parquet");

    assert_eq!(contract.dpc_quality.len(), 2);
    assert_eq!(contract.dpc_quality[0], r#"{"type": "not_null", "column": "order_id"}"#);
    assert_eq!(json(&contract.dpc_quality[1])["max_delay_hours"], 24);
}

#[test]
fn test_single_input_is_wrapped() {
    let single = r#"
metadata: {contractId: c1, contractName: C, version: "1"}
inputs:
  name: orders
  type: bigquery
"#;
    let listed = r#"
metadata: {contractId: c1, contractName: C, version: "1"}
inputs:
  - name: orders
    type: bigquery
"#;

    let from_single = extract_contract(&doc(single)).unwrap();
    let from_list = extract_contract(&doc(listed)).unwrap();

    assert_eq!(from_single.dpc_input_port.len(), 1);
    assert_eq!(from_single, from_list);
}

#[test]
fn test_missing_contract_id_fails() {
    let yaml = r#"
metadata:
  contractName: Sales Contract
  version: "1.0"
inputs: []
"#;
    let err = extract_contract(&doc(yaml)).unwrap_err();

    match err {
        DocumentError::MissingField { kind, key, .. } => {
            assert_eq!(kind, DocumentKind::Contract);
            assert_eq!(key, "metadata.contractId");
        }
        other => panic!("expected MissingField, got {other:?}"),
    }
}

#[test]
fn test_product_fields() {
    let product = extract_product(&doc(PRODUCT)).unwrap();

    assert_eq!(product.dp_id, "sales");
    assert_eq!(product.dp_name, "Sales");
    assert_eq!(product.dp_owner_data_domain, "commerce");
    assert_eq!(product.dp_owner_contact, "a@x.com");
    assert_eq!(product.da_owner_data_domain, "finance");
    assert_eq!(product.da_owner_contact, "b@x.com");
    assert_eq!(product.dp_maturity, "managed");
}

#[test]
fn test_asset_owner_defaults_to_empty() {
    let yaml = r#"
id: sales
name: Sales
dataProductOwner: {dataDomain: commerce, contact: a@x.com}
maturity: managed
"#;
    let product = extract_product(&doc(yaml)).unwrap();
    assert_eq!(product.da_owner_data_domain, "");
    assert_eq!(product.da_owner_contact, "");

    let partial = yaml.replace("maturity", "dataAssetOwner: {contact: b@x.com}\nmaturity");
    let product = extract_product(&doc(&partial)).unwrap();
    assert_eq!(product.da_owner_data_domain, "");
    assert_eq!(product.da_owner_contact, "b@x.com");
}

#[test]
fn test_missing_maturity_fails() {
    let yaml = "id: sales\nname: Sales\ndataProductOwner: {dataDomain: commerce, contact: a@x.com}\n";
    let err = extract_product(&doc(yaml)).unwrap_err();
    assert!(matches!(err, DocumentError::MissingField { ref key, .. } if key == "maturity"));
}

#[test]
fn test_unserializable_descriptor_fails() {
    let yaml = r#"
metadata: {contractId: c1, contractName: C, version: "1"}
quality:
  - ? [a, b]
    : composite key
"#;
    let err = extract_contract(&doc(yaml)).unwrap_err();
    assert!(matches!(err, DocumentError::Serialization { ref field, .. } if field == "quality"));
}
