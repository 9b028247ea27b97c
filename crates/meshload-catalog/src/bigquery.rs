//! BigQuery warehouse adapter
//!
//! Uses the BigQuery tables and tabledata APIs. Required IAM permissions:
//! - bigquery.tables.create / bigquery.tables.delete / bigquery.tables.get
//! - bigquery.tables.updateData (streaming inserts)
//!
//! ## Authentication
//!
//! 1. Service account JSON file (explicit path)
//! 2. Application Default Credentials (ADC)
//!
//! ## Usage
//!
//! ```rust,ignore
//! let adapter = BigQueryAdapter::with_adc("my-project").await?;
//!
//! let adapter = BigQueryAdapter::from_service_account_file(
//!     "my-project",
//!     "/path/to/service-account.json"
//! ).await?;
//! ```

use crate::adapter::{InsertRow, RowError, TableIdentifier, WarehouseAdapter, WarehouseError};
use meshload_core::TableSchema;

#[cfg(feature = "bigquery")]
use gcp_bigquery_client::{
    model::field_type::FieldType,
    model::table::Table,
    model::table_data_insert_all_request::TableDataInsertAllRequest,
    model::table_field_schema::TableFieldSchema,
    model::table_schema::TableSchema as BqTableSchema,
    Client as BigQueryClient,
};

/// BigQuery warehouse adapter
pub struct BigQueryAdapter {
    /// BigQuery client (only available with bigquery feature)
    #[cfg(feature = "bigquery")]
    client: BigQueryClient,
}

const NOT_COMPILED: &str = "BigQuery support not compiled. Rebuild with: cargo build --features bigquery";

impl BigQueryAdapter {
    /// Create a new BigQuery adapter using Application Default Credentials (ADC)
    ///
    /// ADC automatically detects credentials from:
    /// - GOOGLE_APPLICATION_CREDENTIALS environment variable
    /// - gcloud CLI default credentials
    /// - GCE/GKE metadata service
    #[cfg(feature = "bigquery")]
    pub async fn with_adc(project_id: impl Into<String>) -> Result<Self, WarehouseError> {
        let project_id = project_id.into();

        let client = BigQueryClient::from_application_default_credentials()
            .await
            .map_err(|e| WarehouseError::AuthenticationError(format!(
                "Failed to authenticate with ADC: {}. \
                 Ensure GOOGLE_APPLICATION_CREDENTIALS is set or run 'gcloud auth application-default login'",
                e
            )))?;

        tracing::debug!(project = %project_id, "authenticated with application default credentials");
        Ok(Self { client })
    }

    /// Create adapter without bigquery feature (returns error)
    #[cfg(not(feature = "bigquery"))]
    pub async fn with_adc(project_id: impl Into<String>) -> Result<Self, WarehouseError> {
        let _ = project_id;
        Err(WarehouseError::ConfigError(NOT_COMPILED.to_string()))
    }

    /// Create a new BigQuery adapter using a service account key file
    #[cfg(feature = "bigquery")]
    pub async fn from_service_account_file(
        project_id: impl Into<String>,
        key_path: impl AsRef<std::path::Path>,
    ) -> Result<Self, WarehouseError> {
        let project_id = project_id.into();
        let key_path_str = key_path.as_ref().to_string_lossy().to_string();

        let client = BigQueryClient::from_service_account_key_file(&key_path_str)
            .await
            .map_err(|e| WarehouseError::AuthenticationError(format!(
                "Failed to read service account key file '{}': {}",
                key_path_str, e
            )))?;

        tracing::debug!(project = %project_id, key = %key_path_str, "authenticated with service account key");
        Ok(Self { client })
    }

    /// Create adapter without bigquery feature (returns error)
    #[cfg(not(feature = "bigquery"))]
    pub async fn from_service_account_file(
        project_id: impl Into<String>,
        _key_path: impl AsRef<std::path::Path>,
    ) -> Result<Self, WarehouseError> {
        let _ = project_id;
        Err(WarehouseError::ConfigError(NOT_COMPILED.to_string()))
    }

    /// Map an API error message onto a warehouse error
    pub fn classify_error(table: &TableIdentifier, message: String) -> WarehouseError {
        if message.contains("Not found") || message.contains("notFound") {
            WarehouseError::TableNotFound(table.fqn())
        } else if message.contains("Already Exists") || message.contains("duplicate") {
            WarehouseError::AlreadyExists(table.fqn())
        } else if message.contains("Access Denied") || message.contains("Permission") {
            WarehouseError::PermissionDenied(format!("Cannot access {}: {}", table.fqn(), message))
        } else {
            WarehouseError::RequestError(message)
        }
    }

    /// Read per-row errors from a tabledata.insertAll response body
    ///
    /// The body looks like
    /// `{"insertErrors": [{"index": 0, "errors": [{"reason": "invalid", "message": "..."}]}]}`.
    pub fn parse_insert_errors(body: &serde_json::Value) -> Result<Vec<RowError>, WarehouseError> {
        let Some(entries) = body.get("insertErrors").and_then(|v| v.as_array()) else {
            return Ok(Vec::new());
        };

        entries
            .iter()
            .map(|entry| {
                let index = entry
                    .get("index")
                    .and_then(|i| i.as_u64())
                    .ok_or_else(|| WarehouseError::InvalidResponse(format!(
                        "insert error without row index: {}",
                        entry
                    )))?;

                let reasons = entry
                    .get("errors")
                    .and_then(|e| e.as_array())
                    .map(|errors| {
                        errors
                            .iter()
                            .map(|err| {
                                let reason = err.get("reason").and_then(|r| r.as_str()).unwrap_or("unknown");
                                match err.get("message").and_then(|m| m.as_str()) {
                                    Some(message) if !message.is_empty() => format!("{}: {}", reason, message),
                                    _ => reason.to_string(),
                                }
                            })
                            .collect()
                    })
                    .unwrap_or_default();

                Ok(RowError {
                    index: index as usize,
                    reasons,
                })
            })
            .collect()
    }

    /// Convert a template schema into the API schema
    #[cfg(feature = "bigquery")]
    fn api_schema(schema: &TableSchema) -> Result<BqTableSchema, WarehouseError> {
        let fields = schema
            .fields
            .iter()
            .map(|field| {
                let field_type: FieldType =
                    serde_json::from_value(serde_json::Value::String(field.field_type.clone()))
                        .map_err(|e| WarehouseError::ConfigError(format!(
                            "Unsupported column type '{}' for '{}': {}",
                            field.field_type, field.name, e
                        )))?;

                let mut api_field = TableFieldSchema::new(&field.name, field_type);
                api_field.mode = Some(field.mode.as_str().to_string());
                api_field.description = Some(field.description.clone());
                Ok(api_field)
            })
            .collect::<Result<Vec<_>, WarehouseError>>()?;

        Ok(BqTableSchema::new(fields))
    }
}

#[async_trait::async_trait]
impl WarehouseAdapter for BigQueryAdapter {
    fn name(&self) -> &'static str {
        "BigQuery"
    }

    #[cfg(feature = "bigquery")]
    async fn delete_table(&self, table: &TableIdentifier) -> Result<(), WarehouseError> {
        self.client
            .table()
            .delete(&table.project, &table.dataset, &table.table)
            .await
            .map_err(|e| Self::classify_error(table, e.to_string()))
    }

    #[cfg(feature = "bigquery")]
    async fn create_table(&self, table: &TableIdentifier, schema: &TableSchema) -> Result<(), WarehouseError> {
        let api_table = Table::new(
            &table.project,
            &table.dataset,
            &table.table,
            Self::api_schema(schema)?,
        );

        self.client
            .table()
            .create(api_table)
            .await
            .map(|_| ())
            .map_err(|e| Self::classify_error(table, e.to_string()))
    }

    #[cfg(feature = "bigquery")]
    async fn table_exists(&self, table: &TableIdentifier) -> Result<bool, WarehouseError> {
        match self
            .client
            .table()
            .get(&table.project, &table.dataset, &table.table, None)
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => match Self::classify_error(table, e.to_string()) {
                WarehouseError::TableNotFound(_) => Ok(false),
                other => Err(other),
            },
        }
    }

    #[cfg(feature = "bigquery")]
    async fn insert_rows(
        &self,
        table: &TableIdentifier,
        rows: &[InsertRow],
    ) -> Result<Vec<RowError>, WarehouseError> {
        let mut request = TableDataInsertAllRequest::new();
        for row in rows {
            request
                .add_row(row.insert_id.clone(), row.json.clone())
                .map_err(|e| WarehouseError::RequestError(format!("Failed to encode row: {}", e)))?;
        }

        let response = self
            .client
            .tabledata()
            .insert_all(&table.project, &table.dataset, &table.table, request)
            .await
            .map_err(|e| Self::classify_error(table, e.to_string()))?;

        let body = serde_json::to_value(&response)
            .map_err(|e| WarehouseError::InvalidResponse(e.to_string()))?;
        Self::parse_insert_errors(&body)
    }

    #[cfg(not(feature = "bigquery"))]
    async fn delete_table(&self, _table: &TableIdentifier) -> Result<(), WarehouseError> {
        Err(WarehouseError::ConfigError(NOT_COMPILED.to_string()))
    }

    #[cfg(not(feature = "bigquery"))]
    async fn create_table(&self, _table: &TableIdentifier, _schema: &TableSchema) -> Result<(), WarehouseError> {
        Err(WarehouseError::ConfigError(NOT_COMPILED.to_string()))
    }

    #[cfg(not(feature = "bigquery"))]
    async fn table_exists(&self, _table: &TableIdentifier) -> Result<bool, WarehouseError> {
        Err(WarehouseError::ConfigError(NOT_COMPILED.to_string()))
    }

    #[cfg(not(feature = "bigquery"))]
    async fn insert_rows(
        &self,
        _table: &TableIdentifier,
        _rows: &[InsertRow],
    ) -> Result<Vec<RowError>, WarehouseError> {
        Err(WarehouseError::ConfigError(NOT_COMPILED.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> TableIdentifier {
        TableIdentifier::new("proj", "ds", "metadata_snapshot")
    }

    #[test]
    fn test_classify_not_found() {
        let err = BigQueryAdapter::classify_error(
            &table(),
            "Response error: Not found: Table proj:ds.metadata_snapshot".to_string(),
        );
        assert!(err.is_not_found());
    }

    #[test]
    fn test_classify_other_errors() {
        assert!(matches!(
            BigQueryAdapter::classify_error(&table(), "Access Denied: Table proj:ds".to_string()),
            WarehouseError::PermissionDenied(_)
        ));
        assert!(matches!(
            BigQueryAdapter::classify_error(&table(), "Already Exists: Table proj:ds.t".to_string()),
            WarehouseError::AlreadyExists(_)
        ));
        assert!(matches!(
            BigQueryAdapter::classify_error(&table(), "Backend error".to_string()),
            WarehouseError::RequestError(_)
        ));
    }

    #[test]
    fn test_parse_insert_errors() {
        let body = json!({
            "kind": "bigquery#tableDataInsertAllResponse",
            "insertErrors": [
                {"index": 1, "errors": [{"reason": "invalid", "message": "no such field: extra"}]},
                {"index": 0, "errors": [{"reason": "stopped", "message": ""}]}
            ]
        });

        let errors = BigQueryAdapter::parse_insert_errors(&body).unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(errors[0].index, 1);
        assert_eq!(errors[0].reasons, vec!["invalid: no such field: extra".to_string()]);
        assert_eq!(errors[1].reasons, vec!["stopped".to_string()]);
    }

    #[test]
    fn test_parse_insert_success() {
        let body = json!({"kind": "bigquery#tableDataInsertAllResponse"});
        assert!(BigQueryAdapter::parse_insert_errors(&body).unwrap().is_empty());

        let body = json!({"insertErrors": [{"errors": []}]});
        assert!(matches!(
            BigQueryAdapter::parse_insert_errors(&body),
            Err(WarehouseError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    #[cfg(not(feature = "bigquery"))]
    async fn test_adapter_requires_feature() {
        let result = BigQueryAdapter::with_adc("my-project").await;
        assert!(matches!(result, Err(WarehouseError::ConfigError(_))));
    }
}
