//! Table schema templates
//!
//! The snapshot table is recreated on every run from a template file: a JSON
//! array of `{name, type, mode?, descriptions?}` objects.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::path::Path;

/// Warehouse column types accepted in a template
const KNOWN_TYPES: &[&str] = &[
    "STRING", "BYTES", "INTEGER", "INT64", "FLOAT", "FLOAT64", "NUMERIC",
    "BIGNUMERIC", "BOOLEAN", "BOOL", "TIMESTAMP", "DATE", "TIME", "DATETIME",
    "GEOGRAPHY", "JSON", "RECORD", "STRUCT", "INTERVAL",
];

/// Column mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldMode {
    #[default]
    Nullable,
    Required,
    Repeated,
}

impl FieldMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nullable => "NULLABLE",
            Self::Required => "REQUIRED",
            Self::Repeated => "REPEATED",
        }
    }
}

impl std::fmt::Display for FieldMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One column of a table schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,

    /// Upper-case warehouse type name (e.g. `STRING`, `TIMESTAMP`)
    #[serde(rename = "type")]
    pub field_type: String,

    #[serde(default)]
    pub mode: FieldMode,

    /// Templates spell this key `descriptions`
    #[serde(default, rename = "descriptions", alias = "description")]
    pub description: String,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            mode: FieldMode::Nullable,
            description: String::new(),
        }
    }

    pub fn with_mode(mut self, mode: FieldMode) -> Self {
        self.mode = mode;
        self
    }
}

/// An ordered list of column definitions
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSchema {
    pub fields: Vec<FieldDefinition>,
}

impl TableSchema {
    pub fn from_fields(fields: Vec<FieldDefinition>) -> Self {
        Self { fields }
    }

    /// Load and validate a template file
    pub fn from_template_file(path: &Path) -> Result<Self, SchemaError> {
        let contents = std::fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_template_str(&contents).map_err(|e| match e {
            SchemaError::Parse { reason, .. } => SchemaError::Parse {
                path: path.display().to_string(),
                reason,
            },
            other => other,
        })
    }

    /// Parse and validate template JSON
    pub fn from_template_str(json: &str) -> Result<Self, SchemaError> {
        let mut schema: TableSchema = serde_json::from_str(json).map_err(|e| SchemaError::Parse {
            path: "<inline>".to_string(),
            reason: e.to_string(),
        })?;

        for field in &mut schema.fields {
            field.field_type = field.field_type.trim().to_uppercase();
        }

        schema.validate()?;
        Ok(schema)
    }

    /// Reject empty names, duplicate names and unknown types
    pub fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();

        for field in &self.fields {
            if field.name.trim().is_empty() {
                return Err(SchemaError::InvalidField("empty column name".to_string()));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SchemaError::InvalidField(format!(
                    "duplicate column '{}'",
                    field.name
                )));
            }
            if !KNOWN_TYPES.contains(&field.field_type.as_str()) {
                return Err(SchemaError::InvalidField(format!(
                    "column '{}' has unknown type '{}'",
                    field.name, field.field_type
                )));
            }
        }

        Ok(())
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name.as_str()).collect()
    }

    /// Check a JSON row against the schema the way a streaming insert would.
    ///
    /// Returns one reason per problem; an empty list means the row fits.
    pub fn check_row(&self, row: &Map<String, Value>) -> Vec<String> {
        let mut reasons = Vec::new();

        for key in row.keys() {
            if self.find_field(key).is_none() {
                reasons.push(format!("no such field: {}", key));
            }
        }

        for field in &self.fields {
            let value = row.get(&field.name);
            match field.mode {
                FieldMode::Required => {
                    if value.map_or(true, Value::is_null) {
                        reasons.push(format!("missing required field: {}", field.name));
                    }
                }
                FieldMode::Repeated => {
                    if let Some(v) = value {
                        if !v.is_array() && !v.is_null() {
                            reasons.push(format!("array expected for repeated field: {}", field.name));
                        }
                    }
                }
                FieldMode::Nullable => {
                    if let Some(Value::Array(_)) = value {
                        reasons.push(format!("array specified for non-repeated field: {}", field.name));
                    }
                }
            }
        }

        reasons
    }
}

/// Schema template errors
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Failed to read schema template {path}: {reason}")]
    Io { path: String, reason: String },

    #[error("Failed to parse schema template {path}: {reason}")]
    Parse { path: String, reason: String },

    #[error("Invalid schema field: {0}")]
    InvalidField(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const TEMPLATE: &str = r#"[
        {"name": "dp_id", "type": "STRING", "mode": "REQUIRED", "descriptions": "Data product id"},
        {"name": "dpc_input_port", "type": "STRING", "mode": "REPEATED"},
        {"name": "last_updated", "type": "timestamp"}
    ]"#;

    #[test]
    fn parse_template_with_defaults() {
        let schema = TableSchema::from_template_str(TEMPLATE).unwrap();

        assert_eq!(schema.field_names(), vec!["dp_id", "dpc_input_port", "last_updated"]);
        assert_eq!(schema.fields[0].mode, FieldMode::Required);
        assert_eq!(schema.fields[0].description, "Data product id");
        assert_eq!(schema.fields[2].mode, FieldMode::Nullable);
        assert_eq!(schema.fields[2].description, "");
        assert_eq!(schema.fields[2].field_type, "TIMESTAMP");
    }

    #[test]
    fn reject_unknown_type() {
        let err = TableSchema::from_template_str(r#"[{"name": "a", "type": "VARCHAR"}]"#).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField(_)));
        assert!(err.to_string().contains("VARCHAR"));
    }

    #[test]
    fn reject_duplicate_column() {
        let err = TableSchema::from_template_str(
            r#"[{"name": "a", "type": "STRING"}, {"name": "a", "type": "DATE"}]"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate column 'a'"));
    }

    #[test]
    fn reject_malformed_json() {
        let err = TableSchema::from_template_str("{not json").unwrap_err();
        assert!(matches!(err, SchemaError::Parse { .. }));
    }

    #[test]
    fn template_file_errors_name_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshot.tpl");

        let err = TableSchema::from_template_file(&path).unwrap_err();
        assert!(matches!(err, SchemaError::Io { .. }));

        std::fs::write(&path, "[").unwrap();
        let err = TableSchema::from_template_file(&path).unwrap_err();
        assert!(err.to_string().contains("snapshot.tpl"));

        std::fs::write(&path, TEMPLATE).unwrap();
        assert_eq!(TableSchema::from_template_file(&path).unwrap().fields.len(), 3);
    }

    #[test]
    fn check_row_reports_problems() {
        let schema = TableSchema::from_template_str(TEMPLATE).unwrap();

        let good = json!({"dp_id": "sales", "dpc_input_port": ["{}"], "last_updated": "2024-01-01"});
        assert!(schema.check_row(good.as_object().unwrap()).is_empty());

        let bad = json!({"dpc_input_port": "{}", "extra": 1});
        let reasons = schema.check_row(bad.as_object().unwrap());
        assert_eq!(reasons.len(), 3);
        assert!(reasons.contains(&"no such field: extra".to_string()));
        assert!(reasons.contains(&"missing required field: dp_id".to_string()));
    }
}
