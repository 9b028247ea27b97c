//! YAML document reader

use serde_yaml::Value;
use std::path::{Path, PathBuf};

use crate::error::DocumentError;

/// A parsed document and where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub path: PathBuf,
    pub root: Value,
}

impl Document {
    /// Parse YAML text; `path` is only used for error context
    pub fn parse(path: impl Into<PathBuf>, yaml: &str) -> Result<Self, DocumentError> {
        let path = path.into();

        let root: Value = serde_yaml::from_str(yaml).map_err(|e| DocumentError::Read {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        if !root.is_mapping() {
            return Err(DocumentError::Read {
                path,
                reason: "document root is not a mapping".to_string(),
            });
        }

        Ok(Self { path, root })
    }

    /// Follow a key path through nested mappings
    pub fn lookup(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter().try_fold(&self.root, |node, key| node.get(*key))
    }
}

/// Read and parse a YAML document from disk
pub fn read_document(path: &Path) -> Result<Document, DocumentError> {
    let contents = std::fs::read_to_string(path).map_err(|e| DocumentError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    });

    let parsed = contents.and_then(|text| Document::parse(path, &text));
    if let Err(e) = &parsed {
        tracing::error!(path = %path.display(), error = %e, "failed to read document");
    }
    parsed
}
