//! Document errors

use std::fmt;
use std::path::PathBuf;

/// Which mapping a document is flattened with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Product,
    Contract,
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product => write!(f, "data product"),
            Self::Contract => write!(f, "data contract"),
        }
    }
}

/// Errors raised while reading, flattening or discovering documents
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Error reading YAML file {}: {reason}", .path.display())]
    Read { path: PathBuf, reason: String },

    #[error("Missing key '{key}' in {kind} {}", .path.display())]
    MissingField {
        kind: DocumentKind,
        key: String,
        path: PathBuf,
    },

    #[error("Error serializing '{field}' in {}: {reason}", .path.display())]
    Serialization {
        field: String,
        path: PathBuf,
        reason: String,
    },

    #[error("Error walking products directory {}: {reason}", .path.display())]
    Discovery { path: PathBuf, reason: String },
}

impl DocumentError {
    /// The file the error refers to
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. }
            | Self::MissingField { path, .. }
            | Self::Serialization { path, .. }
            | Self::Discovery { path, .. } => path,
        }
    }
}
