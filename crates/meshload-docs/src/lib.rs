//! Data product and data contract documents
//!
//! This crate handles:
//! - Reading YAML documents from disk
//! - Flattening product and contract documents into fixed records
//! - Rendering nested descriptors as JSON text
//! - Walking a products directory to pair products with their contracts

pub mod error;
pub mod reader;
pub mod json_text;
pub mod extract;
pub mod discovery;

pub use error::{DocumentError, DocumentKind};
pub use reader::{Document, read_document};
pub use json_text::{to_json_text, collapse_escaped_quotes};
pub use extract::{extract_contract, extract_product};
pub use discovery::{discover, ProductEntry, CONTRACTS_DIR};
