//! Products directory walk
//!
//! Layout:
//!
//! ```text
//! <base>/
//!   sales/
//!     sales.yaml          data product
//!     contracts/
//!       v1.yaml           data contracts (any name)
//!       v2.yml
//! ```
//!
//! A product directory is skipped when its product file is missing or it has
//! no contract files.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::DocumentError;

/// Subdirectory holding a product's contracts
pub const CONTRACTS_DIR: &str = "contracts";

const CONTRACT_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// A product document and its contract documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductEntry {
    /// Product directory name
    pub name: String,

    pub product_file: PathBuf,

    /// Sorted by file name
    pub contract_files: Vec<PathBuf>,
}

/// Pair every product directory under `base` with its contracts, in sorted order
pub fn discover(base: &Path) -> Result<Vec<ProductEntry>, DocumentError> {
    if !base.is_dir() {
        let err = DocumentError::Discovery {
            path: base.to_path_buf(),
            reason: "not a directory".to_string(),
        };
        tracing::error!(error = %err, "products directory unavailable");
        return Err(err);
    }

    let mut entries = Vec::new();

    for dir in list(base, &[])? {
        if !dir.is_dir() {
            continue;
        }

        let Some(name) = dir.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            tracing::debug!(path = %dir.display(), "skipping directory with non UTF-8 name");
            continue;
        };

        let product_file = dir.join(format!("{}.yaml", name));
        if !product_file.is_file() {
            tracing::debug!(product = %name, "no product file, skipping");
            continue;
        }

        let contracts_dir = dir.join(CONTRACTS_DIR);
        let contract_files = if contracts_dir.is_dir() {
            list(&contracts_dir, CONTRACT_EXTENSIONS)?
                .into_iter()
                .filter(|p| p.is_file())
                .collect::<Vec<_>>()
        } else {
            Vec::new()
        };

        if contract_files.is_empty() {
            tracing::debug!(product = %name, "no contract files, skipping");
            continue;
        }

        tracing::debug!(product = %name, contracts = contract_files.len(), "discovered product");
        entries.push(ProductEntry {
            name,
            product_file,
            contract_files,
        });
    }

    tracing::info!(path = %base.display(), products = entries.len(), "discovery complete");
    Ok(entries)
}

/// Direct children of `dir`, sorted by name; filtered by extension when given
fn list(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, DocumentError> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| {
            let err = DocumentError::Discovery {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            };
            tracing::error!(error = %err, "directory walk failed");
            err
        })?;

        let path = entry.into_path();
        if extensions.is_empty() || has_extension(&path, extensions) {
            paths.push(path);
        }
    }

    Ok(paths)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map_or(false, |e| extensions.contains(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_match() {
        assert!(has_extension(Path::new("v1.yaml"), CONTRACT_EXTENSIONS));
        assert!(has_extension(Path::new("v1.yml"), CONTRACT_EXTENSIONS));
        assert!(!has_extension(Path::new("v1.json"), CONTRACT_EXTENSIONS));
        assert!(!has_extension(Path::new("README"), CONTRACT_EXTENSIONS));
    }

    #[test]
    fn missing_base_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(&dir.path().join("nope")).unwrap_err();
        assert!(matches!(err, DocumentError::Discovery { .. }));
    }
}
