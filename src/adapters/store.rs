//! File-based document storage.
//!
//! Documents are stored as pretty-printed JSON of the `Document` model,
//! which keeps every run's opaque attributes intact across a fill.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::domain::Document;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Unsupported or malformed document {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// JSON document store
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonStore;

impl JsonStore {
    pub const EXTENSION: &'static str = "json";

    pub fn new() -> Self {
        Self
    }

    fn check_extension(path: &Path) -> Result<(), StoreError> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or_default();
        if ext.eq_ignore_ascii_case(Self::EXTENSION) {
            Ok(())
        } else {
            Err(StoreError::Format {
                path: path.to_path_buf(),
                reason: format!("expected a .{} file", Self::EXTENSION),
            })
        }
    }

    /// Load a document from disk
    pub async fn load(&self, path: &Path) -> Result<Document, StoreError> {
        Self::check_extension(path)?;

        let content = fs::read_to_string(path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StoreError::NotFound(path.to_path_buf())
            } else {
                StoreError::Io {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let document: Document = serde_json::from_str(&content).map_err(|e| StoreError::Format {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        debug!(path = %path.display(), paragraphs = document.paragraph_count(), "Loaded document");
        Ok(document)
    }

    /// Write a document, creating parent directories as needed
    pub async fn save(&self, document: &Document, path: &Path) -> Result<(), StoreError> {
        Self::check_extension(path)?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|source| StoreError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = serde_json::to_string_pretty(document).map_err(|e| StoreError::Format {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        fs::write(path, content).await.map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        debug!(path = %path.display(), "Saved document");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use tokio_test::assert_err;

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = assert_err!(JsonStore::new().load(&temp.path().join("missing.json")).await);
        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_wrong_extension_is_format_error() {
        let temp = TempDir::new().unwrap();
        let err = assert_err!(JsonStore::new().load(&temp.path().join("form.docx")).await);
        assert!(matches!(err, StoreError::Format { .. }));
    }

    #[tokio::test]
    async fn test_malformed_json_is_format_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bad.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = JsonStore::new().load(&path).await.unwrap_err();
        assert!(matches!(err, StoreError::Format { .. }));
    }
}
