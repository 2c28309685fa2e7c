//! Persistence collaborator: load and save a page's block tree by id.

use std::fs;
use std::path::{Path, PathBuf};

use relative_path::RelativePathBuf;

use crate::model::Document;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("No stored document for page '{0}'")]
    NotFound(String),
    #[error("Invalid page id: '{0}'")]
    InvalidPageId(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Stored document {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Where documents live between transcode runs.
pub trait DocumentStore {
    fn load_document(&self, page_id: &str) -> Result<Document, StoreError>;
    fn save_document(&self, page_id: &str, document: &Document) -> Result<(), StoreError>;
}

/// One pretty-printed JSON file per page under a root directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `page_id`'s file. Ids may group pages in folders (`blog/42`)
    /// but can never leave the store root.
    pub fn document_path(&self, page_id: &str) -> Result<PathBuf, StoreError> {
        let invalid = || StoreError::InvalidPageId(page_id.to_string());
        let relative = RelativePathBuf::from(format!("{page_id}.json"));
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                relative_path::Component::ParentDir | relative_path::Component::CurDir
            )
        });
        let legal = page_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '/'));
        if page_id.is_empty() || page_id.starts_with('/') || escapes || !legal {
            return Err(invalid());
        }
        Ok(relative.to_path(&self.root))
    }
}

impl DocumentStore for FileStore {
    fn load_document(&self, page_id: &str) -> Result<Document, StoreError> {
        let path = self.document_path(page_id)?;
        if !path.exists() {
            return Err(StoreError::NotFound(page_id.to_string()));
        }
        let content = fs::read_to_string(&path)?;
        serde_json::from_str(&content).map_err(|source| StoreError::Corrupt { path, source })
    }

    fn save_document(&self, page_id: &str, document: &Document) -> Result<(), StoreError> {
        let path = self.document_path(page_id)?;

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = document
            .to_json_pretty()
            .map_err(|source| StoreError::Corrupt {
                path: path.clone(),
                source,
            })?;
        fs::write(&path, json)?;
        log::debug!("Saved page {page_id} to {}", path.display());
        Ok(())
    }
}
