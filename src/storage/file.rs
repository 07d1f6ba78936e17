//! Filesystem record storage
//!
//! One JSON file per resource under a base directory. Saves go through a
//! temporary file that is renamed over the target, so readers see either the
//! old record or the new one.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::{RecordBackend, StorageError, StorageRecord};

/// Record backend writing JSON files
#[derive(Debug, Clone)]
pub struct FileBackend {
    base_path: PathBuf,
}

impl FileBackend {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Path of the record file for a resource
    pub fn record_path(&self, resource_id: &str) -> PathBuf {
        self.base_path
            .join(format!("{}.json", urlencoding::encode(resource_id)))
    }
}

#[async_trait]
impl RecordBackend for FileBackend {
    fn name(&self) -> &'static str {
        "file"
    }

    async fn load(&self, resource_id: &str) -> Result<Option<StorageRecord>, StorageError> {
        let path = self.record_path(resource_id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    async fn save(&self, record: &StorageRecord) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(&self.base_path).await?;

        let path = self.record_path(&record.id);
        let temp = self
            .base_path
            .join(format!(".{}.tmp", Uuid::new_v4()));
        let bytes = serde_json::to_vec_pretty(record)?;

        tokio::fs::write(&temp, &bytes).await?;
        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            let _ = tokio::fs::remove_file(&temp).await;
            return Err(e.into());
        }

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Wrote record file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::tests::final_annotation;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_record_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        assert!(backend.load("canvas-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path().join("records"));

        let mut record = StorageRecord::empty("https://example.org/texts/1");
        record.items.push(final_annotation("giovani"));
        backend.save(&record).await.unwrap();

        let loaded = backend.load("https://example.org/texts/1").await.unwrap();
        assert_eq!(loaded, Some(record));

        // file name is the encoded resource id, no temp files remain
        let names: Vec<String> = std::fs::read_dir(temp_dir.path().join("records"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["https%3A%2F%2Fexample.org%2Ftexts%2F1.json"]);
    }

    #[tokio::test]
    async fn test_save_replaces_record() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());

        let mut record = StorageRecord::empty("canvas-1");
        record.items.push(final_annotation("giovani"));
        backend.save(&record).await.unwrap();

        record.items.clear();
        backend.save(&record).await.unwrap();

        let loaded = backend.load("canvas-1").await.unwrap().unwrap();
        assert!(loaded.items.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_record_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let backend = FileBackend::new(temp_dir.path());
        std::fs::write(backend.record_path("canvas-1"), b"{not json").unwrap();

        assert!(matches!(
            backend.load("canvas-1").await,
            Err(StorageError::Encoding(_))
        ));
    }
}
