//! Annotation persistence
//!
//! A [`StorageAdapter`] is bound to one resource (a text or canvas) and
//! keeps that resource's finals as a single [`StorageRecord`]. Every
//! mutation reads the whole record, applies one change and writes it back.
//! Writes are not coordinated between adapters: the last writer wins.
//!
//! Backends only load and save whole records; the adapter logic lives in
//! [`RecordAdapter`] and is shared by all of them.

mod file;
mod memory;
mod publish;
mod sqlite;

pub use file::FileBackend;
pub use memory::MemoryBackend;
pub use publish::{ExportError, RdfPublisher, SparqlEndpoint, TripleStore, NQUADS_CONTENT_TYPE};
pub use sqlite::SqliteBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::annotations::FinalAnnotation;
use crate::config::{StorageBackendKind, StorageConfig};

/// All persisted annotations of one resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageRecord {
    /// Resource identifier the record is bound to
    pub id: String,
    /// Finals in insertion order
    pub items: Vec<FinalAnnotation>,
}

impl StorageRecord {
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            items: Vec::new(),
        }
    }

    pub fn find(&self, id: &str) -> Option<&FinalAnnotation> {
        self.items.iter().find(|item| item.id == id)
    }
}

/// Local persistence errors
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Record encoding error: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Loads and saves whole records
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    async fn load(&self, resource_id: &str) -> Result<Option<StorageRecord>, StorageError>;

    async fn save(&self, record: &StorageRecord) -> Result<(), StorageError>;
}

/// Persistence port for the annotations of one resource
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    fn resource_id(&self) -> &str;

    /// Append a final, creating the record if needed
    async fn create(&self, annotation: FinalAnnotation) -> Result<StorageRecord, StorageError>;

    /// Replace the stored final with the same id; `None` when absent
    async fn update(
        &self,
        annotation: FinalAnnotation,
    ) -> Result<Option<StorageRecord>, StorageError>;

    /// Remove a final; unknown ids leave the record unchanged
    async fn delete(&self, id: &str) -> Result<StorageRecord, StorageError>;

    async fn get(&self, id: &str) -> Result<Option<FinalAnnotation>, StorageError>;

    async fn all(&self) -> Result<Option<StorageRecord>, StorageError>;
}

/// [`StorageAdapter`] over any [`RecordBackend`]
#[derive(Clone)]
pub struct RecordAdapter {
    resource_id: String,
    backend: Arc<dyn RecordBackend>,
    publisher: Option<RdfPublisher>,
}

impl RecordAdapter {
    pub fn new(resource_id: impl Into<String>, backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            resource_id: resource_id.into(),
            backend,
            publisher: None,
        }
    }

    /// Push the record to a triple store after every create
    pub fn with_publisher(mut self, publisher: RdfPublisher) -> Self {
        self.publisher = Some(publisher);
        self
    }

    async fn load_or_empty(&self) -> Result<StorageRecord, StorageError> {
        Ok(self
            .backend
            .load(&self.resource_id)
            .await?
            .unwrap_or_else(|| StorageRecord::empty(&self.resource_id)))
    }
}

#[async_trait]
impl StorageAdapter for RecordAdapter {
    fn resource_id(&self) -> &str {
        &self.resource_id
    }

    async fn create(&self, annotation: FinalAnnotation) -> Result<StorageRecord, StorageError> {
        let mut record = self.load_or_empty().await?;
        record.items.push(annotation);
        self.backend.save(&record).await?;

        tracing::debug!(
            resource = %self.resource_id,
            backend = self.backend.name(),
            items = record.items.len(),
            "Stored annotation"
        );

        if let Some(publisher) = &self.publisher {
            publisher.publish(&record);
        }
        Ok(record)
    }

    async fn update(
        &self,
        annotation: FinalAnnotation,
    ) -> Result<Option<StorageRecord>, StorageError> {
        let Some(mut record) = self.backend.load(&self.resource_id).await? else {
            return Ok(None);
        };
        let Some(slot) = record.items.iter_mut().find(|item| item.id == annotation.id) else {
            return Ok(None);
        };
        *slot = annotation;
        self.backend.save(&record).await?;
        Ok(Some(record))
    }

    async fn delete(&self, id: &str) -> Result<StorageRecord, StorageError> {
        let mut record = self.load_or_empty().await?;
        let before = record.items.len();
        record.items.retain(|item| item.id != id);
        if record.items.len() != before {
            self.backend.save(&record).await?;
            tracing::debug!(resource = %self.resource_id, id, "Deleted annotation");
        }
        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<FinalAnnotation>, StorageError> {
        Ok(self
            .backend
            .load(&self.resource_id)
            .await?
            .and_then(|record| record.find(id).cloned()))
    }

    async fn all(&self) -> Result<Option<StorageRecord>, StorageError> {
        self.backend.load(&self.resource_id).await
    }
}

/// Binds adapters to resource ids over one shared backend
#[derive(Clone)]
pub struct AdapterFactory {
    backend: Arc<dyn RecordBackend>,
    publisher: Option<RdfPublisher>,
}

impl AdapterFactory {
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            backend,
            publisher: None,
        }
    }

    pub fn with_publisher(mut self, publisher: Option<RdfPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    /// Open the backend selected by `config`
    pub async fn open(config: &StorageConfig) -> Result<Self, StorageError> {
        let backend: Arc<dyn RecordBackend> = match config.backend {
            StorageBackendKind::Memory => Arc::new(MemoryBackend::new()),
            StorageBackendKind::File => Arc::new(FileBackend::new(&config.dir)),
            StorageBackendKind::Sqlite => Arc::new(SqliteBackend::connect(&config.database_url).await?),
        };
        tracing::info!(backend = backend.name(), "Opened annotation storage");
        Ok(Self::new(backend))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Whether created records are pushed to a triple store
    pub fn publishes(&self) -> bool {
        self.publisher.is_some()
    }

    pub fn adapter(&self, resource_id: &str) -> RecordAdapter {
        let adapter = RecordAdapter::new(resource_id, Arc::clone(&self.backend));
        match &self.publisher {
            Some(publisher) => adapter.with_publisher(publisher.clone()),
            None => adapter,
        }
    }
}
