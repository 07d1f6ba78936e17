//! In-process record storage

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{RecordBackend, StorageError, StorageRecord};

/// Key-value backend holding records in memory
#[derive(Debug, Default)]
pub struct MemoryBackend {
    records: RwLock<HashMap<String, StorageRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

#[async_trait]
impl RecordBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn load(&self, resource_id: &str) -> Result<Option<StorageRecord>, StorageError> {
        Ok(self.records.read().get(resource_id).cloned())
    }

    async fn save(&self, record: &StorageRecord) -> Result<(), StorageError> {
        self.records
            .write()
            .insert(record.id.clone(), record.clone());
        Ok(())
    }
}
