//! Storage backend contract: a per-workflow JSON document plus a
//! content-addressed blob table, specified only through the contract the
//! document layer consumes from it (spec.md §3, data store document).

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::store::error::StoreError;

#[async_trait]
pub trait StoreBackend: Send + Sync {
    async fn exists(&self, workflow_id: &str) -> Result<bool, StoreError>;

    /// Creates a fresh, empty document. Errors if `workflow_id` already exists.
    async fn add(&self, workflow_id: &str) -> Result<(), StoreError>;

    async fn get_document(&self, workflow_id: &str) -> Result<Map<String, Value>, StoreError>;

    async fn set_document(
        &self,
        workflow_id: &str,
        document: Map<String, Value>,
    ) -> Result<(), StoreError>;

    async fn remove(&self, workflow_id: &str) -> Result<(), StoreError>;

    async fn put_blob(&self, bytes: Vec<u8>) -> Result<Uuid, StoreError>;
    async fn get_blob(&self, handle: Uuid) -> Result<Vec<u8>, StoreError>;
    async fn delete_blob(&self, handle: Uuid) -> Result<(), StoreError>;
}

/// In-process backend: documents and blobs both live in a guarded
/// `HashMap`. The crate specifies the store only through [`StoreBackend`];
/// a production deployment would back this with a real database instead.
#[derive(Default)]
pub struct InMemoryBackend {
    documents: RwLock<HashMap<String, Map<String, Value>>>,
    blobs: RwLock<HashMap<Uuid, Vec<u8>>>,
}

impl InMemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl StoreBackend for InMemoryBackend {
    async fn exists(&self, workflow_id: &str) -> Result<bool, StoreError> {
        Ok(self.documents.read().await.contains_key(workflow_id))
    }

    async fn add(&self, workflow_id: &str) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        if documents.contains_key(workflow_id) {
            return Err(StoreError::IdExists(workflow_id.to_string()));
        }
        let mut doc = Map::new();
        doc.insert("meta".to_string(), Value::Object(Map::new()));
        doc.insert("data".to_string(), Value::Object(Map::new()));
        documents.insert(workflow_id.to_string(), doc);
        Ok(())
    }

    async fn get_document(&self, workflow_id: &str) -> Result<Map<String, Value>, StoreError> {
        self.documents
            .read()
            .await
            .get(workflow_id)
            .cloned()
            .ok_or_else(|| StoreError::IdInvalid(workflow_id.to_string()))
    }

    async fn set_document(
        &self,
        workflow_id: &str,
        document: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents.write().await;
        if !documents.contains_key(workflow_id) {
            return Err(StoreError::IdInvalid(workflow_id.to_string()));
        }
        documents.insert(workflow_id.to_string(), document);
        Ok(())
    }

    async fn remove(&self, workflow_id: &str) -> Result<(), StoreError> {
        self.documents.write().await.remove(workflow_id);
        Ok(())
    }

    async fn put_blob(&self, bytes: Vec<u8>) -> Result<Uuid, StoreError> {
        let handle = Uuid::new_v4();
        self.blobs.write().await.insert(handle, bytes);
        Ok(handle)
    }

    async fn get_blob(&self, handle: Uuid) -> Result<Vec<u8>, StoreError> {
        self.blobs
            .read()
            .await
            .get(&handle)
            .cloned()
            .ok_or(StoreError::UnknownBlobHandle(handle))
    }

    async fn delete_blob(&self, handle: Uuid) -> Result<(), StoreError> {
        self.blobs.write().await.remove(&handle);
        Ok(())
    }
}
