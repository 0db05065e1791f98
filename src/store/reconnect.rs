//! Reconnect-with-backoff decorator over any [`StoreBackend`].
//!
//! Grounded in `lightflow/models/mongo_proxy.py`'s auto-reconnect proxy:
//! every operation is retried on a transient connectivity error with
//! exponential backoff capped at ten seconds, within a five-minute total
//! budget per call.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::{Duration, Instant};
use tracing::warn;
use uuid::Uuid;

use crate::store::backend::StoreBackend;
use crate::store::error::StoreError;

const BACKOFF_CAP: Duration = Duration::from_secs(10);
const TOTAL_BUDGET: Duration = Duration::from_secs(5 * 60);

/// A connectivity error transient enough to be worth retrying. The inner
/// backend signals this by returning [`StoreError::NotConnected`].
fn is_transient(err: &StoreError) -> bool {
    matches!(err, StoreError::NotConnected)
}

pub struct ReconnectingBackend<B> {
    inner: B,
}

impl<B: StoreBackend> ReconnectingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }

    async fn with_retry<T, F, Fut>(&self, mut op: F) -> Result<T, StoreError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, StoreError>>,
    {
        let deadline = Instant::now() + TOTAL_BUDGET;
        let mut delay = Duration::from_millis(100);
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if is_transient(&err) && Instant::now() < deadline => {
                    warn!(?delay, "store operation failed, retrying");
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(BACKOFF_CAP);
                }
                Err(err) if is_transient(&err) => {
                    return Err(StoreError::ReconnectBudgetExhausted(TOTAL_BUDGET))
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[async_trait]
impl<B: StoreBackend> StoreBackend for ReconnectingBackend<B> {
    async fn exists(&self, workflow_id: &str) -> Result<bool, StoreError> {
        self.with_retry(|| self.inner.exists(workflow_id)).await
    }

    async fn add(&self, workflow_id: &str) -> Result<(), StoreError> {
        self.with_retry(|| self.inner.add(workflow_id)).await
    }

    async fn get_document(&self, workflow_id: &str) -> Result<Map<String, Value>, StoreError> {
        self.with_retry(|| self.inner.get_document(workflow_id)).await
    }

    async fn set_document(
        &self,
        workflow_id: &str,
        document: Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.with_retry(|| self.inner.set_document(workflow_id, document.clone()))
            .await
    }

    async fn remove(&self, workflow_id: &str) -> Result<(), StoreError> {
        self.with_retry(|| self.inner.remove(workflow_id)).await
    }

    async fn put_blob(&self, bytes: Vec<u8>) -> Result<Uuid, StoreError> {
        self.with_retry(|| self.inner.put_blob(bytes.clone())).await
    }

    async fn get_blob(&self, handle: Uuid) -> Result<Vec<u8>, StoreError> {
        self.with_retry(|| self.inner.get_blob(handle)).await
    }

    async fn delete_blob(&self, handle: Uuid) -> Result<(), StoreError> {
        self.with_retry(|| self.inner.delete_blob(handle)).await
    }
}
