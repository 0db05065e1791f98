//! Broker transport for the signal bus.
//!
//! Grounded in spec.md §4.5: a broker list keyed by `lightflow:<workflow_id>`
//! holds pending requests FIFO, and a key `lightflow:<request_uid>` holds
//! each response until the client collects it. [`InMemoryBroker`]
//! reproduces this polling protocol in-process rather than substituting a
//! push-based notification (Design Note §9, "Signalling").

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::signal::request::{Request, Response};

fn request_key(workflow_id: &str) -> String {
    format!("lightflow:{}", workflow_id)
}

#[async_trait]
pub trait Broker: Send + Sync {
    async fn push_request(&self, workflow_id: &str, request: Request);
    async fn restore_request(&self, workflow_id: &str, request: Request);
    async fn pop_request(&self, workflow_id: &str) -> Option<Request>;
    async fn clear_requests(&self, workflow_id: &str);

    async fn set_response(&self, response: Response);
    /// Non-blocking poll: `None` if the response isn't set yet.
    async fn poll_response(&self, request_id: Uuid) -> Option<Response>;
    async fn take_response(&self, request_id: Uuid) -> Option<Response>;
}

#[derive(Default)]
pub struct InMemoryBroker {
    requests: Mutex<HashMap<String, VecDeque<Request>>>,
    responses: Mutex<HashMap<Uuid, Response>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Broker for InMemoryBroker {
    async fn push_request(&self, workflow_id: &str, request: Request) {
        self.requests
            .lock()
            .await
            .entry(request_key(workflow_id))
            .or_default()
            .push_back(request);
    }

    async fn restore_request(&self, workflow_id: &str, request: Request) {
        self.requests
            .lock()
            .await
            .entry(request_key(workflow_id))
            .or_default()
            .push_front(request);
    }

    async fn pop_request(&self, workflow_id: &str) -> Option<Request> {
        self.requests
            .lock()
            .await
            .get_mut(&request_key(workflow_id))
            .and_then(|queue| queue.pop_front())
    }

    async fn clear_requests(&self, workflow_id: &str) {
        self.requests.lock().await.remove(&request_key(workflow_id));
    }

    async fn set_response(&self, response: Response) {
        self.responses.lock().await.insert(response.uid, response);
    }

    async fn poll_response(&self, request_id: Uuid) -> Option<Response> {
        self.responses.lock().await.get(&request_id).cloned()
    }

    async fn take_response(&self, request_id: Uuid) -> Option<Response> {
        self.responses.lock().await.remove(&request_id)
    }
}
