//! The workflow driver's side of the signal bus (spec.md §4.5, Server
//! operations).

use std::sync::Arc;

use crate::signal::broker::Broker;
use crate::signal::request::{Request, Response};

pub struct SignalServer {
    broker: Arc<dyn Broker>,
    workflow_id: String,
}

impl SignalServer {
    pub fn new(broker: Arc<dyn Broker>, workflow_id: impl Into<String>) -> Self {
        Self {
            broker,
            workflow_id: workflow_id.into(),
        }
    }

    /// Pops one pending request, non-blocking.
    pub async fn receive(&self) -> Option<Request> {
        self.broker.pop_request(&self.workflow_id).await
    }

    pub async fn send(&self, response: Response) {
        self.broker.set_response(response).await;
    }

    /// Pushes a deferred request back to the front of the queue so it's
    /// re-examined next tick (used for `join_dags`).
    pub async fn restore(&self, request: Request) {
        self.broker.restore_request(&self.workflow_id, request).await;
    }

    pub async fn clear(&self) {
        self.broker.clear_requests(&self.workflow_id).await;
    }
}
