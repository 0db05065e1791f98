//! The caller's side of the signal bus (spec.md §4.5, Client operation).
//!
//! `send` is synchronous from the caller's perspective but cooperative:
//! it pushes the request, then polls the response key every
//! `polling_time` until it appears, faithfully reproducing the original's
//! poll loop rather than a push-based wakeup.

use std::sync::Arc;
use std::time::Duration;

use crate::signal::broker::Broker;
use crate::signal::request::{Request, Response};

#[derive(Clone)]
pub struct SignalClient {
    broker: Arc<dyn Broker>,
    workflow_id: String,
    polling_time: Duration,
}

impl SignalClient {
    pub fn new(broker: Arc<dyn Broker>, workflow_id: impl Into<String>) -> Self {
        Self {
            broker,
            workflow_id: workflow_id.into(),
            polling_time: Duration::from_millis(10),
        }
    }

    pub fn with_polling_time(mut self, polling_time: Duration) -> Self {
        self.polling_time = polling_time;
        self
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    pub async fn send(&self, request: Request) -> Response {
        let uid = request.uid;
        self.broker.push_request(&self.workflow_id, request).await;
        loop {
            if let Some(response) = self.broker.poll_response(uid).await {
                self.broker.take_response(uid).await;
                return response;
            }
            tokio::time::sleep(self.polling_time).await;
        }
    }
}
