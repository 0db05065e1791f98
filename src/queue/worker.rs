//! Worker-shutdown hook: on termination, broadcast `stop_workflow` for
//! every workflow id this worker was actively processing.
//!
//! Grounded in `lightflow/workers.py`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use crate::signal::{Broker, SignalClient};

#[derive(Default)]
pub struct Worker {
    active_workflow_ids: Mutex<HashSet<String>>,
}

impl Worker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Called when a job for `workflow_id` starts processing on this worker.
    pub fn track(&self, workflow_id: &str) {
        self.active_workflow_ids
            .lock()
            .unwrap()
            .insert(workflow_id.to_string());
    }

    /// Called when a job for `workflow_id` finishes on this worker.
    pub fn untrack(&self, workflow_id: &str) {
        self.active_workflow_ids.lock().unwrap().remove(workflow_id);
    }

    pub fn active_workflow_ids(&self) -> Vec<String> {
        self.active_workflow_ids.lock().unwrap().iter().cloned().collect()
    }

    /// Sends `stop_workflow` on every distinct active workflow id's
    /// signal channel before the worker process exits.
    pub async fn shutdown(&self, broker: Arc<dyn Broker>) {
        for workflow_id in self.active_workflow_ids() {
            let client = SignalClient::new(broker.clone(), workflow_id.clone());
            client
                .send(crate::signal::Request::new(
                    "stop_workflow",
                    serde_json::json!({}),
                ))
                .await;
        }
    }
}
