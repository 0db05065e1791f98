//! Thin convenience wrapper the DAG executor uses to stop the workflow
//! and observe its own stop state.
//!
//! Grounded in `lightflow/models/dag_signal.py`.

use serde_json::json;

use crate::signal::client::SignalClient;
use crate::signal::request::Request;

#[derive(Clone)]
pub struct DagSignalClient {
    client: SignalClient,
    dag_name: String,
}

impl DagSignalClient {
    pub fn new(client: SignalClient, dag_name: impl Into<String>) -> Self {
        Self {
            client,
            dag_name: dag_name.into(),
        }
    }

    pub async fn stop_workflow(&self) {
        self.client.send(Request::new("stop_workflow", json!({}))).await;
    }

    pub async fn is_stopped(&self) -> bool {
        let request = Request::new("is_dag_stopped", json!({ "name": self.dag_name }));
        let response = self.client.send(request).await;
        response
            .payload
            .get("is_stopped")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}
