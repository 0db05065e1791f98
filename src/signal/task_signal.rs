//! Thin convenience wrapper a running task uses to reach the workflow
//! driver: start a sub-DAG, join on DAGs, stop a DAG or the workflow.
//!
//! Grounded in `lightflow/models/task_signal.py`.

use serde_json::json;

use crate::signal::client::SignalClient;
use crate::signal::request::Request;

#[derive(Clone)]
pub struct TaskSignalClient {
    client: SignalClient,
    dag_name: String,
}

impl TaskSignalClient {
    pub fn new(client: SignalClient, dag_name: impl Into<String>) -> Self {
        Self {
            client,
            dag_name: dag_name.into(),
        }
    }

    /// Starts a fresh copy of `dag_name`, returning the runtime name the
    /// driver assigned to it.
    pub async fn start_dag(
        &self,
        dag_name: &str,
        data: Option<serde_json::Value>,
    ) -> Result<String, String> {
        let request = Request::new(
            "start_dag",
            json!({ "name": dag_name, "data": data }),
        );
        let response = self.client.send(request).await;
        if !response.success {
            return Err(response
                .payload
                .get("error")
                .and_then(|v| v.as_str())
                .unwrap_or("start_dag failed")
                .to_string());
        }
        response
            .payload
            .get("dag_name")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| "start_dag response missing dag_name".to_string())
    }

    /// Succeeds once every named DAG (or, if `names` is `None`, every DAG
    /// but the caller's own) has stopped running.
    pub async fn join_dags(&self, names: Option<Vec<String>>) -> bool {
        let request = Request::new("join_dags", json!({ "names": names }));
        self.client.send(request).await.success
    }

    pub async fn stop_dag(&self, name: Option<&str>) -> bool {
        let target = name.unwrap_or(&self.dag_name);
        let request = Request::new("stop_dag", json!({ "name": target }));
        self.client.send(request).await.success
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
