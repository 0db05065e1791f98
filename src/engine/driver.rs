//! The workflow driver's `run` loop (spec.md §4.1).
//!
//! Grounded in `lightflow/models/workflow.py` `Workflow.run` for the
//! algorithm and its request-handler dispatch table.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use serde_json::{json, Value};
use tracing::{info, warn};

use crate::engine::error::WorkflowError;
use crate::queue::adapter::{BoxJob, JobHandle, JobQueue};
use crate::queue::r#const::DEFAULT_DAG_QUEUE;
use crate::signal::{Request, Response, SignalServer};
use crate::store::{Section, StoreHandle};
use crate::workflow::{DagBlueprint, MultiTaskData, Workflow};

/// Caps how many queued signal requests the driver services per tick, so a
/// flood of `start_dag` calls can't starve DAG-future bookkeeping.
const MAX_SIGNAL_REQUESTS: usize = 64;

fn seed_bundle(dag_name: &str, data: Option<Value>) -> MultiTaskData {
    let mut bundle = MultiTaskData::for_task(dag_name);
    if let Some(Value::Object(map)) = data {
        for (key, value) in map {
            bundle.default_dataset_mut().set(key, value);
        }
    }
    bundle
}

pub struct WorkflowDriver {
    queue: std::sync::Arc<dyn JobQueue>,
}

impl WorkflowDriver {
    pub fn new(queue: std::sync::Arc<dyn JobQueue>) -> Self {
        Self { queue }
    }

    /// Runs `workflow` to completion. `make_dag_job` builds the boxed
    /// future a DAG job actually executes (captures the DAG executor, the
    /// store backend, the event emitter — everything `queue::jobs::execute_dag`
    /// needs, which this function stays deliberately ignorant of).
    #[allow(clippy::too_many_arguments)]
    pub async fn run<F>(
        &self,
        workflow: &Workflow,
        store: &StoreHandle,
        signal_server: &SignalServer,
        provided_arguments: &HashMap<String, Value>,
        workflow_polling_time: Duration,
        remove_document_on_finish: bool,
        make_dag_job: F,
    ) -> Result<(), WorkflowError>
    where
        F: Fn(DagBlueprint, MultiTaskData) -> BoxJob + Send + Sync,
    {
        let missing = workflow.parameters.check_missing(provided_arguments);
        if !missing.is_empty() {
            return Err(WorkflowError::Argument(missing));
        }
        let consolidated = workflow.parameters.consolidate(provided_arguments)?;
        for (name, value) in &consolidated {
            store.set(name, value.clone(), Section::Data).await?;
        }

        let mut dag_futures: HashMap<String, JobHandle> = HashMap::new();
        let mut stop_flag = false;
        let mut stop_set: HashSet<String> = HashSet::new();

        for dag in workflow.autostart_dags() {
            let copy = dag.copy_with_fresh_name();
            let name = copy.name.clone();
            let bundle = seed_bundle(&name, None);
            let job = self
                .queue
                .enqueue(DEFAULT_DAG_QUEUE, make_dag_job(copy, bundle))
                .await;
            dag_futures.insert(name, job);
        }

        loop {
            tokio::time::sleep(workflow_polling_time).await;

            for _ in 0..MAX_SIGNAL_REQUESTS {
                let Some(request) = signal_server.receive().await else {
                    break;
                };
                self.handle_request(
                    request,
                    workflow,
                    signal_server,
                    &mut dag_futures,
                    &mut stop_flag,
                    &mut stop_set,
                    &make_dag_job,
                )
                .await;
            }

            let finished: Vec<String> = dag_futures
                .iter()
                .filter(|(_, handle)| handle.is_ready() || handle.is_failed())
                .map(|(name, _)| name.clone())
                .collect();
            for name in finished {
                if let Some(handle) = dag_futures.remove(&name) {
                    if handle.is_failed() {
                        warn!(dag = %name, "dag future failed; raising workflow stop flag");
                        stop_flag = true;
                    }
                }
                stop_set.remove(&name);
            }

            if dag_futures.is_empty() {
                break;
            }
        }

        signal_server.clear().await;
        if remove_document_on_finish {
            store.remove().await?;
        }
        info!("workflow run finished");
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    async fn handle_request<F>(
        &self,
        request: Request,
        workflow: &Workflow,
        signal_server: &SignalServer,
        dag_futures: &mut HashMap<String, JobHandle>,
        stop_flag: &mut bool,
        stop_set: &mut HashSet<String>,
        make_dag_job: &F,
    ) where
        F: Fn(DagBlueprint, MultiTaskData) -> BoxJob + Send + Sync,
    {
        match request.action.as_str() {
            "start_dag" => {
                if *stop_flag {
                    signal_server
                        .send(Response::failure(
                            &request,
                            json!({"error": "workflow is stopping"}),
                        ))
                        .await;
                    return;
                }
                let name = request.payload.get("name").and_then(Value::as_str);
                let Some(blueprint) = name.and_then(|n| workflow.dag(n)) else {
                    signal_server
                        .send(Response::failure(&request, json!({"error": "unknown dag"})))
                        .await;
                    return;
                };
                let copy = blueprint.copy_with_fresh_name();
                let dag_name = copy.name.clone();
                let bundle = seed_bundle(&dag_name, request.payload.get("data").cloned());
                let job = self
                    .queue
                    .enqueue(DEFAULT_DAG_QUEUE, make_dag_job(copy, bundle))
                    .await;
                dag_futures.insert(dag_name.clone(), job);
                signal_server
                    .send(Response::success(&request, json!({"dag_name": dag_name})))
                    .await;
            }
            "stop_workflow" => {
                *stop_flag = true;
                for name in dag_futures.keys() {
                    stop_set.insert(name.clone());
                }
                signal_server.send(Response::success(&request, json!({}))).await;
            }
            "stop_dag" => {
                if let Some(name) = request.payload.get("name").and_then(Value::as_str) {
                    stop_set.insert(name.to_string());
                }
                signal_server.send(Response::success(&request, json!({}))).await;
            }
            "is_dag_stopped" => {
                let name = request.payload.get("name").and_then(Value::as_str).unwrap_or_default();
                let is_stopped = *stop_flag || stop_set.contains(name);
                signal_server
                    .send(Response::success(&request, json!({"is_stopped": is_stopped})))
                    .await;
            }
            "join_dags" => {
                let names: Option<Vec<String>> = request
                    .payload
                    .get("names")
                    .and_then(Value::as_array)
                    .map(|arr| arr.iter().filter_map(|v| v.as_str().map(str::to_string)).collect());

                let satisfied = match &names {
                    None => dag_futures.len() <= 1,
                    Some(names) => names.iter().all(|n| !dag_futures.contains_key(n)),
                };
                if satisfied {
                    signal_server.send(Response::success(&request, json!({}))).await;
                } else {
                    signal_server.restore(request).await;
                }
            }
            other => {
                signal_server
                    .send(Response::failure(
                        &request,
                        json!({"error": format!("unknown signal action '{}'", other)}),
                    ))
                    .await;
            }
        }
    }
}
