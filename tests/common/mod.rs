//! Shared harness for the end-to-end scenario tests: a fresh in-memory
//! [`JobContext`] plus a handful of reusable task bodies.

use std::sync::Arc;
use std::time::Duration;

use hiveflow::queue::{event_stream, InMemoryJobQueue, JobContext};
use hiveflow::queue::LifecycleEvent;
use hiveflow::signal::InMemoryBroker;
use hiveflow::store::InMemoryBackend;
use hiveflow::workflow::{Action, ClosureTask, Task, TaskError};

pub fn ctx() -> (JobContext, async_channel::Receiver<LifecycleEvent>) {
    let (events, receiver) = event_stream(256);
    let ctx = JobContext {
        store_backend: InMemoryBackend::new(),
        broker: Arc::new(InMemoryBroker::new()),
        queue: InMemoryJobQueue::new(),
        events,
        workflow_polling_time: Duration::from_millis(2),
        dag_polling_time: Duration::from_millis(2),
        signal_polling_time: Duration::from_millis(2),
    };
    (ctx, receiver)
}

/// Returns whatever action it's handed, unchanged.
pub fn passthrough(name: &str) -> Arc<dyn Task> {
    Arc::new(ClosureTask::new(name, |data, _store, _signal, _ctx| {
        Box::pin(async move { Ok(Some(Action::new(std::mem::take(data)))) })
    }))
}

/// Multiplies the default dataset's `value` key by itself.
pub fn square(name: &str) -> Arc<dyn Task> {
    Arc::new(ClosureTask::new(name, |data, _store, _signal, _ctx| {
        Box::pin(async move {
            let current = data
                .default_dataset()
                .get("value")
                .and_then(|v| v.as_i64())
                .unwrap_or(0);
            data.default_dataset_mut()
                .set("value", serde_json::Value::from(current * current));
            Ok(Some(Action::new(std::mem::take(data))))
        })
    }))
}

/// A passthrough task that also flips `ran` to `true`, so tests can assert
/// a task was (or was not) actually dispatched rather than inferring it
/// from the overall job outcome.
pub fn flagging_task(name: &str, ran: Arc<std::sync::Mutex<bool>>) -> Arc<dyn Task> {
    Arc::new(ClosureTask::new(name, move |data, _store, _signal, _ctx| {
        let ran = ran.clone();
        Box::pin(async move {
            *ran.lock().unwrap() = true;
            Ok(Some(Action::new(std::mem::take(data))))
        })
    }))
}

pub fn failing(name: &str, message: &'static str) -> Arc<dyn Task> {
    Arc::new(ClosureTask::new(name, move |_data, _store, _signal, _ctx| {
        Box::pin(async move { Err(TaskError::Failed(message.to_string())) })
    }))
}

pub fn stop_task(name: &str, skip_successors: bool) -> Arc<dyn Task> {
    Arc::new(ClosureTask::new(name, move |_data, _store, _signal, _ctx| {
        Box::pin(async move { Err(TaskError::StopTask { skip_successors }) })
    }))
}

pub fn abort_task(name: &str, message: &'static str) -> Arc<dyn Task> {
    Arc::new(ClosureTask::new(name, move |_data, _store, _signal, _ctx| {
        Box::pin(async move {
            Err(TaskError::AbortWorkflow {
                message: Some(message.to_string()),
            })
        })
    }))
}

/// Starts a copy of `dag_name` as a dynamic sub-DAG and waits for it (and
/// every other DAG) to finish before completing.
pub fn starter(name: &'static str, dag_name: &'static str) -> Arc<dyn Task> {
    Arc::new(ClosureTask::new(name, move |data, _store, signal, _ctx| {
        Box::pin(async move {
            signal
                .start_dag(dag_name, None)
                .await
                .map_err(TaskError::Failed)?;
            signal.join_dags(None).await;
            Ok(Some(Action::new(std::mem::take(data))))
        })
    }))
}
