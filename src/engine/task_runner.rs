//! The task runner's `_run` wrapper (spec.md §4.3).
//!
//! Grounded in `lightflow/models/task.py` `BaseTask._run` and
//! `lightflow/queue/jobs.py` `execute_task` for the job-level wiring
//! (fresh store handle, task-level signal client, context snapshot,
//! lifecycle callbacks that also write `meta.log.<dag>.<task>.*`).

use tracing::{info, instrument, warn};

use crate::signal::TaskSignalClient;
use crate::store::{Section, StoreHandle};
use crate::workflow::{Action, MultiTaskData, Task, TaskContext, TaskError, TaskStatus};

/// The outcome of running one task to completion: its terminal status and
/// the action to hand to the DAG executor (`None` for `Stopped`/`Aborted`
/// without `skip_successors`, always `Some` for `Success`).
pub struct TaskOutcome {
    pub status: TaskStatus,
    pub action: Option<Action>,
}

/// Implements `BaseTask._run`: four outcome branches, followed by
/// flatten-in-place and task-history bookkeeping. Any error that is not
/// `StopTask`/`AbortWorkflow` propagates to the caller (the queue
/// framework marks the task job failed), after signalling `stop_workflow`.
#[instrument(skip(task, data, store, signal, context), fields(task = task.name()))]
pub async fn run_task(
    task: &dyn Task,
    data: Option<MultiTaskData>,
    store: &StoreHandle,
    signal: &TaskSignalClient,
    context: &TaskContext,
) -> Result<TaskOutcome, TaskError> {
    let data = data.unwrap_or_else(|| MultiTaskData::for_task(task.name()));

    task.on_init(store, context).await;

    let mut data_mut = data;
    let result = task.run(&mut data_mut, store, signal, context).await;

    let (status, action) = match result {
        Ok(None) => {
            info!("task completed with no explicit action");
            (TaskStatus::Success, Some(Action::new(data_mut)))
        }
        Ok(Some(action)) => (TaskStatus::Success, Some(action)),
        Err(TaskError::StopTask { skip_successors }) => {
            warn!(skip_successors, "task requested stop");
            let action = if skip_successors {
                Some(Action::with_limit(data_mut, vec![]))
            } else {
                None
            };
            (TaskStatus::Stopped, action)
        }
        Err(TaskError::AbortWorkflow { message }) => {
            warn!(?message, "task requested workflow abort");
            signal.stop_workflow().await;
            (TaskStatus::Aborted, None)
        }
        Err(other) => {
            signal.stop_workflow().await;
            task.on_finally(TaskStatus::Error, &data_mut, store, context).await;
            return Err(other);
        }
    };

    task.on_finally(status, &data_mut, store, context).await;

    let action = action.map(|mut action| {
        let mut bundle = action.into_data();
        bundle.flatten();
        bundle.add_task_history(task.name());
        action = Action::new(bundle);
        action
    });

    Ok(TaskOutcome { status, action })
}

/// Writes the per-task duration/worker metadata the job wrapper records
/// on every non-`started` lifecycle callback.
pub async fn record_task_meta(
    store: &StoreHandle,
    dag_name: &str,
    task_name: &str,
    duration_secs: f64,
    worker_hostname: &str,
) -> Result<(), crate::store::StoreError> {
    let base = format!("log.{}.{}", dag_name, task_name);
    store
        .set(
            &format!("{}.duration", base),
            serde_json::Value::from(duration_secs),
            Section::Meta,
        )
        .await?;
    store
        .set(
            &format!("{}.worker", base),
            serde_json::Value::String(worker_hostname.to_string()),
            Section::Meta,
        )
        .await
}
