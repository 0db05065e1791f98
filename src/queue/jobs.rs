//! The three job entry points the worker framework registers:
//! `execute_workflow`, `execute_dag`, `execute_task` (spec.md §4.6).
//!
//! Grounded in `lightflow/queue/jobs.py`. Each wraps one level of the
//! hierarchical scheduler (`WorkflowDriver`/`DagExecutor`/`run_task`),
//! opens its own data store handle, builds its own signal client, and
//! emits `started`/`succeeded`/`stopped`/`aborted` lifecycle events the
//! way §4.6 specifies.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::instrument;

use crate::engine::dag_executor::TaskJobResult;
use crate::engine::task_runner::{record_task_meta, run_task};
use crate::engine::{DagExecutor, WorkflowDriver};
use crate::queue::adapter::{BoxJob, JobOutcome, JobQueue};
use crate::queue::r#const::{EventKind, JobType};
use crate::queue::event::{EventEmitter, LifecycleEvent};
use crate::signal::{Broker, SignalClient, SignalServer, TaskSignalClient};
use crate::store::{Section, StoreBackend, StoreHandle};
use crate::workflow::{DagBlueprint, MultiTaskData, Task, TaskContext, TaskStatus, Workflow};

/// Everything the three job entry points need but stay ignorant of their
/// caller's wiring: the store backend, the signal broker, the queue they
/// submit nested jobs to, the event sink, and the orchestrator polling
/// intervals (mirrors `config.graph.*`/`config.signal.polling_time`).
#[derive(Clone)]
pub struct JobContext {
    pub store_backend: Arc<dyn StoreBackend>,
    pub broker: Arc<dyn Broker>,
    pub queue: Arc<dyn JobQueue>,
    pub events: EventEmitter,
    pub workflow_polling_time: Duration,
    pub dag_polling_time: Duration,
    pub signal_polling_time: Duration,
}

fn hostname() -> String {
    gethostname::gethostname().to_string_lossy().into_owned()
}

fn emit(ctx: &JobContext, kind: EventKind, job_type: JobType, name: &str, workflow_id: &str, duration: Option<f64>) {
    ctx.events.emit(LifecycleEvent::new(
        kind,
        job_type,
        name,
        workflow_id,
        hostname(),
        duration,
    ));
}

/// Runs one task to completion: opens a fresh store handle, builds a
/// task-level signal client bound to `workflow_id`/`dag_name`, records
/// `meta.log.<dag>.<task>.{duration,worker}`, and reports the outcome as
/// a [`JobOutcome`] carrying a serialised [`TaskJobResult`].
#[instrument(skip(ctx, task, data), fields(task = task.name()))]
pub async fn execute_task(
    ctx: JobContext,
    task: Arc<dyn Task>,
    workflow_id: String,
    workflow_name: String,
    dag_name: String,
    data: MultiTaskData,
) -> JobOutcome {
    let host = hostname();
    emit(&ctx, EventKind::Started, JobType::Task, task.name(), &workflow_id, None);

    let store = match StoreHandle::open(ctx.store_backend.clone(), workflow_id.clone()).await {
        Ok(store) => store,
        Err(e) => return JobOutcome::Failed(e.to_string()),
    };
    let signal = TaskSignalClient::new(
        SignalClient::new(ctx.broker.clone(), workflow_id.clone())
            .with_polling_time(ctx.signal_polling_time),
        dag_name.clone(),
    );
    let context = TaskContext::new(task.name(), &dag_name, &workflow_name, &workflow_id, &host);

    let start = Instant::now();
    let result = run_task(task.as_ref(), Some(data), &store, &signal, &context).await;
    let duration = start.elapsed().as_secs_f64();

    if let Err(e) = record_task_meta(&store, &dag_name, task.name(), duration, &host).await {
        tracing::warn!(error = %e, "failed to record task meta");
    }

    match result {
        Ok(outcome) => {
            let kind = match outcome.status {
                TaskStatus::Success => EventKind::Succeeded,
                TaskStatus::Stopped => EventKind::Stopped,
                TaskStatus::Aborted => EventKind::Aborted,
                TaskStatus::Error => EventKind::Aborted,
            };
            emit(&ctx, kind, JobType::Task, task.name(), &workflow_id, Some(duration));
            let payload = TaskJobResult {
                status: outcome.status,
                action: outcome.action,
            };
            match serde_json::to_value(payload) {
                Ok(value) => JobOutcome::Success(value),
                Err(e) => JobOutcome::Failed(e.to_string()),
            }
        }
        Err(e) => {
            emit(&ctx, EventKind::Aborted, JobType::Task, task.name(), &workflow_id, Some(duration));
            JobOutcome::Failed(e.to_string())
        }
    }
}

/// Runs one DAG to completion via [`DagExecutor`], wiring its task jobs
/// back through [`execute_task`].
#[instrument(skip(ctx, blueprint, data), fields(dag = %blueprint.name))]
pub async fn execute_dag(
    ctx: JobContext,
    blueprint: DagBlueprint,
    workflow_id: String,
    workflow_name: String,
    data: MultiTaskData,
) -> JobOutcome {
    let dag_name = blueprint.name.clone();
    emit(&ctx, EventKind::Started, JobType::Dag, &dag_name, &workflow_id, None);

    let graph = match blueprint.build_graph() {
        Ok(graph) => graph,
        Err(e) => {
            emit(&ctx, EventKind::Aborted, JobType::Dag, &dag_name, &workflow_id, None);
            return JobOutcome::Failed(e.to_string());
        }
    };

    let dag_signal = crate::signal::DagSignalClient::new(
        SignalClient::new(ctx.broker.clone(), workflow_id.clone())
            .with_polling_time(ctx.signal_polling_time),
        dag_name.clone(),
    );

    let executor = DagExecutor::new(ctx.queue.clone());
    let start = Instant::now();

    let task_ctx = ctx.clone();
    let task_workflow_id = workflow_id.clone();
    let task_workflow_name = workflow_name.clone();
    let task_dag_name = dag_name.clone();
    let make_task_job = move |task: Arc<dyn Task>, input: MultiTaskData| -> BoxJob {
        let ctx = task_ctx.clone();
        let workflow_id = task_workflow_id.clone();
        let workflow_name = task_workflow_name.clone();
        let dag_name = task_dag_name.clone();
        Box::pin(async move {
            execute_task(ctx, task, workflow_id, workflow_name, dag_name, input).await
        })
    };

    let result = executor
        .run(graph, dag_signal, data, ctx.dag_polling_time, make_task_job)
        .await;
    let duration = start.elapsed().as_secs_f64();

    match result {
        Ok(()) => {
            emit(&ctx, EventKind::Succeeded, JobType::Dag, &dag_name, &workflow_id, Some(duration));
            JobOutcome::Success(serde_json::Value::Null)
        }
        Err(e) => {
            emit(&ctx, EventKind::Aborted, JobType::Dag, &dag_name, &workflow_id, Some(duration));
            JobOutcome::Failed(e.to_string())
        }
    }
}

/// Runs one workflow to completion via [`WorkflowDriver`], wiring its DAG
/// jobs back through [`execute_dag`].
#[instrument(skip(ctx, workflow, provided_arguments), fields(workflow = %workflow.name))]
pub async fn execute_workflow(
    ctx: JobContext,
    workflow: Workflow,
    workflow_id: String,
    provided_arguments: std::collections::HashMap<String, serde_json::Value>,
    remove_document_on_finish: bool,
) -> JobOutcome {
    let workflow_name = workflow.name.clone();
    emit(&ctx, EventKind::Started, JobType::Workflow, &workflow_name, &workflow_id, None);

    let store = match StoreHandle::open(ctx.store_backend.clone(), workflow_id.clone()).await {
        Ok(store) => store,
        Err(e) => return JobOutcome::Failed(e.to_string()),
    };
    if let Err(e) = store.set("name", serde_json::Value::String(workflow_name.clone()), Section::Meta).await {
        return JobOutcome::Failed(e.to_string());
    }
    if let Err(e) = store
        .set(
            "start_time",
            serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            Section::Meta,
        )
        .await
    {
        return JobOutcome::Failed(e.to_string());
    }

    let signal_server = SignalServer::new(ctx.broker.clone(), workflow_id.clone());
    let driver = WorkflowDriver::new(ctx.queue.clone());

    let dag_ctx = ctx.clone();
    let dag_workflow_id = workflow_id.clone();
    let dag_workflow_name = workflow_name.clone();
    let make_dag_job = move |blueprint: DagBlueprint, input: MultiTaskData| -> BoxJob {
        let ctx = dag_ctx.clone();
        let workflow_id = dag_workflow_id.clone();
        let workflow_name = dag_workflow_name.clone();
        Box::pin(async move { execute_dag(ctx, blueprint, workflow_id, workflow_name, input).await })
    };

    let start = Instant::now();
    let result = driver
        .run(
            &workflow,
            &store,
            &signal_server,
            &provided_arguments,
            ctx.workflow_polling_time,
            remove_document_on_finish,
            make_dag_job,
        )
        .await;
    let duration = start.elapsed().as_secs_f64();

    match result {
        Ok(()) => {
            emit(&ctx, EventKind::Succeeded, JobType::Workflow, &workflow_name, &workflow_id, Some(duration));
            JobOutcome::Success(serde_json::Value::Null)
        }
        Err(e) => {
            emit(&ctx, EventKind::Aborted, JobType::Workflow, &workflow_name, &workflow_id, Some(duration));
            JobOutcome::Failed(e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::adapter::InMemoryJobQueue;
    use crate::queue::event::event_stream;
    use crate::signal::InMemoryBroker;
    use crate::store::InMemoryBackend;
    use crate::workflow::{Action, ChildSpec, ClosureTask, Parameters, Schema};
    use std::collections::HashMap;

    fn ctx() -> (JobContext, async_channel::Receiver<LifecycleEvent>) {
        let (emitter, receiver) = event_stream(64);
        let ctx = JobContext {
            store_backend: InMemoryBackend::new(),
            broker: Arc::new(InMemoryBroker::new()),
            queue: InMemoryJobQueue::new(),
            events: emitter,
            workflow_polling_time: Duration::from_millis(1),
            dag_polling_time: Duration::from_millis(1),
            signal_polling_time: Duration::from_millis(1),
        };
        (ctx, receiver)
    }

    fn squares_task(name: &str) -> Arc<dyn Task> {
        Arc::new(ClosureTask::new(name, |data, _store, _signal, _ctx| {
            Box::pin(async move {
                let current = data
                    .default_dataset()
                    .get("value")
                    .and_then(|v| v.as_i64())
                    .unwrap_or(0);
                data.default_dataset_mut().set("value", serde_json::Value::from(current * current));
                Ok(Some(Action::new(std::mem::take(data))))
            })
        }))
    }

    #[tokio::test]
    async fn execute_task_reports_success_and_emits_lifecycle_events() {
        let (ctx, events) = ctx();
        let task = squares_task("square");
        let mut data = MultiTaskData::for_task("square");
        data.default_dataset_mut().set("value", serde_json::Value::from(5));

        let outcome = execute_task(
            ctx,
            task,
            "wf-1".to_string(),
            "wf".to_string(),
            "dag-1".to_string(),
            data,
        )
        .await;

        let result: TaskJobResult = match outcome {
            JobOutcome::Success(v) => serde_json::from_value(v).unwrap(),
            JobOutcome::Failed(e) => panic!("task failed: {e}"),
        };
        assert_eq!(result.status, TaskStatus::Success);
        let action = result.action.unwrap();
        assert_eq!(action.data().default_dataset().get("value"), Some(&serde_json::Value::from(25)));

        assert_eq!(events.recv().await.unwrap().event_type, "task-lightflow-started");
        assert_eq!(events.recv().await.unwrap().event_type, "task-lightflow-succeeded");
    }

    #[tokio::test]
    async fn execute_dag_runs_a_linear_chain_to_completion() {
        let (ctx, _events) = ctx();
        let mut schema = Schema::new();
        schema.insert("a".into(), ChildSpec::Single("b".into()));
        schema.insert("b".into(), ChildSpec::Null);
        let mut tasks: HashMap<String, Arc<dyn Task>> = HashMap::new();
        tasks.insert("a".into(), squares_task("a"));
        tasks.insert("b".into(), squares_task("b"));
        let blueprint = DagBlueprint::new("main", true, schema, tasks);

        let mut data = MultiTaskData::for_task("main");
        data.default_dataset_mut().set("value", serde_json::Value::from(3));

        let outcome = execute_dag(ctx, blueprint, "wf-1".to_string(), "wf".to_string(), data).await;
        assert!(matches!(outcome, JobOutcome::Success(_)));
    }

    #[tokio::test]
    async fn execute_workflow_writes_meta_and_runs_autostart_dags() {
        let (ctx, _events) = ctx();
        let store_backend = ctx.store_backend.clone();

        let mut schema = Schema::new();
        schema.insert("only".into(), ChildSpec::Null);
        let mut tasks: HashMap<String, Arc<dyn Task>> = HashMap::new();
        tasks.insert("only".into(), squares_task("only"));
        let blueprint = DagBlueprint::new("main", true, schema, tasks);
        let workflow = Workflow::new("wf", None, Parameters::default(), vec![blueprint]);

        let outcome = execute_workflow(ctx, workflow, "wf-1".to_string(), HashMap::new(), false).await;
        assert!(matches!(outcome, JobOutcome::Success(_)));

        let name = store_backend
            .get_document("wf-1")
            .await
            .unwrap()
            .get("meta")
            .and_then(|m| m.get("name"))
            .cloned();
        assert_eq!(name, Some(serde_json::Value::String("wf".to_string())));
    }
}
