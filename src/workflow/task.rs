//! Abstract task base and the task runner's `_run` wrapper contract.
//!
//! Grounded in `lightflow/models/task.py` (`BaseTask`, `TaskState`,
//! `TaskStatus`, `_run`) and `lightflow/tasks/task.py` (`PythonTask`, ported
//! here as [`ClosureTask`]).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::signal::{SignalError, TaskSignalClient};
use crate::store::StoreHandle;
use crate::workflow::action::{Action, DataError, MultiTaskData};
use crate::workflow::context::TaskContext;

/// Where a task sits in the DAG executor's scheduling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    Init,
    Waiting,
    Running,
    Completed,
    Stopped,
    Aborted,
}

/// How a task's `run` body concluded, reported to the job queue's
/// lifecycle callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    Success,
    Stopped,
    Aborted,
    Error,
}

/// Raised by a task body, or by the runner wrapping it.
#[derive(Debug, Error)]
pub enum TaskError {
    /// Stop this DAG. `skip_successors = false` lets already-dispatched
    /// successors run to completion; `true` also cancels them.
    #[error("task requested dag stop (skip_successors={skip_successors})")]
    StopTask { skip_successors: bool },

    /// Stop the entire workflow, not just this DAG.
    #[error("task requested workflow abort: {message:?}")]
    AbortWorkflow { message: Option<String> },

    #[error("task failed: {0}")]
    Failed(String),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// A runnable unit of work inside a DAG. Concrete task kinds beyond the
/// generic [`ClosureTask`] adapter are out of scope here; callers embed
/// their own domain logic by implementing this trait.
#[async_trait]
pub trait Task: Send + Sync {
    fn name(&self) -> &str;

    /// Which named worker queue task jobs for this task are submitted to.
    /// Tasks needing a specialised worker pool override this.
    fn queue_name(&self) -> &str {
        "task"
    }

    /// Whether this task must run even if its dag is stopping
    /// (mirrors `BaseTask.force_run`).
    fn force_run(&self) -> bool {
        false
    }

    /// Whether a skip on this task should propagate to its successors
    /// (mirrors `BaseTask.propagate_skip`).
    fn propagate_skip(&self) -> bool {
        true
    }

    /// Called once before `run`, mirrors `BaseTask.callback_init`. Default
    /// is a no-op; most tasks have nothing to set up.
    async fn on_init(&self, _store: &StoreHandle, _context: &TaskContext) {}

    /// Called once after `run` concludes, regardless of outcome, mirrors
    /// `BaseTask.callback_finally`. Default is a no-op.
    async fn on_finally(
        &self,
        _status: TaskStatus,
        _data: &MultiTaskData,
        _store: &StoreHandle,
        _context: &TaskContext,
    ) {
    }

    async fn run(
        &self,
        data: &mut MultiTaskData,
        store: &StoreHandle,
        signal: &TaskSignalClient,
        context: &TaskContext,
    ) -> Result<Option<Action>, TaskError>;
}

/// Adapts a plain async closure into a [`Task`], mirroring the original's
/// lightest-weight task kind (`PythonTask`). Used throughout the test
/// suite in place of hand-rolling a struct per test.
pub struct ClosureTask<F> {
    name: String,
    force_run: bool,
    propagate_skip: bool,
    body: F,
}

impl<F> ClosureTask<F> {
    pub fn new(name: impl Into<String>, body: F) -> Self {
        Self {
            name: name.into(),
            force_run: false,
            propagate_skip: true,
            body,
        }
    }

    pub fn with_force_run(mut self, force_run: bool) -> Self {
        self.force_run = force_run;
        self
    }

    pub fn with_propagate_skip(mut self, propagate_skip: bool) -> Self {
        self.propagate_skip = propagate_skip;
        self
    }
}

#[async_trait]
impl<F> Task for ClosureTask<F>
where
    F: Send
        + Sync
        + for<'a> Fn(
            &'a mut MultiTaskData,
            &'a StoreHandle,
            &'a TaskSignalClient,
            &'a TaskContext,
        ) -> futures::future::BoxFuture<'a, Result<Option<Action>, TaskError>>,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn force_run(&self) -> bool {
        self.force_run
    }

    fn propagate_skip(&self) -> bool {
        self.propagate_skip
    }

    async fn run(
        &self,
        data: &mut MultiTaskData,
        store: &StoreHandle,
        signal: &TaskSignalClient,
        context: &TaskContext,
    ) -> Result<Option<Action>, TaskError> {
        (self.body)(data, store, signal, context).await
    }
}

/// Queue-job-handle accessors a task carries once dispatched, mirroring
/// `BaseTask.celery_pending` / `celery_completed` / `celery_failed` /
/// `celery_state` so callers can inspect queue status without reaching
/// into the queue adapter directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy)]
pub struct JobHandle {
    state: JobState,
}

impl JobHandle {
    pub fn new(state: JobState) -> Self {
        Self { state }
    }

    pub fn set_state(&mut self, state: JobState) {
        self.state = state;
    }

    pub fn is_pending(&self) -> bool {
        self.state == JobState::Pending
    }

    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }

    pub fn is_failed(&self) -> bool {
        self.state == JobState::Failed
    }

    pub fn state_label(&self) -> &'static str {
        match self.state {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
        }
    }
}
