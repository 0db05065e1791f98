//! Job queue adapter contract: submits jobs to a worker pool and reports
//! their outcome, independent of any particular broker/worker framework.
//!
//! Grounded in the handover contract implied throughout spec.md §4
//! ("submit a task job on task.queue") and §4.6.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum JobOutcome {
    Success(Value),
    Failed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobStatus {
    Pending,
    Running,
    Ready,
    Failed,
}

struct JobHandleInner {
    status: JobStatus,
    outcome: Option<JobOutcome>,
}

/// A handle to a submitted job. Orchestrator loops poll this
/// synchronously (no `await`) each tick, matching the "non-blocking
/// queue result check" the workflow driver and DAG executor both do.
#[derive(Clone)]
pub struct JobHandle {
    inner: Arc<Mutex<JobHandleInner>>,
}

impl JobHandle {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(JobHandleInner {
                status: JobStatus::Pending,
                outcome: None,
            })),
        }
    }

    fn mark_running(&self) {
        self.inner.lock().unwrap().status = JobStatus::Running;
    }

    fn complete(&self, outcome: JobOutcome) {
        let mut inner = self.inner.lock().unwrap();
        inner.status = match &outcome {
            JobOutcome::Success(_) => JobStatus::Ready,
            JobOutcome::Failed(_) => JobStatus::Failed,
        };
        inner.outcome = Some(outcome);
    }

    pub fn is_ready(&self) -> bool {
        self.inner.lock().unwrap().status == JobStatus::Ready
    }

    pub fn is_failed(&self) -> bool {
        self.inner.lock().unwrap().status == JobStatus::Failed
    }

    pub fn is_pending(&self) -> bool {
        self.inner.lock().unwrap().status == JobStatus::Pending
    }

    /// `None` until the job reaches a terminal state.
    pub fn outcome(&self) -> Option<JobOutcome> {
        self.inner.lock().unwrap().outcome.clone()
    }
}

pub type BoxJob = Pin<Box<dyn Future<Output = JobOutcome> + Send>>;

#[async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, queue_name: &str, job: BoxJob) -> JobHandle;
}

/// Spawns each job as its own tokio task, fire-and-forget, tracking
/// per-queue active counts for [`crate::queue::control`] introspection.
#[derive(Default)]
pub struct InMemoryJobQueue {
    active: Arc<Mutex<HashMap<String, usize>>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn active_count(&self, queue_name: &str) -> usize {
        self.active.lock().unwrap().get(queue_name).copied().unwrap_or(0)
    }

    pub fn active_queues(&self) -> HashMap<String, usize> {
        self.active.lock().unwrap().clone()
    }

    fn incr(&self, queue_name: &str) {
        *self.active.lock().unwrap().entry(queue_name.to_string()).or_insert(0) += 1;
    }
}

fn decr(active: &Mutex<HashMap<String, usize>>, queue_name: &str) {
    if let Some(count) = active.lock().unwrap().get_mut(queue_name) {
        *count = count.saturating_sub(1);
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, queue_name: &str, job: BoxJob) -> JobHandle {
        let handle = JobHandle::new();
        self.incr(queue_name);

        let handle_for_task = handle.clone();
        let queue_name_owned = queue_name.to_string();
        let active = self.active.clone();
        tokio::spawn(async move {
            handle_for_task.mark_running();
            let outcome = job.await;
            handle_for_task.complete(outcome);
            decr(&active, &queue_name_owned);
        });

        handle
    }
}
