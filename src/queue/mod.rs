//! Job queue adapter contract, lifecycle events, worker-shutdown hook and
//! the three job entry points registered with the external worker
//! framework (spec.md §4.6).

pub mod adapter;
pub mod r#const;
pub mod control;
pub mod event;
pub mod jobs;
pub mod worker;

pub use adapter::{BoxJob, InMemoryJobQueue, JobHandle, JobOutcome, JobQueue};
pub use jobs::{execute_dag, execute_task, execute_workflow, JobContext};
pub use r#const::{EventKind, JobType, DEFAULT_DAG_QUEUE, DEFAULT_TASK_QUEUE, DEFAULT_WORKFLOW_QUEUE};
pub use control::{BrokerStats, JobStats, QueueStats, WorkerStats};
pub use event::{event_stream, EventEmitter, LifecycleEvent};
pub use worker::Worker;
