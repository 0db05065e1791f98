//! # hiveflow
//!
//! A distributed workflow engine that executes user-defined pipelines
//! expressed as directed acyclic graphs (DAGs) of tasks. A *workflow*
//! bundles one or more DAGs; each DAG is a graph of *tasks* connected by
//! typed data edges; tasks are dispatched to a pool of workers via a job
//! queue and cooperate through a persistent shared store and a
//! request/response signaling bus.
//!
//! The core is the three-level hierarchical scheduler:
//!
//! 1. the [`engine::WorkflowDriver`], which starts DAGs, handles runtime
//!    control requests, and enforces termination;
//! 2. the [`engine::DagExecutor`], which traverses a task graph
//!    breadth-first, honors data-routing slots, skip propagation, and
//!    dynamic successor pruning;
//! 3. the task runner ([`engine::task_runner::run_task`]), which executes
//!    one user task, marshals its inputs and outputs, and interprets its
//!    completion status.
//!
//! Supporting subsystems are exposed only through the contracts the core
//! consumes: the job [`queue`] adapter, the [`store`] document, the
//! [`signal`] request/response bus, and the [`queue::event`] lifecycle
//! stream.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use hiveflow::queue::{event_stream, execute_workflow, InMemoryJobQueue, JobContext};
//! use hiveflow::signal::InMemoryBroker;
//! use hiveflow::store::InMemoryBackend;
//! use hiveflow::workflow::{ChildSpec, DagBlueprint, Parameters, Schema, Workflow};
//!
//! #[tokio::main]
//! async fn main() {
//!     let (events, _receiver) = event_stream(256);
//!     let ctx = JobContext {
//!         store_backend: InMemoryBackend::new(),
//!         broker: Arc::new(InMemoryBroker::new()),
//!         queue: InMemoryJobQueue::new(),
//!         events,
//!         workflow_polling_time: Duration::from_millis(10),
//!         dag_polling_time: Duration::from_millis(10),
//!         signal_polling_time: Duration::from_millis(10),
//!     };
//!
//!     let mut schema = Schema::new();
//!     schema.insert("only".to_string(), ChildSpec::Null);
//!     let workflow = Workflow::new("demo", None, Parameters::default(), vec![
//!         DagBlueprint::new("main", true, schema, HashMap::new()),
//!     ]);
//!
//!     let _outcome = execute_workflow(ctx, workflow, "wf-1".to_string(), HashMap::new(), true).await;
//! }
//! ```

pub mod config;
pub mod engine;
pub mod queue;
pub mod signal;
pub mod store;
pub mod workflow;

pub use config::{Config, ConfigError, GraphConfig, SignalConfig, StoreConfig};
pub use engine::{DagExecutor, ExecutorError, WorkflowDriver, WorkflowError};
pub use queue::{execute_dag, execute_task, execute_workflow, JobContext, JobOutcome, JobQueue};
pub use signal::{Broker, SignalClient, SignalServer};
pub use store::{Section, StoreBackend, StoreHandle};
pub use workflow::{
    Action, DagBlueprint, MultiTaskData, Parameters, Task, TaskContext, TaskData, TaskError,
    TaskStatus, Workflow, WorkflowModule, WorkflowModuleRegistry,
};
