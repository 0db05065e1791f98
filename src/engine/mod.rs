//! The three-level hierarchical scheduler: workflow driver, DAG executor,
//! task runner (spec.md §4.1–§4.3).

pub mod dag_executor;
pub mod driver;
pub mod error;
pub mod task_runner;

pub use dag_executor::{DagExecutor, TaskJobResult};
pub use driver::WorkflowDriver;
pub use error::{ExecutorError, WorkflowError};
pub use task_runner::{run_task, record_task_meta, TaskOutcome};
