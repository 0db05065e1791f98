//! Workflow data model: DAG blueprints, task data bundles, parameters and
//! the module/registry contract used to materialise a [`Workflow`].

pub mod action;
pub mod context;
pub mod dag;
pub mod module;
pub mod parameters;
pub mod task;
pub mod workflow;

pub use action::{Action, DataError, MultiTaskData, TaskData};
pub use context::TaskContext;
pub use dag::{CanonicalSchema, ChildSpec, DagBlueprint, DagError, Graph, Schema};
pub use module::{ModuleError, WorkflowModule, WorkflowModuleRegistry};
pub use parameters::{
    ParamType, ParameterError, ParameterSpec, Parameters, TaskParameter, TaskParameters,
};
pub use task::{ClosureTask, JobHandle, JobState, Task, TaskError, TaskState, TaskStatus};
pub use workflow::Workflow;
