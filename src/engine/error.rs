//! Engine-level error types, mirroring `lightflow/models/exceptions.py`
//! one family per orchestrator level.

use thiserror::Error;

use crate::signal::SignalError;
use crate::store::StoreError;
use crate::workflow::{DagError, ModuleError, ParameterError, TaskError};

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Import(#[from] ModuleError),

    #[error("required workflow argument(s) missing: {0:?}")]
    Argument(Vec<String>),

    #[error(transparent)]
    Dag(#[from] DagError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),
}

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Dag(#[from] DagError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Signal(#[from] SignalError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
