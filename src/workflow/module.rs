//! Workflow module contract and registry.
//!
//! Grounded in `lightflow/models/workflow.py` `Workflow.load`: a module is
//! imported once, its DAG and parameter-list instances are collected, and
//! the module is then dropped from the process import cache so a second
//! load reconstructs fresh state. Dynamic/file-based import is out of
//! scope; a user registers a `WorkflowModule` by name instead.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::workflow::dag::DagBlueprint;
use crate::workflow::parameters::Parameters;

#[derive(Debug, Error)]
pub enum ModuleError {
    #[error("no workflow module registered under '{0}'")]
    NotFound(String),
    #[error("workflow module '{0}' yields no dag blueprints")]
    NoDags(String),
}

/// A workflow module: yields its DAG blueprints and declared parameters.
/// Implementors typically construct fresh blueprints on every call so
/// that dropping the cached instance (mirroring `del sys.modules[name]`)
/// truly starts from scratch next time.
pub trait WorkflowModule: Send + Sync {
    fn build(&self) -> (Vec<DagBlueprint>, Parameters);

    /// Optional human-readable docstring, mirrors `inspect.getdoc`.
    fn docstring(&self) -> Option<String> {
        None
    }
}

/// Registers workflow modules by name. `load` materialises a module's
/// blueprints and then drops the cached instance, so importing the same
/// name twice never aliases state between invocations.
#[derive(Default)]
pub struct WorkflowModuleRegistry {
    modules: Mutex<HashMap<String, Arc<dyn WorkflowModule>>>,
}

impl WorkflowModuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, name: impl Into<String>, module: Arc<dyn WorkflowModule>) {
        self.modules.lock().unwrap().insert(name.into(), module);
    }

    /// Materialises `name`'s blueprints and parameters, requiring at
    /// least one DAG when `strict_dag` is set, then drops the cached
    /// module instance.
    pub fn load(
        &self,
        name: &str,
        strict_dag: bool,
    ) -> Result<(Vec<DagBlueprint>, Parameters, Option<String>), ModuleError> {
        let module = {
            let mut modules = self.modules.lock().unwrap();
            modules
                .remove(name)
                .ok_or_else(|| ModuleError::NotFound(name.to_string()))?
        };
        let (dags, params) = module.build();
        if strict_dag && dags.is_empty() {
            return Err(ModuleError::NoDags(name.to_string()));
        }
        Ok((dags, params, module.docstring()))
    }
}
