//! Task data bundle and the `Action` a task returns.
//!
//! Grounded in `lightflow/models/task_data.py` (`TaskData`, `MultiTaskData`)
//! and `lightflow/models/action.py` (`Action`). Values are stored as JSON
//! so the bundle composes with the data store document (both use
//! `serde_json::Value`) without a second encoding step.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

/// Errors raised while addressing datasets inside a [`MultiTaskData`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DataError {
    #[error("dataset index {0} is out of range")]
    InvalidIndex(usize),
    #[error("unknown dataset alias '{0}'")]
    InvalidAlias(String),
}

/// A single named dataset: a JSON object plus the list of task names that
/// have contributed to it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskData {
    data: Map<String, Value>,
    task_history: Vec<String>,
}

impl TaskData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn task_history(&self) -> &[String] {
        &self.task_history
    }

    pub fn add_task_history(&mut self, task_name: impl Into<String>) {
        let name = task_name.into();
        if !self.task_history.contains(&name) {
            self.task_history.push(name);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.data.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.data.remove(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Recursive dict merge: nested objects merge key by key, anything
    /// else is overwritten by `other`. Task history lists are unioned.
    pub fn merge(&mut self, other: &TaskData) {
        merge_objects(&mut self.data, &other.data);
        for name in &other.task_history {
            self.add_task_history(name.clone());
        }
    }
}

fn merge_objects(dst: &mut Map<String, Value>, src: &Map<String, Value>) {
    for (key, value) in src {
        match (dst.get_mut(key), value) {
            (Some(Value::Object(dst_obj)), Value::Object(src_obj)) => {
                merge_objects(dst_obj, src_obj);
            }
            _ => {
                dst.insert(key.clone(), value.clone());
            }
        }
    }
}

/// A collection of named/aliased [`TaskData`] datasets with one marked
/// default. This is the value every [`crate::workflow::task::Task`] body
/// receives and returns.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MultiTaskData {
    datasets: Vec<TaskData>,
    aliases: HashMap<String, usize>,
    default_index: usize,
}

impl MultiTaskData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bundle with a single empty dataset, aliased to `task_name`.
    /// This is what the task runner hands a task whose predecessors
    /// produced no data (the first task in a DAG).
    pub fn for_task(task_name: impl Into<String>) -> Self {
        let mut bundle = Self::new();
        bundle.add_dataset(task_name, None, None);
        bundle
    }

    pub fn default_index(&self) -> usize {
        self.default_index
    }

    pub fn default_dataset(&self) -> &TaskData {
        &self.datasets[self.default_index]
    }

    pub fn default_dataset_mut(&mut self) -> &mut TaskData {
        &mut self.datasets[self.default_index]
    }

    pub fn datasets(&self) -> &[TaskData] {
        &self.datasets
    }

    pub fn is_empty(&self) -> bool {
        self.datasets.is_empty()
    }

    /// Append a dataset, registering `task_name` as an alias for it. The
    /// first dataset added becomes the default.
    pub fn add_dataset(
        &mut self,
        task_name: impl Into<String>,
        dataset: Option<TaskData>,
        aliases: Option<Vec<String>>,
    ) -> usize {
        let index = self.datasets.len();
        self.datasets.push(dataset.unwrap_or_default());
        self.aliases.insert(task_name.into(), index);
        if let Some(names) = aliases {
            for name in names {
                self.aliases.insert(name, index);
            }
        }
        if self.datasets.len() == 1 {
            self.default_index = 0;
        }
        index
    }

    pub fn add_alias(&mut self, alias: impl Into<String>, index: usize) -> Result<(), DataError> {
        if index >= self.datasets.len() {
            return Err(DataError::InvalidIndex(index));
        }
        self.aliases.insert(alias.into(), index);
        Ok(())
    }

    pub fn get_by_alias(&self, alias: &str) -> Result<&TaskData, DataError> {
        let index = *self
            .aliases
            .get(alias)
            .ok_or_else(|| DataError::InvalidAlias(alias.to_string()))?;
        self.get_by_index(index)
    }

    pub fn get_by_index(&self, index: usize) -> Result<&TaskData, DataError> {
        self.datasets.get(index).ok_or(DataError::InvalidIndex(index))
    }

    pub fn set_default_by_alias(&mut self, alias: &str) -> Result<(), DataError> {
        let index = *self
            .aliases
            .get(alias)
            .ok_or_else(|| DataError::InvalidAlias(alias.to_string()))?;
        self.set_default_by_index(index)
    }

    pub fn set_default_by_index(&mut self, index: usize) -> Result<(), DataError> {
        if index >= self.datasets.len() {
            return Err(DataError::InvalidIndex(index));
        }
        self.default_index = index;
        Ok(())
    }

    /// Applies to every dataset, not just the default one.
    pub fn add_task_history(&mut self, task_name: impl Into<String>) {
        let name = task_name.into();
        for dataset in &mut self.datasets {
            dataset.add_task_history(name.clone());
        }
    }

    /// Merges every non-default dataset into a fresh accumulator first,
    /// then merges the default dataset last so its keys win on conflict.
    /// All aliases are repointed at the resulting single dataset (index 0).
    pub fn flatten(&mut self) {
        if self.datasets.len() <= 1 {
            return;
        }
        let mut merged = TaskData::new();
        for (index, dataset) in self.datasets.iter().enumerate() {
            if index != self.default_index {
                merged.merge(dataset);
            }
        }
        merged.merge(&self.datasets[self.default_index]);
        self.datasets = vec![merged];
        self.default_index = 0;
        for index in self.aliases.values_mut() {
            *index = 0;
        }
    }
}

/// What a task hands back to the task runner: the (possibly mutated) data
/// bundle, plus an optional "limit set" restricting which successors the
/// DAG executor is allowed to dispatch next.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    data: MultiTaskData,
    limit: Option<Vec<String>>,
}

impl Action {
    pub fn new(data: MultiTaskData) -> Self {
        Self { data, limit: None }
    }

    pub fn with_limit(data: MultiTaskData, limit: Vec<String>) -> Self {
        Self {
            data,
            limit: Some(limit),
        }
    }

    pub fn data(&self) -> &MultiTaskData {
        &self.data
    }

    pub fn into_data(self) -> MultiTaskData {
        self.data
    }

    pub fn limit(&self) -> Option<&[String]> {
        self.limit.as_deref()
    }
}
