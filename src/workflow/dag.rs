//! DAG blueprint and graph schema canonicalisation.
//!
//! Grounded in `lightflow/graphs/graph.py` (`Graph.define`) for the schema
//! shape and `lightflow/models/dag.py` for the acyclicity check; the
//! Kahn's-algorithm-style cycle detection is modeled on the teacher's
//! `engine/workflow_dag.rs` `compute_execution_levels`.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;

use crate::workflow::task::Task;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DagError {
    #[error("dag schema is undefined")]
    SchemaUndefined,
    #[error("graph contains a cycle among: {0:?}")]
    Cyclic(Vec<String>),
    #[error("task '{0}' has a self-loop")]
    SelfLoop(String),
    #[error("edge references unknown task '{0}'")]
    UnknownTask(String),
}

/// One entry of the un-canonicalised schema: what a parent's "children"
/// value looked like before normalisation (spec.md §3 DAG blueprint).
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub enum ChildSpec {
    /// Isolated node: the parent has no children.
    Null,
    Single(String),
    List(Vec<String>),
    /// child -> slot name (empty string normalises to `None`)
    Map(BTreeMap<String, Option<String>>),
}

pub type Schema = BTreeMap<String, ChildSpec>;
pub type CanonicalSchema = BTreeMap<String, BTreeMap<String, Option<String>>>;

/// Normalises a schema into `{parent: {child: slot-or-null}}`.
pub fn canonicalize(schema: &Schema) -> CanonicalSchema {
    let mut out = CanonicalSchema::new();
    for (parent, spec) in schema {
        let children = match spec {
            ChildSpec::Null => BTreeMap::new(),
            ChildSpec::Single(child) => {
                let mut m = BTreeMap::new();
                m.insert(child.clone(), None);
                m
            }
            ChildSpec::List(children) => children.iter().map(|c| (c.clone(), None)).collect(),
            ChildSpec::Map(map) => map
                .iter()
                .map(|(child, slot)| {
                    let slot = slot.as_ref().filter(|s| !s.is_empty()).cloned();
                    (child.clone(), slot)
                })
                .collect(),
        };
        out.insert(parent.clone(), children);
    }
    out
}

/// The runtime graph derived from a canonical schema: vertices are tasks,
/// edges carry an optional slot label.
pub struct Graph {
    tasks: HashMap<String, Arc<dyn Task>>,
    /// parent -> (child -> slot)
    edges: CanonicalSchema,
}

impl Graph {
    /// Builds and validates the graph from a schema and the set of task
    /// implementations it references.
    pub fn build(
        schema: &Schema,
        tasks: HashMap<String, Arc<dyn Task>>,
    ) -> Result<Self, DagError> {
        if schema.is_empty() {
            return Err(DagError::SchemaUndefined);
        }
        let edges = canonicalize(schema);

        for (parent, children) in &edges {
            if !tasks.contains_key(parent) {
                return Err(DagError::UnknownTask(parent.clone()));
            }
            for child in children.keys() {
                if child == parent {
                    return Err(DagError::SelfLoop(parent.clone()));
                }
                if !tasks.contains_key(child) {
                    return Err(DagError::UnknownTask(child.clone()));
                }
            }
        }

        let graph = Self { tasks, edges };
        graph.check_acyclic()?;
        Ok(graph)
    }

    pub fn task(&self, name: &str) -> Option<&Arc<dyn Task>> {
        self.tasks.get(name)
    }

    pub fn task_names(&self) -> impl Iterator<Item = &String> {
        self.tasks.keys()
    }

    pub fn successors(&self, name: &str) -> Vec<(&str, Option<&str>)> {
        self.edges
            .get(name)
            .map(|children| {
                children
                    .iter()
                    .map(|(child, slot)| (child.as_str(), slot.as_deref()))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn predecessors(&self, name: &str) -> Vec<(&str, Option<&str>)> {
        self.edges
            .iter()
            .filter_map(|(parent, children)| {
                children
                    .get(name)
                    .map(|slot| (parent.as_str(), slot.as_deref()))
            })
            .collect()
    }

    /// Tasks with no incoming edges: the scheduler's initial frontier.
    pub fn sources(&self) -> Vec<&str> {
        self.tasks
            .keys()
            .filter(|name| self.predecessors(name).is_empty())
            .map(|s| s.as_str())
            .collect()
    }

    fn check_acyclic(&self) -> Result<(), DagError> {
        let mut in_degree: HashMap<&str, usize> = self
            .tasks
            .keys()
            .map(|name| (name.as_str(), 0usize))
            .collect();
        for children in self.edges.values() {
            for child in children.keys() {
                *in_degree.get_mut(child.as_str()).unwrap() += 1;
            }
        }

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(&name, _)| name)
            .collect();
        let mut processed = 0usize;
        while let Some(name) = queue.pop_front() {
            processed += 1;
            for (child, _) in self.successors(name) {
                let degree = in_degree.get_mut(child).unwrap();
                *degree -= 1;
                if *degree == 0 {
                    queue.push_back(child);
                }
            }
        }

        if processed != self.tasks.len() {
            let remaining: Vec<String> = in_degree
                .into_iter()
                .filter(|(_, deg)| *deg > 0)
                .map(|(name, _)| name.to_string())
                .collect();
            return Err(DagError::Cyclic(remaining));
        }
        Ok(())
    }
}

static DAG_COPY_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A named, reusable DAG definition. `run` operates on a deep copy; the
/// blueprint itself is never mutated (Design Note, §9).
pub struct DagBlueprint {
    pub name: String,
    pub autostart: bool,
    pub schema: Schema,
    tasks: HashMap<String, Arc<dyn Task>>,
}

impl DagBlueprint {
    pub fn new(
        name: impl Into<String>,
        autostart: bool,
        schema: Schema,
        tasks: HashMap<String, Arc<dyn Task>>,
    ) -> Self {
        Self {
            name: name.into(),
            autostart,
            schema,
            tasks,
        }
    }

    pub fn build_graph(&self) -> Result<Graph, DagError> {
        Graph::build(&self.schema, self.tasks.clone())
    }

    /// Produces an independent runtime copy named `<base>:<n>` with a
    /// process-wide monotonically increasing counter per call.
    pub fn copy_with_fresh_name(&self) -> DagBlueprint {
        let n = DAG_COPY_COUNTER.fetch_add(1, Ordering::Relaxed);
        DagBlueprint {
            name: format!("{}:{}", self.name, n),
            autostart: self.autostart,
            schema: self.schema.clone(),
            tasks: self.tasks.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::action::{Action, MultiTaskData};
    use crate::workflow::task::ClosureTask;
    use std::collections::HashMap;

    fn noop_task(name: &str) -> Arc<dyn Task> {
        Arc::new(ClosureTask::new(name, |data, _store, _signal, _ctx| {
            Box::pin(async move { Ok(Some(Action::new(std::mem::take(data)))) })
        }))
    }

    fn tasks(names: &[&str]) -> HashMap<String, Arc<dyn Task>> {
        names
            .iter()
            .map(|n| (n.to_string(), noop_task(n)))
            .collect()
    }

    #[test]
    fn canonicalize_normalises_every_child_spec_shape() {
        let mut schema = Schema::new();
        schema.insert("isolated".into(), ChildSpec::Null);
        schema.insert("single".into(), ChildSpec::Single("b".into()));
        schema.insert("list".into(), ChildSpec::List(vec!["x".into(), "y".into()]));
        let mut map = BTreeMap::new();
        map.insert("m1".into(), Some("slot".into()));
        map.insert("m2".into(), Some("".into()));
        schema.insert("mapped".into(), ChildSpec::Map(map));

        let canon = canonicalize(&schema);
        assert!(canon["isolated"].is_empty());
        assert_eq!(canon["single"]["b"], None);
        assert_eq!(canon["list"]["x"], None);
        assert_eq!(canon["list"]["y"], None);
        assert_eq!(canon["mapped"]["m1"], Some("slot".to_string()));
        // empty-string slot normalises to None
        assert_eq!(canon["mapped"]["m2"], None);
    }

    #[test]
    fn acyclic_linear_chain_builds() {
        let mut schema = Schema::new();
        schema.insert("a".into(), ChildSpec::Single("b".into()));
        schema.insert("b".into(), ChildSpec::Single("c".into()));
        schema.insert("c".into(), ChildSpec::Null);

        let graph = Graph::build(&schema, tasks(&["a", "b", "c"])).unwrap();
        assert_eq!(graph.sources(), vec!["a"]);
    }

    #[test]
    fn cycle_is_rejected() {
        let mut schema = Schema::new();
        schema.insert("a".into(), ChildSpec::Single("b".into()));
        schema.insert("b".into(), ChildSpec::Single("a".into()));

        let err = Graph::build(&schema, tasks(&["a", "b"])).unwrap_err();
        assert!(matches!(err, DagError::Cyclic(_)));
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut schema = Schema::new();
        schema.insert("a".into(), ChildSpec::Single("a".into()));
        let err = Graph::build(&schema, tasks(&["a"])).unwrap_err();
        assert_eq!(err, DagError::SelfLoop("a".to_string()));
    }

    #[test]
    fn empty_schema_is_undefined() {
        let err = Graph::build(&Schema::new(), HashMap::new()).unwrap_err();
        assert_eq!(err, DagError::SchemaUndefined);
    }

    #[test]
    fn copies_get_monotonically_suffixed_names() {
        let blueprint = DagBlueprint::new("main", true, Schema::new(), HashMap::new());
        let c1 = blueprint.copy_with_fresh_name();
        let c2 = blueprint.copy_with_fresh_name();
        assert!(c1.name.starts_with("main:"));
        assert!(c2.name.starts_with("main:"));
        assert_ne!(c1.name, c2.name);
    }
}
