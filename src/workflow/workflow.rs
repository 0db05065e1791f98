//! The materialised workflow: its DAG blueprints and declared parameters.
//!
//! Grounded in `lightflow/models/workflow.py` `Workflow`. Runtime-only
//! state (in-flight DAG handles, the stop flag, the per-DAG stop set) is
//! owned by [`crate::engine::driver::WorkflowDriver`] instead of this
//! struct, since it only exists for the duration of one `run` — mirrors
//! the spec's framing of `run` as "called exactly once per invocation".

use std::collections::HashMap;

use crate::workflow::dag::DagBlueprint;
use crate::workflow::parameters::Parameters;

pub struct Workflow {
    pub name: String,
    pub docstring: Option<String>,
    pub parameters: Parameters,
    dags: HashMap<String, DagBlueprint>,
}

impl Workflow {
    pub fn new(
        name: impl Into<String>,
        docstring: Option<String>,
        parameters: Parameters,
        dags: Vec<DagBlueprint>,
    ) -> Self {
        Self {
            name: name.into(),
            docstring,
            parameters,
            dags: dags.into_iter().map(|d| (d.name.clone(), d)).collect(),
        }
    }

    pub fn dag(&self, name: &str) -> Option<&DagBlueprint> {
        self.dags.get(name)
    }

    pub fn autostart_dags(&self) -> impl Iterator<Item = &DagBlueprint> {
        self.dags.values().filter(|d| d.autostart)
    }

    pub fn dag_names(&self) -> impl Iterator<Item = &String> {
        self.dags.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::dag::Schema;
    use std::collections::HashMap as StdHashMap;

    #[test]
    fn autostart_dags_filters_by_flag() {
        let a = DagBlueprint::new("a", true, Schema::new(), StdHashMap::new());
        let b = DagBlueprint::new("b", false, Schema::new(), StdHashMap::new());
        let workflow = Workflow::new("wf", None, Parameters::default(), vec![a, b]);
        let names: Vec<&str> = workflow
            .autostart_dags()
            .map(|d| d.name.as_str())
            .collect();
        assert_eq!(names, vec!["a"]);
    }
}
