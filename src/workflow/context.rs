//! Read-only identity context handed to a running task.
//!
//! Grounded in `lightflow/models/task_context.py`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskContext {
    pub task_name: String,
    pub dag_name: String,
    pub workflow_name: String,
    pub workflow_id: String,
    pub worker_hostname: String,
}

impl TaskContext {
    pub fn new(
        task_name: impl Into<String>,
        dag_name: impl Into<String>,
        workflow_name: impl Into<String>,
        workflow_id: impl Into<String>,
        worker_hostname: impl Into<String>,
    ) -> Self {
        Self {
            task_name: task_name.into(),
            dag_name: dag_name.into(),
            workflow_name: workflow_name.into(),
            workflow_id: workflow_id.into(),
            worker_hostname: worker_hostname.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_carries_all_identity_fields() {
        let ctx = TaskContext::new("task", "dag", "wf", "wf-1", "host-1");
        assert_eq!(ctx.task_name, "task");
        assert_eq!(ctx.workflow_id, "wf-1");
    }
}
