//! Job and event taxonomy constants.
//!
//! Grounded in `lightflow/queue/const.py` (`JobExecPath`, `JobType`,
//! `JobEventName`), extended to the full four-event taxonomy spec.md §6
//! describes (the original only defined `Started`/`Succeeded`).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Workflow,
    Dag,
    Task,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Workflow => "workflow",
            JobType::Dag => "dag",
            JobType::Task => "task",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Started,
    Succeeded,
    Stopped,
    Aborted,
}

impl EventKind {
    pub fn event_name(&self) -> &'static str {
        match self {
            EventKind::Started => "task-lightflow-started",
            EventKind::Succeeded => "task-lightflow-succeeded",
            EventKind::Stopped => "task-lightflow-stopped",
            EventKind::Aborted => "task-lightflow-aborted",
        }
    }
}

/// Default queue names; tasks/DAGs may override these to route to
/// specialised worker pools.
pub const DEFAULT_WORKFLOW_QUEUE: &str = "workflow";
pub const DEFAULT_DAG_QUEUE: &str = "dag";
pub const DEFAULT_TASK_QUEUE: &str = "task";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_match_the_lifecycle_taxonomy() {
        assert_eq!(EventKind::Started.event_name(), "task-lightflow-started");
        assert_eq!(EventKind::Succeeded.event_name(), "task-lightflow-succeeded");
        assert_eq!(EventKind::Stopped.event_name(), "task-lightflow-stopped");
        assert_eq!(EventKind::Aborted.event_name(), "task-lightflow-aborted");
    }
}
