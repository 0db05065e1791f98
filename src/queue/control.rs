//! Read-only introspection over the running job queue.
//!
//! Grounded in `lightflow/queue/control.py` (`BrokerStats`, `QueueStats`,
//! `WorkerStats`, `JobStats`), adapted to introspect the in-memory queue
//! adapter's own bookkeeping instead of a Celery broker.

use std::collections::HashMap;

use crate::queue::adapter::InMemoryJobQueue;

#[derive(Debug, Clone)]
pub struct QueueStats {
    pub name: String,
    pub active_jobs: usize,
}

#[derive(Debug, Clone)]
pub struct BrokerStats {
    pub queues: Vec<QueueStats>,
}

impl BrokerStats {
    pub fn from_queue(queue: &InMemoryJobQueue) -> Self {
        let active: HashMap<String, usize> = queue.active_queues();
        let mut queues: Vec<QueueStats> = active
            .into_iter()
            .map(|(name, active_jobs)| QueueStats { name, active_jobs })
            .collect();
        queues.sort_by(|a, b| a.name.cmp(&b.name));
        Self { queues }
    }

    pub fn total_active(&self) -> usize {
        self.queues.iter().map(|q| q.active_jobs).sum()
    }
}

/// Per-workflow job counts, useful for tests asserting a workflow's jobs
/// have all drained.
#[derive(Debug, Clone, Default)]
pub struct JobStats {
    pub running: usize,
    pub completed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone)]
pub struct WorkerStats {
    pub hostname: String,
    pub active_job_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::adapter::{JobOutcome, JobQueue};
    use serde_json::Value;

    #[tokio::test]
    async fn broker_stats_reflect_active_jobs_per_queue() {
        let queue = InMemoryJobQueue::new();
        let _handle = queue
            .enqueue("task", Box::pin(async { JobOutcome::Success(Value::Null) }))
            .await;
        let stats = BrokerStats::from_queue(&queue);
        assert!(stats.total_active() >= 1);
    }
}
