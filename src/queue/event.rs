//! Lifecycle event stream: a bounded, lossy-on-overflow fan-out so a slow
//! consumer can never block a producer (Design Note §9, "Event stream").
//!
//! Grounded in `lightflow/queue/event.py` (`event_stream`) and
//! `lightflow/queue/models.py` (`JobEvent` and friends) for the payload
//! shape; the transport itself is `async_channel`, already the teacher's
//! dependency for its own event system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::queue::r#const::{EventKind, JobType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub uuid: Uuid,
    pub job_type: JobType,
    pub event_type: String,
    pub hostname: String,
    pub pid: u32,
    pub name: String,
    pub workflow_id: String,
    pub time: DateTime<Utc>,
    pub duration: Option<f64>,
}

impl LifecycleEvent {
    pub fn new(
        kind: EventKind,
        job_type: JobType,
        name: impl Into<String>,
        workflow_id: impl Into<String>,
        hostname: impl Into<String>,
        duration: Option<f64>,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            job_type,
            event_type: kind.event_name().to_string(),
            hostname: hostname.into(),
            pid: std::process::id(),
            name: name.into(),
            workflow_id: workflow_id.into(),
            time: Utc::now(),
            duration,
        }
    }
}

/// Producer handle: `send` never blocks, and silently drops the event if
/// the bounded channel is full (the receiver is too slow).
#[derive(Clone)]
pub struct EventEmitter {
    sender: async_channel::Sender<LifecycleEvent>,
}

impl EventEmitter {
    pub fn emit(&self, event: LifecycleEvent) {
        if self.sender.try_send(event).is_err() {
            tracing::warn!("event stream overflowed; dropping event");
        }
    }
}

pub fn event_stream(capacity: usize) -> (EventEmitter, async_channel::Receiver<LifecycleEvent>) {
    let (sender, receiver) = async_channel::bounded(capacity);
    (EventEmitter { sender }, receiver)
}
