//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the publish/subscribe hub for [`JobEvent`]s. The
//! generator publishes one event per job mutation, after the mutation has
//! been persisted; the shell subscribes to render status text.

use chrono::{DateTime, Utc};
use crush_core::types::JobId;
use crush_core::{GenerationJob, JobStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// JobEvent
// ---------------------------------------------------------------------------

/// Event type for an intermediate progress update.
pub const EVENT_JOB_PROGRESS: &str = "job.progress";
/// Event type for a successful completion.
pub const EVENT_JOB_COMPLETED: &str = "job.completed";
/// Event type for a failure (including cancellation).
pub const EVENT_JOB_FAILED: &str = "job.failed";

/// A state change of a generation job.
///
/// Carries the displayable fields only; source photos stay with the job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobEvent {
    /// Dot-separated event name, one of the `EVENT_JOB_*` constants.
    pub event_type: String,
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: String,
    pub video_url: Option<String>,
    /// When the event was created (UTC).
    pub timestamp: DateTime<Utc>,
}

impl JobEvent {
    /// Snapshot the displayable state of `job`.
    pub fn from_job(job: &GenerationJob) -> Self {
        let event_type = match job.status {
            JobStatus::Pending => EVENT_JOB_PROGRESS,
            JobStatus::Completed => EVENT_JOB_COMPLETED,
            JobStatus::Error => EVENT_JOB_FAILED,
        };
        Self {
            event_type: event_type.to_string(),
            job_id: job.id.clone(),
            status: job.status,
            progress: job.progress.clone(),
            video_url: job.video_url.clone(),
            timestamp: Utc::now(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 256;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`JobEvent`].
pub struct EventBus {
    sender: broadcast::Sender<JobEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full, the oldest un-consumed messages are dropped
    /// and slow receivers will observe a `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// If there are no active subscribers the event is silently dropped.
    pub fn publish(&self, event: JobEvent) {
        // Ignore the SendError: it only means there are zero receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
