//! Progress events produced while observing a queued request.
//!
//! These are the interpreted form of raw queue status polls: the stream
//! in [`processor`](crate::processor) emits one event per visible change,
//! ending with exactly one terminal event.

use crush_core::job::PROGRESS_COMPLETED;

/// Default text while the runner works without logging.
pub const PROGRESS_GENERATING: &str = "Generating video...";

/// One step of a request's lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    /// Waiting in the queue.
    Queued { position: Option<u32> },

    /// Running; carries the latest runner log line, if any.
    InProgress { message: Option<String> },

    /// Finished with a video.
    Completed { video_url: String },

    /// Finished without a video.
    Failed { message: String },
}

impl ProgressEvent {
    /// `Completed` and `Failed` end the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }

    /// Human-readable status line for the job's progress field.
    pub fn status_text(&self) -> String {
        match self {
            Self::Queued {
                position: Some(position),
            } => format!("In queue (position {position})"),
            Self::Queued { position: None } => "In queue".to_string(),
            Self::InProgress { message: Some(m) } => m.clone(),
            Self::InProgress { message: None } => PROGRESS_GENERATING.to_string(),
            Self::Completed { .. } => PROGRESS_COMPLETED.to_string(),
            Self::Failed { message } => message.clone(),
        }
    }
}
