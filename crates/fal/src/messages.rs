//! fal queue and storage response types and parser.
//!
//! The queue status endpoint returns JSON tagged by its `"status"` field
//! (`IN_QUEUE`, `IN_PROGRESS`, `COMPLETED`). This module deserializes
//! it into a strongly-typed [`QueueStatus`] enum alongside the other
//! response bodies the client reads.

use serde::{Deserialize, Serialize};

/// Response of `POST {storage}/storage/upload/initiate`.
#[derive(Debug, Clone, Deserialize)]
pub struct InitiateUploadResponse {
    /// Pre-signed URL the bytes are `PUT` to.
    pub upload_url: String,
    /// Durable URL of the file once uploaded.
    pub file_url: String,
}

/// Response of `POST {queue}/{model}` after queuing a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitResponse {
    pub request_id: String,
    pub status_url: String,
    pub response_url: String,
    pub cancel_url: String,
}

/// Queue state of a submitted request.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "status")]
pub enum QueueStatus {
    /// Waiting for a runner.
    #[serde(rename = "IN_QUEUE")]
    InQueue {
        #[serde(default)]
        queue_position: Option<u32>,
    },

    /// Running; logs are present when requested with `logs=1`.
    #[serde(rename = "IN_PROGRESS")]
    InProgress {
        #[serde(default)]
        logs: Option<Vec<LogEntry>>,
    },

    /// Finished. The result (or its failure) is read from the response URL.
    #[serde(rename = "COMPLETED")]
    Completed {
        #[serde(default)]
        logs: Option<Vec<LogEntry>>,
        #[serde(default)]
        error: Option<String>,
    },
}

/// One runner log line.
#[derive(Debug, Clone, Deserialize)]
pub struct LogEntry {
    pub message: String,
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Result body of an image-to-video request.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoResult {
    pub video: VideoFile,
}

/// Produced video file.
#[derive(Debug, Clone, Deserialize)]
pub struct VideoFile {
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Error body returned by fal for failed requests.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// Best-effort human-readable text of `detail`, which fal sends either
    /// as a string or as a list of validation objects with `msg` fields.
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|item| item.get("msg").and_then(|m| m.as_str()))
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}

/// Parse a queue status body into a typed enum.
///
/// Returns `Err` for malformed JSON or unknown `status` values.
pub fn parse_status(text: &str) -> Result<QueueStatus, serde_json::Error> {
    serde_json::from_str(text)
}
