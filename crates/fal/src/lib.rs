//! fal.ai queue and storage client.
//!
//! Provides typed queue-status parsing, HTTP API wrappers, a polling
//! progress stream, retry with exponential backoff, and the
//! [`GenerationBackend`](backend::GenerationBackend) seam the generator
//! talks to.

pub mod api;
pub mod backend;
pub mod client;
pub mod events;
pub mod messages;
pub mod processor;
pub mod retry;

pub use api::{FalApi, FalApiError};
pub use backend::{GenerateRequest, GenerationBackend, ProgressStream, RequestHandle};
pub use client::{FalClient, FalConfig};
pub use events::ProgressEvent;
pub use processor::PollConfig;
pub use retry::RetryConfig;
