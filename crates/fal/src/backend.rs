//! Generation backend abstraction.
//!
//! [`GenerationBackend`] is the seam between the job lifecycle and the
//! remote video service. [`FalClient`](crate::client::FalClient) is the
//! production implementation; tests substitute scripted backends.

use async_trait::async_trait;
use crush_core::job::UploadPayload;
use crush_core::prompt::{DEFAULT_PROMPT, DEFAULT_PROMPT_OPTIMIZER};
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::api::FalApiError;
use crate::events::ProgressEvent;
use crate::messages::SubmitResponse;

/// Progress of one request, ending with a single terminal event.
pub type ProgressStream = BoxStream<'static, Result<ProgressEvent, FalApiError>>;

/// Input of an image-to-video request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub image_url: String,
    pub prompt: String,
    pub prompt_optimizer: bool,
}

impl GenerateRequest {
    /// Request for `image_url` with the built-in prompt.
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            prompt: DEFAULT_PROMPT.to_string(),
            prompt_optimizer: DEFAULT_PROMPT_OPTIMIZER,
        }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }
}

/// Addresses of a queued request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestHandle {
    pub request_id: String,
    pub status_url: String,
    pub response_url: String,
    pub cancel_url: String,
}

impl From<SubmitResponse> for RequestHandle {
    fn from(r: SubmitResponse) -> Self {
        Self {
            request_id: r.request_id,
            status_url: r.status_url,
            response_url: r.response_url,
            cancel_url: r.cancel_url,
        }
    }
}

/// Remote video generation service.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Upload an image and return its durable URL.
    async fn upload(&self, payload: UploadPayload) -> Result<String, FalApiError>;

    /// Queue a generation request.
    async fn submit(&self, request: &GenerateRequest) -> Result<RequestHandle, FalApiError>;

    /// Observe a queued request until it reaches a terminal state.
    fn progress(&self, handle: &RequestHandle) -> ProgressStream;

    /// Ask the service to drop a queued or running request.
    async fn cancel(&self, handle: &RequestHandle) -> Result<(), FalApiError>;

    /// Submit and observe in one call.
    async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<(RequestHandle, ProgressStream), FalApiError> {
        let handle = self.submit(request).await?;
        let stream = self.progress(&handle);
        Ok((handle, stream))
    }
}
