//! fal-backed [`GenerationBackend`].
//!
//! [`FalClient`] holds the connection settings for one model endpoint and
//! implements upload, submission, observation and cancellation on top of
//! [`FalApi`].

use std::time::Duration;

use async_trait::async_trait;
use crush_core::job::UploadPayload;

use crate::api::{FalApi, FalApiError};
use crate::backend::{GenerateRequest, GenerationBackend, ProgressStream, RequestHandle};
use crate::processor::{progress_stream, PollConfig};

/// Image-to-video model used when none is configured.
pub const DEFAULT_MODEL: &str = "fal-ai/minimax/video-01-live/image-to-video";
/// Queue service base URL.
pub const DEFAULT_QUEUE_URL: &str = "https://queue.fal.run";
/// Storage service base URL.
pub const DEFAULT_STORAGE_URL: &str = "https://rest.alpha.fal.ai";

/// Connection settings for [`FalClient`].
#[derive(Debug, Clone)]
pub struct FalConfig {
    pub api_key: String,
    pub model: String,
    pub queue_url: String,
    pub storage_url: String,
    pub poll: PollConfig,
}

impl FalConfig {
    /// Settings for the default model and endpoints.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            storage_url: DEFAULT_STORAGE_URL.to_string(),
            poll: PollConfig::default(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_queue_url(mut self, url: impl Into<String>) -> Self {
        self.queue_url = url.into();
        self
    }

    pub fn with_storage_url(mut self, url: impl Into<String>) -> Self {
        self.storage_url = url.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll.interval = interval;
        self
    }
}

/// Client for one fal model endpoint.
pub struct FalClient {
    api: FalApi,
    model: String,
    poll: PollConfig,
}

impl FalClient {
    pub fn new(config: FalConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, config: FalConfig) -> Self {
        Self {
            api: FalApi::with_client(client, config.queue_url, config.storage_url, config.api_key),
            model: config.model,
            poll: config.poll,
        }
    }

    /// Model path requests are submitted to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Underlying REST wrapper.
    pub fn api(&self) -> &FalApi {
        &self.api
    }
}

#[async_trait]
impl GenerationBackend for FalClient {
    async fn upload(&self, payload: UploadPayload) -> Result<String, FalApiError> {
        let size = payload.bytes.len();
        let url = self
            .api
            .upload(payload.bytes, payload.content_type, &payload.file_name)
            .await?;
        tracing::info!(size, file_name = %payload.file_name, "Image uploaded to fal storage");
        Ok(url)
    }

    async fn submit(&self, request: &GenerateRequest) -> Result<RequestHandle, FalApiError> {
        let response = self.api.submit(&self.model, request).await?;
        tracing::info!(
            request_id = %response.request_id,
            model = %self.model,
            "Generation request queued",
        );
        Ok(response.into())
    }

    fn progress(&self, handle: &RequestHandle) -> ProgressStream {
        progress_stream(self.api.clone(), handle.clone(), self.poll.clone())
    }

    async fn cancel(&self, handle: &RequestHandle) -> Result<(), FalApiError> {
        self.api.cancel(&handle.cancel_url).await?;
        tracing::info!(request_id = %handle.request_id, "Generation request cancelled");
        Ok(())
    }
}
