//! REST API client for the fal queue and storage endpoints.
//!
//! Wraps file upload, request submission, status polling, result
//! retrieval and cancellation using [`reqwest`].

use serde::Serialize;

use crate::messages::{
    self, ErrorBody, InitiateUploadResponse, QueueStatus, SubmitResponse, VideoResult,
};

/// HTTP client for the fal queue and storage services.
#[derive(Clone)]
pub struct FalApi {
    client: reqwest::Client,
    queue_url: String,
    storage_url: String,
    api_key: String,
}

/// Errors from the fal REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum FalApiError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// fal returned a non-2xx status code.
    #[error("fal API error ({status}): {message}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// `detail` text when the body is a fal error, otherwise the raw body.
        message: String,
    },

    /// A 2xx body did not have the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),
}

impl FalApiError {
    /// Whether repeating the same call may succeed.
    ///
    /// Connection failures, timeouts, 408, 429 and 5xx are transient.
    /// Other client errors and malformed bodies are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Request(e) => e.is_connect() || e.is_timeout() || e.is_request(),
            Self::ApiError { status, .. } => {
                matches!(status, 408 | 429) || (500..600).contains(status)
            }
            Self::Decode(_) => false,
        }
    }

    /// Short message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::ApiError { message, .. } if !message.is_empty() => message.clone(),
            Self::Request(e) if e.is_timeout() => "The request timed out".to_string(),
            Self::Request(_) => "Could not reach the generation service".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct InitiateUploadBody<'a> {
    file_name: &'a str,
    content_type: &'a str,
}

impl FalApi {
    /// Create a new API client.
    ///
    /// * `queue_url` - Queue base URL, e.g. `https://queue.fal.run`.
    /// * `storage_url` - Storage base URL, e.g. `https://rest.alpha.fal.ai`.
    pub fn new(queue_url: String, storage_url: String, api_key: String) -> Self {
        Self::with_client(reqwest::Client::new(), queue_url, storage_url, api_key)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(
        client: reqwest::Client,
        queue_url: String,
        storage_url: String,
        api_key: String,
    ) -> Self {
        Self {
            client,
            queue_url: queue_url.trim_end_matches('/').to_string(),
            storage_url: storage_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Upload a file to fal storage and return its public URL.
    ///
    /// Initiates the upload to obtain a pre-signed URL, then `PUT`s the
    /// bytes to it.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        file_name: &str,
    ) -> Result<String, FalApiError> {
        let response = self
            .client
            .post(format!(
                "{}/storage/upload/initiate?storage_type=fal-cdn-v3",
                self.storage_url
            ))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&InitiateUploadBody {
                file_name,
                content_type,
            })
            .send()
            .await?;
        let initiated: InitiateUploadResponse = Self::parse_response(response).await?;

        let response = self
            .client
            .put(&initiated.upload_url)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes)
            .send()
            .await?;
        Self::check_status(response).await?;

        Ok(initiated.file_url)
    }

    /// Queue a request for `model` with the given JSON input.
    pub async fn submit<T: Serialize + ?Sized>(
        &self,
        model: &str,
        input: &T,
    ) -> Result<SubmitResponse, FalApiError> {
        let response = self
            .client
            .post(format!("{}/{}", self.queue_url, model.trim_matches('/')))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(input)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Fetch the queue status of a request, including runner logs.
    pub async fn status(&self, status_url: &str) -> Result<QueueStatus, FalApiError> {
        let response = self
            .client
            .get(status_url)
            .query(&[("logs", "1")])
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        messages::parse_status(&text).map_err(|e| FalApiError::Decode(e.to_string()))
    }

    /// Fetch the result of a completed request.
    pub async fn result(&self, response_url: &str) -> Result<VideoResult, FalApiError> {
        let response = self
            .client
            .get(response_url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Cancel a queued or running request.
    pub async fn cancel(&self, cancel_url: &str) -> Result<(), FalApiError> {
        let response = self
            .client
            .put(cancel_url)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        Self::check_status(response).await
    }

    // ---- private helpers ----

    fn auth_header(&self) -> String {
        format!("Key {}", self.api_key)
    }

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`FalApiError::ApiError`]
    /// carrying the status and the error detail on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, FalApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|b| b.message())
                .unwrap_or(body);
            return Err(FalApiError::ApiError {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, FalApiError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| FalApiError::Decode(e.to_string()))
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), FalApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api_error(status: u16) -> FalApiError {
        FalApiError::ApiError {
            status,
            message: String::new(),
        }
    }

    #[test]
    fn server_and_throttling_errors_are_transient() {
        assert!(api_error(500).is_transient());
        assert!(api_error(503).is_transient());
        assert!(api_error(429).is_transient());
        assert!(api_error(408).is_transient());
    }

    #[test]
    fn client_errors_are_not_transient() {
        assert!(!api_error(400).is_transient());
        assert!(!api_error(401).is_transient());
        assert!(!api_error(422).is_transient());
        assert!(!FalApiError::Decode("missing field".into()).is_transient());
    }

    #[test]
    fn user_message_prefers_api_detail() {
        let err = FalApiError::ApiError {
            status: 422,
            message: "Image too small".into(),
        };
        assert_eq!(err.user_message(), "Image too small");
    }

    #[test]
    fn trailing_slashes_are_trimmed() {
        let api = FalApi::new(
            "https://queue.example/".into(),
            "https://storage.example//".into(),
            "k".into(),
        );
        assert_eq!(api.queue_url, "https://queue.example");
        assert_eq!(api.storage_url, "https://storage.example");
    }
}
