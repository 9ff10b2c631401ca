//! Queue status polling loop.
//!
//! Polls the status endpoint of a queued request, interprets each
//! [`QueueStatus`] into a [`ProgressEvent`], fetches the result once the
//! request completes, and exposes the whole sequence as a stream that
//! ends after exactly one terminal event.

use std::time::Duration;

use futures::stream;

use crate::api::{FalApi, FalApiError};
use crate::backend::{ProgressStream, RequestHandle};
use crate::events::ProgressEvent;
use crate::messages::QueueStatus;

/// Message used when a completed request yields no usable video.
pub const NO_VIDEO_MESSAGE: &str = "Generation finished without a video";

/// Polling cadence and tolerance.
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay between status requests.
    pub interval: Duration,
    /// Transient status failures tolerated in a row before the stream errors.
    pub max_consecutive_failures: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            max_consecutive_failures: 5,
        }
    }
}

struct PollState {
    api: FalApi,
    handle: RequestHandle,
    config: PollConfig,
    last_text: Option<String>,
    failures: u32,
    polled: bool,
    done: bool,
}

/// Build the progress stream for `handle`.
///
/// Identical consecutive updates are collapsed. The stream yields `Err`
/// only when status polling fails permanently or exceeds the tolerated
/// number of transient failures; a failed generation is a
/// [`ProgressEvent::Failed`] item.
pub fn progress_stream(api: FalApi, handle: RequestHandle, config: PollConfig) -> ProgressStream {
    let state = PollState {
        api,
        handle,
        config,
        last_text: None,
        failures: 0,
        polled: false,
        done: false,
    };

    Box::pin(stream::unfold(state, |mut state| async move {
        loop {
            if state.done {
                return None;
            }
            if state.polled {
                tokio::time::sleep(state.config.interval).await;
            }
            state.polled = true;

            let status = match state.api.status(&state.handle.status_url).await {
                Ok(status) => {
                    state.failures = 0;
                    status
                }
                Err(e)
                    if e.is_transient()
                        && state.failures < state.config.max_consecutive_failures =>
                {
                    state.failures += 1;
                    tracing::warn!(
                        request_id = %state.handle.request_id,
                        attempt = state.failures,
                        error = %e,
                        "Status poll failed, will retry",
                    );
                    continue;
                }
                Err(e) => {
                    tracing::error!(
                        request_id = %state.handle.request_id,
                        error = %e,
                        "Status polling gave up",
                    );
                    state.done = true;
                    return Some((Err(e), state));
                }
            };

            let event = match interpret(status) {
                Interpreted::Event(event) => event,
                Interpreted::FetchResult => {
                    match fetch_result(&state.api, &state.handle).await {
                        Ok(event) => event,
                        Err(e) => {
                            state.done = true;
                            return Some((Err(e), state));
                        }
                    }
                }
            };

            if event.is_terminal() {
                tracing::info!(
                    request_id = %state.handle.request_id,
                    ?event,
                    "Request reached terminal state",
                );
                state.done = true;
                return Some((Ok(event), state));
            }

            let text = event.status_text();
            if state.last_text.as_deref() == Some(text.as_str()) {
                continue;
            }
            tracing::debug!(request_id = %state.handle.request_id, progress = %text, "Progress");
            state.last_text = Some(text);
            return Some((Ok(event), state));
        }
    }))
}

// ---- status interpretation ----

#[derive(Debug)]
enum Interpreted {
    Event(ProgressEvent),
    FetchResult,
}

fn interpret(status: QueueStatus) -> Interpreted {
    match status {
        QueueStatus::InQueue { queue_position } => Interpreted::Event(ProgressEvent::Queued {
            position: queue_position,
        }),
        QueueStatus::InProgress { logs } => Interpreted::Event(ProgressEvent::InProgress {
            message: logs
                .and_then(|logs| logs.into_iter().last())
                .map(|entry| entry.message)
                .filter(|m| !m.trim().is_empty()),
        }),
        QueueStatus::Completed {
            error: Some(message),
            ..
        } => Interpreted::Event(ProgressEvent::Failed { message }),
        QueueStatus::Completed { error: None, .. } => Interpreted::FetchResult,
    }
}

/// Read the result of a completed request.
///
/// A non-success response or a body without a video URL becomes a
/// `Failed` event; only transport failures surface as `Err`.
async fn fetch_result(api: &FalApi, handle: &RequestHandle) -> Result<ProgressEvent, FalApiError> {
    match api.result(&handle.response_url).await {
        Ok(result) if !result.video.url.trim().is_empty() => Ok(ProgressEvent::Completed {
            video_url: result.video.url,
        }),
        Ok(_) | Err(FalApiError::Decode(_)) => Ok(ProgressEvent::Failed {
            message: NO_VIDEO_MESSAGE.to_string(),
        }),
        Err(e @ FalApiError::ApiError { .. }) => Ok(ProgressEvent::Failed {
            message: e.user_message(),
        }),
        Err(e) => Err(e),
    }
}
