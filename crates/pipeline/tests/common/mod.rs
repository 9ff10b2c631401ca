//! Shared fixtures: a scripted generation backend, a counting
//! notification backend and in-memory photos.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use crush_core::compositor::composite;
use crush_core::job::UploadPayload;
use crush_core::{GenerationJob, ImageSlot, SlotRole, SourceImages, UploadMode};
use crush_events::{EventBus, NotificationBackend, NotificationError, Notifier, Permission};
use crush_fal::{
    FalApiError, GenerateRequest, GenerationBackend, ProgressEvent, ProgressStream, RequestHandle,
    RetryConfig,
};
use crush_pipeline::Generator;
use crush_store::{JobStore, MemoryStore};
use futures::StreamExt;

pub const UPLOADED_URL: &str = "https://cdn.example/uploads/composite.jpg";
pub const VIDEO_URL: &str = "https://cdn.example/v1.mp4";

// ---------------------------------------------------------------------------
// Generation backend
// ---------------------------------------------------------------------------

/// Backend that replays a fixed script of progress events.
pub struct ScriptedBackend {
    pub uploads: Mutex<Vec<UploadPayload>>,
    pub submissions: Mutex<Vec<GenerateRequest>>,
    pub cancels: AtomicUsize,
    upload_failures: Mutex<VecDeque<FalApiError>>,
    submit_failures: Mutex<VecDeque<FalApiError>>,
    events: Vec<ProgressEvent>,
    /// Keep the stream open after the scripted events.
    hang: bool,
    /// How long a remote cancel takes.
    cancel_delay: Duration,
}

impl ScriptedBackend {
    pub fn new(events: Vec<ProgressEvent>) -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            submissions: Mutex::new(Vec::new()),
            cancels: AtomicUsize::new(0),
            upload_failures: Mutex::new(VecDeque::new()),
            submit_failures: Mutex::new(VecDeque::new()),
            events,
            hang: false,
            cancel_delay: Duration::ZERO,
        }
    }

    /// Queue, progress, then the video.
    pub fn completing() -> Self {
        Self::new(vec![
            ProgressEvent::Queued { position: Some(1) },
            ProgressEvent::InProgress {
                message: Some("Rendering frames".into()),
            },
            ProgressEvent::Completed {
                video_url: VIDEO_URL.into(),
            },
        ])
    }

    /// Queued forever.
    pub fn hanging() -> Self {
        let mut backend = Self::new(vec![ProgressEvent::Queued { position: Some(3) }]);
        backend.hang = true;
        backend
    }

    pub fn fail_uploads(self, errors: Vec<FalApiError>) -> Self {
        *self.upload_failures.lock().unwrap() = errors.into();
        self
    }

    pub fn fail_submissions(self, errors: Vec<FalApiError>) -> Self {
        *self.submit_failures.lock().unwrap() = errors.into();
        self
    }

    pub fn with_cancel_delay(mut self, delay: Duration) -> Self {
        self.cancel_delay = delay;
        self
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn submission_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn upload(&self, payload: UploadPayload) -> Result<String, FalApiError> {
        if let Some(err) = self.upload_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.uploads.lock().unwrap().push(payload);
        Ok(UPLOADED_URL.to_string())
    }

    async fn submit(&self, request: &GenerateRequest) -> Result<RequestHandle, FalApiError> {
        if let Some(err) = self.submit_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        self.submissions.lock().unwrap().push(request.clone());
        Ok(RequestHandle {
            request_id: "req-1".into(),
            status_url: "https://queue.example/req-1/status".into(),
            response_url: "https://queue.example/req-1".into(),
            cancel_url: "https://queue.example/req-1/cancel".into(),
        })
    }

    fn progress(&self, _handle: &RequestHandle) -> ProgressStream {
        let events = futures::stream::iter(self.events.clone().into_iter().map(Ok));
        if self.hang {
            events.chain(futures::stream::pending()).boxed()
        } else {
            events.boxed()
        }
    }

    async fn cancel(&self, _handle: &RequestHandle) -> Result<(), FalApiError> {
        tokio::time::sleep(self.cancel_delay).await;
        self.cancels.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn api_error(status: u16, message: &str) -> FalApiError {
    FalApiError::ApiError {
        status,
        message: message.into(),
    }
}

// ---------------------------------------------------------------------------
// Notification backend
// ---------------------------------------------------------------------------

/// Answers permission requests with a fixed value and counts deliveries.
pub struct CountingNotifications {
    answer: Permission,
    pub shown: AtomicUsize,
}

impl CountingNotifications {
    pub fn new(answer: Permission) -> Arc<Self> {
        Arc::new(Self {
            answer,
            shown: AtomicUsize::new(0),
        })
    }

    pub fn shown(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }
}

impl NotificationBackend for CountingNotifications {
    fn request_permission(&self) -> Result<Permission, NotificationError> {
        Ok(self.answer)
    }

    fn show(&self, _title: &str, _body: &str) -> Result<(), NotificationError> {
        self.shown.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn play_sound(&self) -> Result<(), NotificationError> {
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Wiring
// ---------------------------------------------------------------------------

pub struct Harness {
    pub backend: Arc<ScriptedBackend>,
    pub notifications: Arc<CountingNotifications>,
    pub store: JobStore,
    pub generator: Generator,
}

pub fn harness(backend: ScriptedBackend, permission: Permission) -> Harness {
    let backend = Arc::new(backend);
    let notifications = CountingNotifications::new(permission);
    let store = JobStore::new(Arc::new(MemoryStore::new()));
    let generator = generator_over(backend.clone(), notifications.clone(), store.clone());
    Harness {
        backend,
        notifications,
        store,
        generator,
    }
}

/// A generator sharing `store`, as a restarted host would.
pub fn generator_over(
    backend: Arc<ScriptedBackend>,
    notifications: Arc<CountingNotifications>,
    store: JobStore,
) -> Generator {
    let notifier = Arc::new(Notifier::new(notifications));
    Generator::new(backend, store, Arc::new(EventBus::default()), notifier).with_retry(
        RetryConfig {
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(2),
            ..Default::default()
        },
    )
}

// ---------------------------------------------------------------------------
// Photos
// ---------------------------------------------------------------------------

pub fn png(width: u32, height: u32, color: [u8; 3]) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb(color));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn solo_job() -> GenerationJob {
    let first =
        ImageSlot::new(SlotRole::FirstPerson, png(16, 32, [220, 20, 60]), None, usize::MAX).unwrap();
    let second =
        ImageSlot::new(SlotRole::SecondPerson, png(32, 16, [30, 144, 255]), None, usize::MAX)
            .unwrap();
    let merged = composite(&first, &second, 32).unwrap();
    let sources =
        SourceImages::capture(UploadMode::Solo, vec![first, second], Some(merged)).unwrap();
    GenerationJob::new(UploadMode::Solo, sources)
}

pub fn couple_job() -> GenerationJob {
    let photo = ImageSlot::new(
        SlotRole::Couple,
        png(20, 20, [255, 192, 203]),
        Some("us.png".into()),
        usize::MAX,
    )
    .unwrap();
    let sources = SourceImages::capture(UploadMode::Couple, vec![photo], None).unwrap();
    GenerationJob::new(UploadMode::Couple, sources)
}
