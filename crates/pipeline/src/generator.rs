//! Job lifecycle driver.
//!
//! [`Generator::submit`] spawns one task per job that uploads the
//! submission image, queues the request and follows its progress stream
//! to a terminal state. Every mutation is persisted before it is
//! published on the event bus and to the job's [`JobHandle`].
//!
//! The persisted slot belongs to the most recently submitted job. Writes
//! and cleanup from a job that has since been replaced are skipped.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crush_core::job::{PROGRESS_SUBMITTING, PROGRESS_UPLOADING};
use crush_core::prompt::DEFAULT_PROMPT;
use crush_core::types::JobId;
use crush_core::{GenerationJob, JobStatus};
use crush_events::{EventBus, JobEvent, Notifier};
use crush_fal::retry::with_retry;
use crush_fal::{GenerateRequest, GenerationBackend, ProgressEvent, RequestHandle, RetryConfig};
use crush_store::JobStore;
use futures::StreamExt;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::GenerationError;

/// Title of the completion notification.
pub const NOTIFY_TITLE: &str = "Your video is ready!";
/// Body of the completion notification.
pub const NOTIFY_BODY: &str = "Your KissYourCrush video has been generated. Click to watch it.";

/// Progress text when the stream ends without a result.
const STREAM_ENDED_MESSAGE: &str = "Progress stream ended without a result";

/// Runs generation jobs against a [`GenerationBackend`].
///
/// Cheap to clone; every clone shares the same backend, store, bus and
/// notifier.
#[derive(Clone)]
pub struct Generator {
    backend: Arc<dyn GenerationBackend>,
    store: JobStore,
    bus: Arc<EventBus>,
    notifier: Arc<Notifier>,
    retry: RetryConfig,
    prompt: String,
    /// Job that owns the persisted slot.
    owner: Arc<Mutex<Option<JobId>>>,
}

/// How a job task stopped.
enum Outcome {
    Completed(String),
    Failed(GenerationError),
    Cancelled,
    Detached,
}

impl Generator {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        store: JobStore,
        bus: Arc<EventBus>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            backend,
            store,
            bus,
            notifier,
            retry: RetryConfig::default(),
            prompt: DEFAULT_PROMPT.to_string(),
            owner: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// Start driving `job` on the runtime.
    ///
    /// The job is persisted and published immediately. A job that already
    /// carries an `image_url` skips the upload step. Must be called from
    /// within a Tokio runtime.
    pub fn submit(&self, job: GenerationJob) -> JobHandle {
        let (state_tx, state_rx) = watch::channel(job.clone());
        let cancel = CancellationToken::new();
        let detach = CancellationToken::new();

        tracing::info!(job_id = %job.id, mode = %job.mode.name(), "Starting generation job");
        {
            let mut owner = self.owner();
            *owner = Some(job.id.clone());
            if let Err(e) = self.store.save(&job) {
                tracing::warn!(job_id = %job.id, error = %e, "Failed to persist job snapshot");
            }
        }
        self.publish(&job, &state_tx);

        let generator = self.clone();
        let task = tokio::spawn({
            let cancel = cancel.clone();
            let detach = detach.clone();
            async move { generator.run(job, state_tx, cancel, detach).await }
        });

        JobHandle {
            state: state_rx,
            cancel,
            detach,
            task,
        }
    }

    /// Resume the persisted job, if it is still pending.
    ///
    /// The submission is replayed from the persisted `image_url`, or from
    /// the persisted photos when the upload never finished. Returns the
    /// stored job unchanged when it is terminal. Notification permission
    /// is requested before a pending job restarts.
    pub fn resume(&self) -> Option<Resumed> {
        let job = self.store.load()?;
        if job.status != JobStatus::Pending {
            tracing::debug!(job_id = %job.id, status = ?job.status, "Stored job is not pending");
            return Some(Resumed::Finished(job));
        }

        tracing::info!(
            job_id = %job.id,
            has_image_url = job.image_url.is_some(),
            "Resuming pending job",
        );
        let permission = self.notifier.request_permission();
        tracing::debug!(job_id = %job.id, ?permission, "Notification permission for resumed job");
        Some(Resumed::Running(self.submit(job)))
    }

    /// Drop the persisted job without resuming it.
    ///
    /// A pending job is marked cancelled and published; the snapshot is
    /// removed either way. Returns the dropped job.
    pub fn discard_stored(&self) -> Option<GenerationJob> {
        let mut job = self.store.load()?;
        {
            let mut owner = self.owner();
            if let Err(e) = self.store.clear() {
                tracing::warn!(job_id = %job.id, error = %e, "Failed to clear job snapshot");
            }
            if owner.as_deref() == Some(job.id.as_str()) {
                *owner = None;
            }
        }
        if job.status == JobStatus::Pending {
            job.fail(GenerationError::Cancelled.to_string());
            self.bus.publish(JobEvent::from_job(&job));
        }
        tracing::info!(job_id = %job.id, "Stored job discarded");
        Some(job)
    }

    // ---- task body ----

    async fn run(
        self,
        mut job: GenerationJob,
        state: watch::Sender<GenerationJob>,
        cancel: CancellationToken,
        detach: CancellationToken,
    ) -> GenerationJob {
        let mut request: Option<RequestHandle> = None;

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Outcome::Cancelled,
            _ = detach.cancelled() => Outcome::Detached,
            result = self.drive(&mut job, &state, &mut request) => match result {
                Ok(video_url) => Outcome::Completed(video_url),
                Err(e) => Outcome::Failed(e),
            },
        };

        match outcome {
            Outcome::Completed(video_url) => {
                job.complete(video_url);
                tracing::info!(job_id = %job.id, video_url = ?job.video_url, "Generation completed");
                self.record(&job, &state).await;
                self.notifier.notify(NOTIFY_TITLE, NOTIFY_BODY);
            }
            Outcome::Failed(e) => {
                tracing::error!(job_id = %job.id, error = %e, "Generation failed");
                job.fail(e.to_string());
                self.record(&job, &state).await;
            }
            Outcome::Cancelled => {
                tracing::info!(job_id = %job.id, "Generation cancelled");
                if let Some(handle) = &request {
                    if let Err(e) = self.backend.cancel(handle).await {
                        tracing::warn!(
                            job_id = %job.id,
                            request_id = %handle.request_id,
                            error = %e,
                            "Remote cancel failed",
                        );
                    }
                }
                job.fail(GenerationError::Cancelled.to_string());
                self.release(&job.id);
                self.publish(&job, &state);
            }
            Outcome::Detached => {
                tracing::info!(job_id = %job.id, "Stopped observing job, snapshot kept for resume");
            }
        }

        job
    }

    /// Upload, submit and follow the stream. Returns the video URL.
    async fn drive(
        &self,
        job: &mut GenerationJob,
        state: &watch::Sender<GenerationJob>,
        request: &mut Option<RequestHandle>,
    ) -> Result<String, GenerationError> {
        let image_url = match job.image_url.clone() {
            Some(url) => {
                tracing::debug!(job_id = %job.id, "Reusing uploaded image");
                url
            }
            None => {
                let payload = job
                    .source_images
                    .upload_payload(job.mode)
                    .map_err(|e| GenerationError::Encode(e.to_string()))?;
                job.set_progress(PROGRESS_UPLOADING);
                self.record(job, state).await;

                let url = with_retry(&self.retry, "upload", || {
                    self.backend.upload(payload.clone())
                })
                .await
                .map_err(|e| GenerationError::Upload(e.user_message()))?;

                job.set_image_url(url.clone());
                self.record(job, state).await;
                url
            }
        };

        job.set_progress(PROGRESS_SUBMITTING);
        self.record(job, state).await;

        let input = GenerateRequest::new(image_url).with_prompt(self.prompt.clone());
        let handle = with_retry(&self.retry, "submit", || self.backend.submit(&input))
            .await
            .map_err(|e| GenerationError::Submission(e.user_message()))?;

        job.set_request_id(handle.request_id.clone());
        self.record(job, state).await;
        let mut stream = self.backend.progress(&handle);
        *request = Some(handle);

        while let Some(item) = stream.next().await {
            match item {
                Ok(ProgressEvent::Completed { video_url }) => return Ok(video_url),
                Ok(ProgressEvent::Failed { message }) => {
                    return Err(GenerationError::Generation(message))
                }
                Ok(event) => {
                    let text = event.status_text();
                    if text != job.progress {
                        job.set_progress(text);
                        self.record(job, state).await;
                    }
                }
                Err(e) => return Err(GenerationError::Generation(e.user_message())),
            }
        }

        Err(GenerationError::Generation(STREAM_ENDED_MESSAGE.to_string()))
    }

    // ---- persistence + publication ----

    /// Persist, then publish.
    async fn record(&self, job: &GenerationJob, state: &watch::Sender<GenerationJob>) {
        self.persist(job).await;
        self.publish(job, state);
    }

    /// Save `job` off the runtime threads if it still owns the slot.
    async fn persist(&self, job: &GenerationJob) {
        let generator = self.clone();
        let snapshot = job.clone();
        let saved = tokio::task::spawn_blocking(move || {
            let owner = generator.owner();
            if owner.as_deref() != Some(snapshot.id.as_str()) {
                return Ok(false);
            }
            generator.store.save(&snapshot).map(|()| true)
        })
        .await;

        match saved {
            Ok(Ok(true)) => {}
            Ok(Ok(false)) => {
                tracing::debug!(job_id = %job.id, "Job replaced, snapshot not saved");
            }
            Ok(Err(e)) => {
                tracing::warn!(job_id = %job.id, error = %e, "Failed to persist job snapshot");
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "Snapshot save task failed");
            }
        }
    }

    /// Clear the slot if `job_id` still owns it.
    fn release(&self, job_id: &str) {
        let mut owner = self.owner();
        if owner.as_deref() != Some(job_id) {
            tracing::debug!(job_id = %job_id, "Job replaced, snapshot left in place");
            return;
        }
        if let Err(e) = self.store.clear() {
            tracing::warn!(job_id = %job_id, error = %e, "Failed to clear job snapshot");
        }
        *owner = None;
    }

    fn owner(&self) -> MutexGuard<'_, Option<JobId>> {
        self.owner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, job: &GenerationJob, state: &watch::Sender<GenerationJob>) {
        self.bus.publish(JobEvent::from_job(job));
        state.send_replace(job.clone());
    }
}

/// Result of [`Generator::resume`].
pub enum Resumed {
    /// The stored job was pending and is running again.
    Running(JobHandle),
    /// The stored job had already finished; shown but not resumed.
    Finished(GenerationJob),
}

// ---------------------------------------------------------------------------
// JobHandle
// ---------------------------------------------------------------------------

/// Control and observation handle of one running job.
///
/// Dropping the handle does not stop the job; use [`cancel`](Self::cancel)
/// or [`detach`](Self::detach).
pub struct JobHandle {
    state: watch::Receiver<GenerationJob>,
    cancel: CancellationToken,
    detach: CancellationToken,
    task: JoinHandle<GenerationJob>,
}

impl JobHandle {
    pub fn job_id(&self) -> JobId {
        self.state.borrow().id.clone()
    }

    /// Latest job state.
    pub fn latest(&self) -> GenerationJob {
        self.state.borrow().clone()
    }

    /// Watch channel carrying every job state.
    pub fn subscribe(&self) -> watch::Receiver<GenerationJob> {
        self.state.clone()
    }

    /// Whether the job task has stopped.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the job, cancel the remote request and clear the snapshot.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Stop observing the job, keeping the snapshot for a later resume.
    pub fn detach(&self) {
        self.detach.cancel();
    }

    /// Wait until the job reaches a terminal state or its task stops.
    pub async fn wait(&mut self) -> GenerationJob {
        if let Ok(job) = self.state.wait_for(|job| job.is_terminal()).await {
            return job.clone();
        }
        self.state.borrow().clone()
    }

    /// Wait for the job task to finish and return its final state.
    pub async fn join(self) -> GenerationJob {
        match self.task.await {
            Ok(job) => job,
            Err(e) => {
                tracing::error!(error = %e, "Job task panicked");
                self.state.borrow().clone()
            }
        }
    }
}
