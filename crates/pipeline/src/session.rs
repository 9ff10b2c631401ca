//! Upload session: the state behind the upload screen.
//!
//! [`UploadSession`] owns the selected photos, keeps the solo composite in
//! step with them, and starts, cancels, resumes or detaches the single
//! active generation job.

use crush_core::compositor::{composite_slots, DEFAULT_TARGET_HEIGHT};
use crush_core::slot::DEFAULT_MAX_IMAGE_BYTES;
use crush_core::types::JobId;
use crush_core::{
    CompositeImage, GenerationJob, ImageSlot, MediaIngest, SlotRole, SourceImages, UploadMode,
};
use crush_events::{JobEvent, Permission};
use tokio::sync::broadcast;

use crate::error::SessionError;
use crate::generator::{Generator, JobHandle, Resumed};

/// Photo handling limits.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Height both solo photos are scaled to before stitching.
    pub target_height: u32,
    /// Largest accepted photo, in bytes.
    pub max_image_bytes: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            target_height: DEFAULT_TARGET_HEIGHT,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

/// Fill state of one slot of the current mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotState {
    pub role: SlotRole,
    pub filled: bool,
    pub file_name: Option<String>,
}

/// Dimensions of the current composite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompositeSummary {
    pub width: u32,
    pub height: u32,
    pub left_width: u32,
    pub right_width: u32,
}

/// Point-in-time view of the session.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub mode: UploadMode,
    pub slots: Vec<SlotState>,
    pub composite: Option<CompositeSummary>,
    pub job: Option<GenerationJob>,
    pub is_generating: bool,
    pub can_generate: bool,
}

pub struct UploadSession {
    generator: Generator,
    config: SessionConfig,
    ingest: MediaIngest,
    composite: Option<CompositeImage>,
    /// Finished job still on display.
    job: Option<GenerationJob>,
    active: Option<JobHandle>,
}

impl UploadSession {
    pub fn new(generator: Generator, config: SessionConfig) -> Self {
        Self {
            generator,
            config,
            ingest: MediaIngest::new(UploadMode::default()),
            composite: None,
            job: None,
            active: None,
        }
    }

    /// Pick up the persisted job from a previous run.
    ///
    /// A pending job is resumed; a finished one is only displayed.
    /// Returns the id of the restored job.
    pub fn restore(&mut self) -> Option<JobId> {
        match self.generator.resume()? {
            Resumed::Running(handle) => {
                let id = handle.job_id();
                self.active = Some(handle);
                Some(id)
            }
            Resumed::Finished(job) => {
                let id = job.id.clone();
                self.job = Some(job);
                Some(id)
            }
        }
    }

    /// Drop the persisted job from a previous run without resuming it.
    pub fn discard_saved(&mut self) -> Option<GenerationJob> {
        let job = self.generator.discard_stored()?;
        self.job = Some(job.clone());
        Some(job)
    }

    /// Job events published by this session's generator.
    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.generator.bus().subscribe()
    }

    pub fn mode(&self) -> UploadMode {
        self.ingest.mode()
    }

    /// Switch mode. Clears every photo, the composite and the job on
    /// display; a running job is cancelled.
    pub fn set_mode(&mut self, mode: UploadMode) {
        if let Some(handle) = self.active.take() {
            handle.cancel();
        }
        self.ingest.set_mode(mode);
        self.composite = None;
        self.job = None;
        tracing::debug!(mode = %mode.name(), "Upload mode changed");
    }

    /// Validate and store a photo for `role`, then refresh the composite.
    ///
    /// On failure the previous photo for `role` (if any) is kept.
    pub async fn select_image(
        &mut self,
        role: SlotRole,
        bytes: Vec<u8>,
        file_name: Option<String>,
    ) -> Result<(), SessionError> {
        let slot = ImageSlot::new(role, bytes, file_name, self.config.max_image_bytes)?;
        let previous = self.ingest.select_image(slot)?;

        match self.build_composite().await {
            Ok(composite) => self.composite = composite,
            Err(e) => {
                self.ingest.clear_image(role);
                if let Some(previous) = previous {
                    self.ingest.select_image(previous)?;
                }
                return Err(e);
            }
        }

        self.dismiss_finished_job();
        tracing::debug!(role = %role.name(), composite = self.composite.is_some(), "Photo selected");
        Ok(())
    }

    /// Remove the photo for `role` along with the composite and any
    /// displayed result.
    pub fn clear_image(&mut self, role: SlotRole) {
        self.ingest.clear_image(role);
        self.composite = None;
        self.dismiss_finished_job();
    }

    pub fn composite(&self) -> Option<&CompositeImage> {
        self.composite.as_ref()
    }

    /// Whether a job is running.
    pub fn is_generating(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|handle| !handle.latest().is_terminal() && !handle.is_finished())
    }

    /// Whether the generate action is available.
    pub fn can_generate(&self) -> bool {
        if self.is_generating() || !self.ingest.is_ready() {
            return false;
        }
        match self.mode() {
            UploadMode::Solo => self.composite.is_some(),
            UploadMode::Couple => true,
        }
    }

    /// Start a job for the current photos.
    ///
    /// Asks for notification permission first. Any previous job is
    /// cancelled.
    pub fn generate(&mut self) -> Result<JobId, SessionError> {
        if !self.ingest.is_ready() {
            return Err(SessionError::NotReady);
        }
        let sources = SourceImages::capture(
            self.mode(),
            self.ingest.slots().cloned().collect(),
            self.composite.clone(),
        )?;

        if let Some(handle) = self.active.take() {
            handle.cancel();
        }
        self.job = None;

        let permission = self.generator.notifier().request_permission();
        if permission != Permission::Granted {
            tracing::debug!(?permission, "Completion notification will not be shown");
        }

        let handle = self
            .generator
            .submit(GenerationJob::new(self.mode(), sources));
        let id = handle.job_id();
        self.active = Some(handle);
        Ok(id)
    }

    /// Cancel the running job and wait for it to stop.
    pub async fn cancel(&mut self) -> Option<GenerationJob> {
        let handle = self.active.take()?;
        handle.cancel();
        let job = handle.join().await;
        self.job = Some(job.clone());
        Some(job)
    }

    /// Wait for the running job to reach a terminal state.
    pub async fn wait(&mut self) -> Option<GenerationJob> {
        match self.active.as_mut() {
            Some(handle) => Some(handle.wait().await),
            None => self.job.clone(),
        }
    }

    /// Stop observing the running job and keep it persisted for the
    /// next start. A job that already finished stays on display.
    pub async fn shutdown(&mut self) {
        if let Some(handle) = self.active.take() {
            handle.detach();
            let job = handle.join().await;
            tracing::info!(job_id = %job.id, status = ?job.status, "Session shut down");
            if job.is_terminal() {
                self.job = Some(job);
            }
        }
    }

    /// Job on display: the running one, else the last finished one.
    pub fn current_job(&self) -> Option<GenerationJob> {
        match &self.active {
            Some(handle) => Some(handle.latest()),
            None => self.job.clone(),
        }
    }

    pub fn state(&self) -> SessionState {
        let mode = self.mode();
        let slots = mode
            .required_roles()
            .iter()
            .map(|&role| {
                let slot = self.ingest.slot(role);
                SlotState {
                    role,
                    filled: slot.is_some(),
                    file_name: slot.and_then(|s| s.file_name.clone()),
                }
            })
            .collect();

        SessionState {
            mode,
            slots,
            composite: self.composite.as_ref().map(|c| CompositeSummary {
                width: c.width,
                height: c.height,
                left_width: c.left_width,
                right_width: c.right_width,
            }),
            job: self.current_job(),
            is_generating: self.is_generating(),
            can_generate: self.can_generate(),
        }
    }

    // ---- private helpers ----

    async fn build_composite(&self) -> Result<Option<CompositeImage>, SessionError> {
        let Some((first, second)) = self.ingest.solo_pair() else {
            return Ok(None);
        };
        let composite = composite_slots(first, second, self.config.target_height).await?;
        Ok(Some(composite))
    }

    fn dismiss_finished_job(&mut self) {
        if self
            .active
            .as_ref()
            .is_some_and(|handle| handle.latest().is_terminal())
        {
            self.active = None;
        }
        if self.job.as_ref().is_some_and(GenerationJob::is_terminal) {
            self.job = None;
        }
    }
}
