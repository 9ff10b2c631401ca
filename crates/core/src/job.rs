//! Generation job record and lifecycle transitions.
//!
//! A [`GenerationJob`] is created when the user triggers generation and
//! is mutated only by the generator as progress arrives. Every field is
//! serializable so the whole record (including its source photos) can be
//! persisted and rehydrated after a restart.

use serde::{Deserialize, Serialize};

use crate::compositor::{CompositeImage, COMPOSITE_FILE_NAME};
use crate::error::CoreError;
use crate::mode::{SlotRole, UploadMode};
use crate::slot::ImageSlot;
use crate::types::{JobId, Timestamp};

// ---------------------------------------------------------------------------
// Progress text
// ---------------------------------------------------------------------------

/// Progress text of a freshly created job.
pub const PROGRESS_STARTING: &str = "Starting...";
/// Progress text while the submission image uploads.
pub const PROGRESS_UPLOADING: &str = "Uploading photo...";
/// Progress text while the generation request is submitted.
pub const PROGRESS_SUBMITTING: &str = "Submitting request...";
/// Progress text once the video is ready.
pub const PROGRESS_COMPLETED: &str = "Video generated successfully!";
/// Progress text of a job cancelled by the user.
pub const PROGRESS_CANCELLED: &str = "Generation cancelled";

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Completed,
    Error,
}

impl JobStatus {
    /// `completed` and `error` are terminal.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

// ---------------------------------------------------------------------------
// SourceImages
// ---------------------------------------------------------------------------

/// The photos in effect when a job was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceImages {
    pub slots: Vec<ImageSlot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composite: Option<CompositeImage>,
}

/// Bytes ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPayload {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub file_name: String,
}

impl SourceImages {
    /// Capture the images for `mode`, checking that everything the mode
    /// needs is present and consistent.
    ///
    /// Solo mode requires both solo slots and a composite built from them;
    /// couple mode requires the couple slot.
    pub fn capture(
        mode: UploadMode,
        slots: Vec<ImageSlot>,
        composite: Option<CompositeImage>,
    ) -> Result<Self, CoreError> {
        let images = Self { slots, composite };
        images.validate(mode)?;
        Ok(images)
    }

    /// Look up the slot for `role`.
    pub fn slot(&self, role: SlotRole) -> Option<&ImageSlot> {
        self.slots.iter().find(|s| s.role == role)
    }

    /// The image that gets uploaded for `mode`.
    pub fn upload_payload(&self, mode: UploadMode) -> Result<UploadPayload, CoreError> {
        self.validate(mode)?;
        match mode {
            UploadMode::Solo => {
                let composite = self
                    .composite
                    .as_ref()
                    .ok_or_else(|| CoreError::Internal("validated composite missing".into()))?;
                Ok(UploadPayload {
                    bytes: composite.bytes.clone(),
                    content_type: composite.kind().content_type(),
                    file_name: COMPOSITE_FILE_NAME.to_string(),
                })
            }
            UploadMode::Couple => {
                let slot = self
                    .slot(SlotRole::Couple)
                    .ok_or_else(|| CoreError::Internal("validated couple slot missing".into()))?;
                Ok(UploadPayload {
                    bytes: slot.bytes.clone(),
                    content_type: slot.kind.content_type(),
                    file_name: slot.upload_file_name(),
                })
            }
        }
    }

    fn validate(&self, mode: UploadMode) -> Result<(), CoreError> {
        for role in mode.required_roles() {
            if self.slot(*role).is_none() {
                return Err(CoreError::Validation(format!(
                    "Missing photo for '{}'",
                    role.name()
                )));
            }
        }
        if mode == UploadMode::Solo {
            let (Some(first), Some(second)) = (
                self.slot(SlotRole::FirstPerson),
                self.slot(SlotRole::SecondPerson),
            ) else {
                return Err(CoreError::Validation("Missing solo photo".into()));
            };
            match &self.composite {
                Some(c) if c.matches(first, second) => {}
                Some(_) => {
                    return Err(CoreError::Validation(
                        "Composite does not match the selected photos".into(),
                    ))
                }
                None => {
                    return Err(CoreError::Validation(
                        "Solo photos have not been composited yet".into(),
                    ))
                }
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// GenerationJob
// ---------------------------------------------------------------------------

/// One request/response lifecycle with the video-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationJob {
    pub id: JobId,
    pub status: JobStatus,
    /// Human-readable status line.
    pub progress: String,
    #[serde(default)]
    pub video_url: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub mode: UploadMode,
    pub source_images: SourceImages,
    /// Durable URL of the uploaded submission image, once uploaded.
    #[serde(default)]
    pub image_url: Option<String>,
    /// Remote queue request id, once submitted.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl GenerationJob {
    /// Create a pending job for the given photos.
    pub fn new(mode: UploadMode, source_images: SourceImages) -> Self {
        let now = chrono::Utc::now();
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            status: JobStatus::Pending,
            progress: PROGRESS_STARTING.to_string(),
            video_url: None,
            created_at: now,
            updated_at: now,
            mode,
            source_images,
            image_url: None,
            request_id: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Replace the progress line of a pending job.
    pub fn set_progress(&mut self, progress: impl Into<String>) {
        self.progress = progress.into();
        self.touch();
    }

    /// Record the uploaded image URL.
    pub fn set_image_url(&mut self, url: impl Into<String>) {
        self.image_url = Some(url.into());
        self.touch();
    }

    /// Record the remote request id.
    pub fn set_request_id(&mut self, request_id: impl Into<String>) {
        self.request_id = Some(request_id.into());
        self.touch();
    }

    /// Transition to `completed` with the produced video.
    pub fn complete(&mut self, video_url: impl Into<String>) {
        self.status = JobStatus::Completed;
        self.video_url = Some(video_url.into());
        self.progress = PROGRESS_COMPLETED.to_string();
        self.touch();
    }

    /// Transition to `error` with a user-visible message.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = JobStatus::Error;
        self.progress = message.into();
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = chrono::Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use assert_matches::assert_matches;

    use super::*;
    use crate::compositor::composite;
    use crate::slot::DEFAULT_MAX_IMAGE_BYTES;

    fn slot(role: SlotRole, color: [u8; 3]) -> ImageSlot {
        let img = image::RgbImage::from_pixel(8, 8, image::Rgb(color));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        ImageSlot::new(role, out.into_inner(), None, DEFAULT_MAX_IMAGE_BYTES).unwrap()
    }

    fn solo_sources() -> SourceImages {
        let a = slot(SlotRole::FirstPerson, [255, 0, 0]);
        let b = slot(SlotRole::SecondPerson, [0, 255, 0]);
        let c = composite(&a, &b, 16).unwrap();
        SourceImages::capture(UploadMode::Solo, vec![a, b], Some(c)).unwrap()
    }

    #[test]
    fn new_job_is_pending() {
        let job = GenerationJob::new(UploadMode::Solo, solo_sources());
        assert_eq!(job.status, JobStatus::Pending);
        assert!(!job.is_terminal());
        assert!(job.video_url.is_none());
        assert!(uuid::Uuid::parse_str(&job.id).is_ok());
    }

    #[test]
    fn complete_sets_video_and_terminal_status() {
        let mut job = GenerationJob::new(UploadMode::Solo, solo_sources());
        job.complete("https://cdn.example/v1.mp4");
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.video_url.as_deref(), Some("https://cdn.example/v1.mp4"));
        assert!(job.is_terminal());
    }

    #[test]
    fn fail_keeps_message_as_progress() {
        let mut job = GenerationJob::new(UploadMode::Solo, solo_sources());
        job.fail("Upload failed: timeout");
        assert_eq!(job.status, JobStatus::Error);
        assert_eq!(job.progress, "Upload failed: timeout");
    }

    #[test]
    fn solo_payload_is_the_composite() {
        let sources = solo_sources();
        let payload = sources.upload_payload(UploadMode::Solo).unwrap();
        assert_eq!(payload.content_type, "image/jpeg");
        assert_eq!(payload.file_name, COMPOSITE_FILE_NAME);
        assert_eq!(payload.bytes, sources.composite.as_ref().unwrap().bytes);
    }

    #[test]
    fn couple_payload_is_the_couple_slot() {
        let couple = slot(SlotRole::Couple, [9, 9, 9]);
        let sources = SourceImages::capture(UploadMode::Couple, vec![couple.clone()], None).unwrap();
        let payload = sources.upload_payload(UploadMode::Couple).unwrap();
        assert_eq!(payload.bytes, couple.bytes);
        assert_eq!(payload.content_type, "image/png");
    }

    #[test]
    fn solo_capture_requires_composite() {
        let a = slot(SlotRole::FirstPerson, [255, 0, 0]);
        let b = slot(SlotRole::SecondPerson, [0, 255, 0]);
        assert_matches!(
            SourceImages::capture(UploadMode::Solo, vec![a, b], None),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn solo_capture_rejects_stale_composite() {
        let a = slot(SlotRole::FirstPerson, [255, 0, 0]);
        let b = slot(SlotRole::SecondPerson, [0, 255, 0]);
        let other = slot(SlotRole::SecondPerson, [0, 0, 255]);
        let stale = composite(&a, &other, 16).unwrap();
        assert_matches!(
            SourceImages::capture(UploadMode::Solo, vec![a, b], Some(stale)),
            Err(CoreError::Validation(msg)) if msg.contains("does not match")
        );
    }

    #[test]
    fn couple_capture_requires_photo() {
        assert_matches!(
            SourceImages::capture(UploadMode::Couple, vec![], None),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn job_serializes_status_lowercase() {
        let job = GenerationJob::new(UploadMode::Solo, solo_sources());
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "pending");
        assert_eq!(json["mode"], "solo");
        let back: GenerationJob = serde_json::from_value(json).unwrap();
        assert_eq!(back, job);
    }
}
