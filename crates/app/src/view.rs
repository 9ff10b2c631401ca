//! View model for the upload section.
//!
//! [`UploadView`] is a pure function of [`SessionState`]; hosts rebuild
//! it after every session change or job event and render it as-is.

use crush_core::{JobStatus, SlotRole, UploadMode};
use crush_pipeline::SessionState;
use serde::Serialize;

pub const GENERATE_LABEL: &str = "Generate Video";
pub const GENERATING_LABEL: &str = "Generating...";
pub const READY_HINT: &str = "All set! Click generate to create your video";
pub const MODE_HEADING: &str = "Photo type to upload";
pub const UPLOAD_HEADING: &str = "Upload Photos";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModeOption {
    pub mode: UploadMode,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotView {
    pub role: SlotRole,
    /// Placeholder shown while empty.
    pub label: &'static str,
    pub filled: bool,
    pub file_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PreviewView {
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateButton {
    pub label: &'static str,
    pub enabled: bool,
    pub busy: bool,
}

/// Everything the upload section displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadView {
    pub mode_heading: &'static str,
    pub modes: Vec<ModeOption>,
    pub upload_heading: &'static str,
    pub slots: Vec<SlotView>,
    pub preview: Option<PreviewView>,
    pub generate: GenerateButton,
    pub status: Option<String>,
    pub ready_hint: Option<&'static str>,
    pub video_url: Option<String>,
    pub error: Option<String>,
}

impl UploadView {
    pub fn from_state(state: &SessionState) -> Self {
        let modes = [UploadMode::Solo, UploadMode::Couple]
            .into_iter()
            .map(|mode| ModeOption {
                mode,
                label: mode.label(),
                selected: mode == state.mode,
            })
            .collect();

        let slots = state
            .slots
            .iter()
            .map(|slot| SlotView {
                role: slot.role,
                label: slot.role.label(),
                filled: slot.filled,
                file_name: slot.file_name.clone(),
            })
            .collect();

        let job = state.job.as_ref();
        let status = job
            .filter(|j| j.status == JobStatus::Pending)
            .map(|j| j.progress.clone());
        let video_url = job
            .filter(|j| j.status == JobStatus::Completed)
            .and_then(|j| j.video_url.clone());
        let error = job
            .filter(|j| j.status == JobStatus::Error)
            .map(|j| j.progress.clone());

        Self {
            mode_heading: MODE_HEADING,
            modes,
            upload_heading: UPLOAD_HEADING,
            slots,
            preview: state.composite.map(|c| PreviewView {
                width: c.width,
                height: c.height,
            }),
            generate: GenerateButton {
                label: if state.is_generating {
                    GENERATING_LABEL
                } else {
                    GENERATE_LABEL
                },
                enabled: state.can_generate,
                busy: state.is_generating,
            },
            status,
            ready_hint: (state.can_generate && job.is_none()).then_some(READY_HINT),
            video_url,
            error,
        }
    }
}

impl UploadView {
    /// Plain-text rendering for terminal hosts.
    pub fn render(&self) -> String {
        let mut lines = Vec::new();

        let modes = self
            .modes
            .iter()
            .map(|m| format!("[{}] {}", if m.selected { "x" } else { " " }, m.label))
            .collect::<Vec<_>>()
            .join("  ");
        lines.push(format!("{}: {modes}", self.mode_heading));

        lines.push(self.upload_heading.to_string());
        for slot in &self.slots {
            let value = match (&slot.file_name, slot.filled) {
                (Some(name), true) => name.as_str(),
                (None, true) => "selected",
                (_, false) => "(empty)",
            };
            lines.push(format!("  {}: {value}", slot.label));
        }

        if let Some(preview) = self.preview {
            lines.push(format!("Preview: {}x{}", preview.width, preview.height));
        }

        let button = if self.generate.enabled {
            format!("[{}]", self.generate.label)
        } else {
            format!("({})", self.generate.label)
        };
        match self.ready_hint {
            Some(hint) => lines.push(format!("{button}  {hint}")),
            None => lines.push(button),
        }

        if let Some(status) = &self.status {
            lines.push(format!("Status: {status}"));
        }
        if let Some(url) = &self.video_url {
            lines.push(format!("Video: {url}"));
        }
        if let Some(error) = &self.error {
            lines.push(format!("Error: {error}"));
        }

        lines.join("\n")
    }
}

/// Text shared alongside a finished video.
pub fn share_text(video_url: &str) -> String {
    format!("Check out my KissYourCrush video! {video_url}")
}
