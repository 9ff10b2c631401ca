//! Upload modes and the photo slots each mode requires.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// UploadMode
// ---------------------------------------------------------------------------

/// How the user supplies the two people for the video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Two single-person photos, stitched side by side before upload.
    #[default]
    Solo,
    /// One photo that already shows both people.
    Couple,
}

impl UploadMode {
    /// Parse from the lowercase wire name.
    pub fn from_name(name: &str) -> Result<Self, CoreError> {
        match name {
            "solo" => Ok(Self::Solo),
            "couple" => Ok(Self::Couple),
            other => Err(CoreError::Validation(format!(
                "Unknown upload mode '{other}'. Must be one of: solo, couple"
            ))),
        }
    }

    /// Wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Solo => "solo",
            Self::Couple => "couple",
        }
    }

    /// Button label shown in the mode picker.
    pub fn label(self) -> &'static str {
        match self {
            Self::Solo => "2 Solo Photos",
            Self::Couple => "1 Couple Photo",
        }
    }

    /// Slots that must be filled before a job can be generated.
    pub fn required_roles(self) -> &'static [SlotRole] {
        match self {
            Self::Solo => &[SlotRole::FirstPerson, SlotRole::SecondPerson],
            Self::Couple => &[SlotRole::Couple],
        }
    }
}

// ---------------------------------------------------------------------------
// SlotRole
// ---------------------------------------------------------------------------

/// Logical position of a selected photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotRole {
    FirstPerson,
    SecondPerson,
    Couple,
}

impl SlotRole {
    /// The mode this slot belongs to.
    pub fn mode(self) -> UploadMode {
        match self {
            Self::FirstPerson | Self::SecondPerson => UploadMode::Solo,
            Self::Couple => UploadMode::Couple,
        }
    }

    /// Placeholder text for an empty slot.
    pub fn label(self) -> &'static str {
        match self {
            Self::FirstPerson => "Upload first photo",
            Self::SecondPerson => "Upload second photo",
            Self::Couple => "Upload couple photo",
        }
    }

    /// Wire name.
    pub fn name(self) -> &'static str {
        match self {
            Self::FirstPerson => "first_person",
            Self::SecondPerson => "second_person",
            Self::Couple => "couple",
        }
    }
}
