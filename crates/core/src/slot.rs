//! A user-selected photo bound to a slot role.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::mode::SlotRole;

/// Default upper bound for a single selected photo (10 MiB).
pub const DEFAULT_MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// ImageKind
// ---------------------------------------------------------------------------

/// Accepted image encodings, detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    Png,
    Jpeg,
    Webp,
}

impl ImageKind {
    /// Sniff the encoding of `bytes`. Returns `None` for anything that is
    /// not PNG, JPEG or WebP.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            image::ImageFormat::Png => Some(Self::Png),
            image::ImageFormat::Jpeg => Some(Self::Jpeg),
            image::ImageFormat::WebP => Some(Self::Webp),
            _ => None,
        }
    }

    /// MIME type used for uploads.
    pub fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// File extension (without the dot).
    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Webp => "webp",
        }
    }

    pub(crate) fn image_format(self) -> image::ImageFormat {
        match self {
            Self::Png => image::ImageFormat::Png,
            Self::Jpeg => image::ImageFormat::Jpeg,
            Self::Webp => image::ImageFormat::WebP,
        }
    }
}

// ---------------------------------------------------------------------------
// ImageSlot
// ---------------------------------------------------------------------------

/// Validated image data selected for one slot.
///
/// Bytes are kept in their original encoding; decoding happens only in the
/// compositor. In JSON the bytes are base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSlot {
    pub role: SlotRole,
    pub kind: ImageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
}

impl ImageSlot {
    /// Validate `bytes` and bind them to `role`.
    ///
    /// Rejects empty payloads, payloads larger than `max_bytes`, and data
    /// that is not a PNG, JPEG or WebP image.
    pub fn new(
        role: SlotRole,
        bytes: Vec<u8>,
        file_name: Option<String>,
        max_bytes: usize,
    ) -> Result<Self, CoreError> {
        if bytes.is_empty() {
            return Err(CoreError::Validation(format!(
                "Photo for '{}' is empty",
                role.name()
            )));
        }
        if bytes.len() > max_bytes {
            return Err(CoreError::Validation(format!(
                "Photo for '{}' is {} bytes; the limit is {max_bytes} bytes",
                role.name(),
                bytes.len()
            )));
        }
        let kind = ImageKind::detect(&bytes).ok_or_else(|| {
            CoreError::Validation(format!(
                "Photo for '{}' is not a PNG, JPEG or WebP image",
                role.name()
            ))
        })?;

        Ok(Self {
            role,
            kind,
            file_name,
            bytes,
        })
    }

    /// SHA-256 of the raw bytes.
    pub fn digest(&self) -> String {
        crate::hashing::sha256_hex(&self.bytes)
    }

    /// File name to use when uploading this slot directly.
    pub fn upload_file_name(&self) -> String {
        self.file_name
            .clone()
            .unwrap_or_else(|| format!("{}.{}", self.role.name(), self.kind.extension()))
    }
}

/// Serde adapter storing `Vec<u8>` as standard base64.
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}
