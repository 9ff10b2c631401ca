//! Side-by-side compositing of two solo photos.
//!
//! Both sources are scaled to a fixed target height (aspect ratio kept)
//! and drawn left to right onto one canvas, which is then encoded as JPEG
//! for upload. The result records the digests of its two sources so a
//! caller can tell whether it still matches the current slots.

use image::imageops::{self, FilterType};
use image::{DynamicImage, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::slot::{base64_bytes, ImageKind, ImageSlot};

/// Default height every source is scaled to before stitching.
pub const DEFAULT_TARGET_HEIGHT: u32 = 720;

/// Widest composite accepted, in pixels.
pub const MAX_COMPOSITE_WIDTH: u32 = 8192;

/// JPEG quality for the composite.
pub const COMPOSITE_JPEG_QUALITY: u8 = 90;

/// File name used when uploading a composite.
pub const COMPOSITE_FILE_NAME: &str = "composite.jpg";

// ---------------------------------------------------------------------------
// CompositeImage
// ---------------------------------------------------------------------------

/// Read-only result of stitching two photos.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeImage {
    /// JPEG-encoded canvas.
    #[serde(with = "base64_bytes")]
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Scaled width of the first (left) source.
    pub left_width: u32,
    /// Scaled width of the second (right) source.
    pub right_width: u32,
    /// SHA-256 digests of the first and second source bytes.
    pub source_digests: [String; 2],
}

impl CompositeImage {
    /// Whether this composite was produced from exactly these two slots,
    /// in this order.
    pub fn matches(&self, first: &ImageSlot, second: &ImageSlot) -> bool {
        self.source_digests[0] == first.digest() && self.source_digests[1] == second.digest()
    }

    /// Encoding of [`bytes`](Self::bytes).
    pub fn kind(&self) -> ImageKind {
        ImageKind::Jpeg
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Width of a `width` x `height` image scaled to `target_height`, rounded
/// to the nearest pixel and never less than 1.
pub fn scaled_width(width: u32, height: u32, target_height: u32) -> u32 {
    if height == 0 {
        return 1;
    }
    let numerator = 2 * u64::from(width) * u64::from(target_height) + u64::from(height);
    let scaled = numerator / (2 * u64::from(height));
    scaled.clamp(1, u64::from(u32::MAX)) as u32
}

// ---------------------------------------------------------------------------
// Compositing
// ---------------------------------------------------------------------------

/// Stitch `first` (left) and `second` (right) at `target_height`.
///
/// Decodes both sources, then composes. Pure function of its inputs.
pub fn composite(
    first: &ImageSlot,
    second: &ImageSlot,
    target_height: u32,
) -> Result<CompositeImage, CoreError> {
    let left = decode(first)?;
    let right = decode(second)?;
    compose(&left, &right, target_height, [first.digest(), second.digest()])
}

/// Async variant of [`composite`] for use on the runtime.
///
/// Both decodes run on the blocking pool concurrently; composing starts
/// only after both have finished. If either decode fails the whole call
/// fails.
pub async fn composite_slots(
    first: &ImageSlot,
    second: &ImageSlot,
    target_height: u32,
) -> Result<CompositeImage, CoreError> {
    let digests = [first.digest(), second.digest()];
    let (left, right) = tokio::try_join!(
        decode_blocking(first.clone()),
        decode_blocking(second.clone())
    )?;

    tokio::task::spawn_blocking(move || compose(&left, &right, target_height, digests))
        .await
        .map_err(|e| CoreError::Internal(format!("Composite task failed: {e}")))?
}

async fn decode_blocking(slot: ImageSlot) -> Result<DynamicImage, CoreError> {
    tokio::task::spawn_blocking(move || decode(&slot))
        .await
        .map_err(|e| CoreError::Internal(format!("Decode task failed: {e}")))?
}

fn decode(slot: &ImageSlot) -> Result<DynamicImage, CoreError> {
    let img = image::load_from_memory_with_format(&slot.bytes, slot.kind.image_format())
        .map_err(|e| CoreError::Decode(format!("{}: {e}", slot.role.name())))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(CoreError::Decode(format!(
            "{}: image has zero size",
            slot.role.name()
        )));
    }
    Ok(img)
}

fn compose(
    left: &DynamicImage,
    right: &DynamicImage,
    target_height: u32,
    source_digests: [String; 2],
) -> Result<CompositeImage, CoreError> {
    if target_height == 0 {
        return Err(CoreError::Validation(
            "Composite target height must be positive".into(),
        ));
    }

    // Checked before any scaled buffer is allocated.
    let left_width = scaled_width(left.width(), left.height(), target_height);
    let right_width = scaled_width(right.width(), right.height(), target_height);
    let width = u64::from(left_width) + u64::from(right_width);
    if width > u64::from(MAX_COMPOSITE_WIDTH) {
        return Err(CoreError::Validation(format!(
            "Composite would be {width} px wide (limit {MAX_COMPOSITE_WIDTH} px); \
             use photos closer to portrait or square"
        )));
    }
    let width = width as u32;

    let left = scale_to_height(left, target_height);
    let right = scale_to_height(right, target_height);

    let mut canvas = RgbImage::new(width, target_height);
    imageops::replace(&mut canvas, &left, 0, 0);
    imageops::replace(&mut canvas, &right, i64::from(left_width), 0);

    let bytes = encode_jpeg(&canvas)?;

    tracing::debug!(
        width,
        height = target_height,
        left_width,
        right_width,
        bytes = bytes.len(),
        "Composite encoded",
    );

    Ok(CompositeImage {
        bytes,
        width,
        height: target_height,
        left_width,
        right_width,
        source_digests,
    })
}

fn scale_to_height(img: &DynamicImage, target_height: u32) -> RgbImage {
    let rgb = img.to_rgb8();
    let width = scaled_width(rgb.width(), rgb.height(), target_height);
    if rgb.width() == width && rgb.height() == target_height {
        return rgb;
    }
    imageops::resize(&rgb, width, target_height, FilterType::Lanczos3)
}

fn encode_jpeg(canvas: &RgbImage) -> Result<Vec<u8>, CoreError> {
    let mut bytes = Vec::new();
    image::codecs::jpeg::JpegEncoder::new_with_quality(&mut bytes, COMPOSITE_JPEG_QUALITY)
        .encode(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| CoreError::Encode(format!("JPEG encoding failed: {e}")))?;
    Ok(bytes)
}
