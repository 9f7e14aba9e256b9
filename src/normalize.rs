//! Image normalization for vision model input.
//!
//! Takes arbitrary raster bytes (phone selfie or swatch export) and produces
//! a compact, transport-ready JPEG: EXIF orientation fixed, alpha dropped,
//! longest side bounded, quality 85. Deterministic for identical input bytes
//! and `max_side`, which makes the suggestion cache safe to key on raw bytes.

use std::io::Cursor;

use base64::Engine as _;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use thiserror::Error;
use tracing::debug;

/// Default bound on the longest image side, in pixels.
pub const DEFAULT_MAX_SIDE: u32 = 1024;

/// Fixed lossy re-encode quality (0-100).
pub const JPEG_QUALITY: u8 = 85;

/// Maximum input size in bytes before rejecting.
/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Minimum valid input size in bytes (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Errors from the pure image stage.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("Invalid image input: {0}")]
    InvalidInput(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode image: {0}")]
    Encode(String),
}

/// An image re-encoded to bounded size and fixed quality for transmission.
///
/// Immutable once produced; derived deterministically from the input bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    /// JPEG bytes at quality 85, opaque RGB.
    pub jpeg_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl NormalizedImage {
    /// Self-contained data URI for inline transport to the inference service.
    pub fn to_data_url(&self) -> String {
        let b64 = base64::engine::general_purpose::STANDARD.encode(&self.jpeg_bytes);
        format!("data:image/jpeg;base64,{b64}")
    }
}

/// Normalize raw image bytes for transmission.
///
/// Steps: validate bounds -> decode -> fix EXIF orientation -> drop alpha
/// to opaque RGB -> downscale so the longest side is at most `max_side`
/// (never upscales, aspect ratio preserved) -> re-encode JPEG quality 85.
///
/// Pure function of `(bytes, max_side)`: identical inputs produce
/// byte-identical output.
pub fn normalize(bytes: &[u8], max_side: u32) -> Result<NormalizedImage, NormalizeError> {
    validate_image_bytes(bytes)?;

    let img = image::load_from_memory(bytes)
        .map_err(|e| NormalizeError::Decode(e.to_string()))?;
    let (orig_w, orig_h) = img.dimensions();

    // Phone photos embed rotation in EXIF tag 0x0112 — without this,
    // portrait selfies reach the vision model sideways.
    let img = apply_orientation(img, read_exif_orientation(bytes));

    let rgb = img.to_rgb8();
    let (w, h) = (rgb.width(), rgb.height());
    let (new_w, new_h) = compute_scaled_dimensions(w, h, max_side);

    let scaled = if (new_w, new_h) == (w, h) {
        rgb
    } else {
        image::imageops::resize(&rgb, new_w, new_h, image::imageops::FilterType::CatmullRom)
    };

    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(scaled)
        .write_to(&mut cursor, ImageOutputFormat::Jpeg(JPEG_QUALITY))
        .map_err(|e| NormalizeError::Encode(e.to_string()))?;
    let jpeg_bytes = cursor.into_inner();

    debug!(
        original = format!("{orig_w}x{orig_h}"),
        output = format!("{new_w}x{new_h}"),
        jpeg_size = jpeg_bytes.len(),
        "Image normalized for transmission"
    );

    Ok(NormalizedImage {
        jpeg_bytes,
        width: new_w,
        height: new_h,
    })
}

/// Validate image bytes before decoding.
/// Returns early error for clearly invalid input — saves decode time.
fn validate_image_bytes(bytes: &[u8]) -> Result<(), NormalizeError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(NormalizeError::InvalidInput(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(NormalizeError::InvalidInput(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Compute output dimensions so the longest side is at most `max_side`.
///
/// Uniform scale factor `min(max_side/w, max_side/h, 1.0)`, rounded to the
/// nearest pixel. Small images are NOT upscaled.
pub fn compute_scaled_dimensions(width: u32, height: u32, max_side: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (1, 1);
    }

    let scale = (max_side as f32 / width as f32)
        .min(max_side as f32 / height as f32)
        .min(1.0);

    let new_w = ((width as f32 * scale).round() as u32).max(1).min(max_side.max(1));
    let new_h = ((height as f32 * scale).round() as u32).max(1).min(max_side.max(1));

    (new_w, new_h)
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply an EXIF orientation transform.
///
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        1 => img,
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}
