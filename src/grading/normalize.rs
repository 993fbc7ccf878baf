//! Image normalization for vision model transport.
//!
//! Turns an arbitrary user photo into a bounded-size, bounded-quality
//! JPEG: decode, fix EXIF orientation, resize so the larger dimension
//! never exceeds the configured maximum (aspect ratio preserved), then
//! re-encode at a fixed quality. Re-encoding happens even when no
//! resize is needed — the output container is always JPEG regardless
//! of input format, and the one artifact serves both transport and
//! display.
//!
//! The whole transform is CPU-bound, so it runs on the blocking pool
//! behind a single await point. No disk or network I/O.

use std::io::Cursor;

use base64::Engine as _;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat};
use tracing::debug;

use super::GradingError;

/// Maximum input size (bytes) before rejecting outright.
/// Prevents OOM on corrupt/adversarial files.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Minimum plausible image size in bytes (smallest valid PNG is ~67).
const MIN_IMAGE_BYTES: usize = 67;

/// Resize and re-encode parameters, taken from `GraderConfig`.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    /// Upper bound on the larger output dimension.
    pub max_dimension: u32,
    /// JPEG quality factor (1-100).
    pub jpeg_quality: u8,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_dimension: crate::config::DEFAULT_MAX_DIMENSION,
            jpeg_quality: crate::config::DEFAULT_JPEG_QUALITY,
        }
    }
}

/// Derived, immutable normalization artifact.
///
/// Invariant: `max(width, height) <= options.max_dimension`, aspect
/// ratio equal to the (orientation-corrected) source within rounding.
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    /// Self-describing JPEG payload at the configured quality.
    pub jpeg_bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl NormalizedImage {
    pub const MIME_TYPE: &'static str = "image/jpeg";

    /// Renderable display source. Deliberately the same bytes as the
    /// transport payload — one artifact, no second encode round trip.
    pub fn data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            Self::MIME_TYPE,
            base64::engine::general_purpose::STANDARD.encode(&self.jpeg_bytes)
        )
    }
}

/// Normalize raw image bytes into a transport-ready JPEG.
///
/// Suspends exactly once, at completion of the blocking
/// decode/resize/encode step. Undecodable input is fatal for the
/// submission — no partial artifact is ever produced.
pub async fn normalize(
    bytes: Vec<u8>,
    options: NormalizeOptions,
) -> Result<NormalizedImage, GradingError> {
    tokio::task::spawn_blocking(move || normalize_blocking(&bytes, options))
        .await
        .map_err(|e| GradingError::Decode(format!("image task failed: {e}")))?
}

/// Synchronous core of the normalizer. Exposed for direct use in tests.
pub fn normalize_blocking(
    bytes: &[u8],
    options: NormalizeOptions,
) -> Result<NormalizedImage, GradingError> {
    validate_image_bytes(bytes)?;

    let decoded = image::load_from_memory(bytes)
        .map_err(|e| GradingError::Decode(format!("failed to decode image: {e}")))?;
    let (source_w, source_h) = decoded.dimensions();

    // Phone photos embed rotation in EXIF tag 0x0112; without this the
    // model sees portrait worksheets sideways.
    let oriented = apply_orientation(decoded, read_exif_orientation(bytes));
    let (w, h) = oriented.dimensions();

    let (out_w, out_h) = bounded_dimensions(w, h, options.max_dimension);
    let resized = if (out_w, out_h) == (w, h) {
        oriented
    } else {
        // CatmullRom: sharp on text strokes without Lanczos ringing.
        oriented.resize_exact(out_w, out_h, FilterType::CatmullRom)
    };

    let jpeg_bytes = encode_jpeg(&resized, options.jpeg_quality)?;

    debug!(
        source = format!("{source_w}x{source_h}"),
        output = format!("{out_w}x{out_h}"),
        jpeg_size = jpeg_bytes.len(),
        quality = options.jpeg_quality,
        "Worksheet image normalized"
    );

    Ok(NormalizedImage {
        jpeg_bytes,
        width: out_w,
        height: out_h,
    })
}

/// Cheap size sanity checks before any decoding work.
fn validate_image_bytes(bytes: &[u8]) -> Result<(), GradingError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(GradingError::Decode(format!(
            "image data too small ({} bytes)",
            bytes.len()
        )));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(GradingError::Decode(format!(
            "image data too large ({} bytes, limit {MAX_IMAGE_BYTES})",
            bytes.len()
        )));
    }
    Ok(())
}

/// Compute output dimensions: unchanged when within the bound,
/// otherwise the larger side clamped to `max` and the other scaled by
/// the same ratio, rounded to nearest (never below 1).
fn bounded_dimensions(w: u32, h: u32, max: u32) -> (u32, u32) {
    let larger = w.max(h);
    if larger <= max {
        return (w, h);
    }
    let scale = max as f64 / larger as f64;
    let shrink = |d: u32| ((d as f64 * scale).round() as u32).max(1);
    if w >= h {
        (max, shrink(h))
    } else {
        (shrink(w), max)
    }
}

/// Read EXIF orientation (tag 0x0112) from the raw container bytes.
/// Returns 1 (normal) when there is no EXIF data or no orientation tag.
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

/// Apply one of the eight EXIF orientation transforms.
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

/// Encode as baseline JPEG at the given quality. Flattens any alpha
/// channel first — the JPEG encoder only accepts RGB.
fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>, GradingError> {
    let rgb = DynamicImage::ImageRgb8(img.to_rgb8());
    let mut buf = Vec::new();
    rgb.write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Jpeg(quality))
        .map_err(|e| GradingError::Decode(format!("failed to encode JPEG: {e}")))?;
    Ok(buf)
}
