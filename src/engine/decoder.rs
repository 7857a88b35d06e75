// src/engine/decoder.rs
//
// Decoder operations: JPEG, PNG, BMP, TIFF, GIF via the image crate.

use crate::buffer::ImageBuffer;
use crate::engine::common::run_with_panic_policy;
use crate::engine::{MAX_DIMENSION, MAX_PIXELS};
use crate::error::LunarzError;
use image::{ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::Path;

// Always use LunarzError so decode failures stay classified as Decode /
// UnsupportedInput rather than generic internal errors.
type DecoderResult<T> = std::result::Result<T, LunarzError>;

/// Input formats this crate decodes.
const SUPPORTED_INPUT: [ImageFormat; 5] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
    ImageFormat::Gif,
];

/// Detect input format using magic bytes. Returns None if unknown.
pub fn detect_format(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes).ok()
}

/// Decode encoded bytes into an ImageBuffer.
///
/// The header is inspected first so oversized images are rejected before
/// any pixel memory is allocated.
pub fn decode_image(bytes: &[u8]) -> DecoderResult<(ImageBuffer, ImageFormat)> {
    let format = detect_format(bytes)
        .ok_or_else(|| LunarzError::unsupported_format("unrecognized image data"))?;
    if !SUPPORTED_INPUT.contains(&format) {
        return Err(LunarzError::unsupported_format(format!("{format:?}")));
    }
    ensure_dimensions_safe(bytes)?;

    let img = run_with_panic_policy("decode:image", || {
        image::load_from_memory_with_format(bytes, format)
            .map_err(|e| LunarzError::decode_failed(format!("{format:?}: {e}")))
    })?;
    check_dimensions(img.width(), img.height())?;
    Ok((ImageBuffer::from_dynamic(img)?, format))
}

/// Read and decode a file.
pub fn decode_file(path: &Path) -> DecoderResult<(ImageBuffer, ImageFormat)> {
    let data = std::fs::read(path).map_err(|e| {
        let display = path.display().to_string();
        if e.kind() == std::io::ErrorKind::NotFound {
            LunarzError::file_not_found(display)
        } else {
            LunarzError::file_read_failed(display, e)
        }
    })?;
    decode_image(&data)
}

/// Check if image dimensions are within safe limits.
/// Returns an error if the image is too large (potential decompression bomb).
pub fn check_dimensions(width: u32, height: u32) -> DecoderResult<()> {
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(LunarzError::dimension_exceeds_limit(
            width.max(height),
            MAX_DIMENSION,
        ));
    }
    let pixels = width as u64 * height as u64;
    if pixels > MAX_PIXELS {
        return Err(LunarzError::pixel_count_exceeds_limit(pixels, MAX_PIXELS));
    }
    Ok(())
}

/// Inspect encoded bytes and ensure the image dimensions are safe before decoding.
pub fn ensure_dimensions_safe(bytes: &[u8]) -> DecoderResult<()> {
    let cursor = Cursor::new(bytes);
    if let Ok(reader) = ImageReader::new(cursor).with_guessed_format() {
        if let Ok((width, height)) = reader.into_dimensions() {
            return check_dimensions(width, height);
        }
    }
    Ok(())
}
