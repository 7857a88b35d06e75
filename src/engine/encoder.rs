// src/engine/encoder.rs
//
// Encoder operations: PNG, JPEG, BMP, plus atomic file writes.

use crate::buffer::{ChannelLayout, ImageBuffer};
use crate::engine::common::run_with_panic_policy;
use crate::error::LunarzError;
use crate::ops::OutputFormat;
use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

type EncoderResult<T> = std::result::Result<T, LunarzError>;

fn color_type(layout: ChannelLayout) -> ExtendedColorType {
    match layout {
        ChannelLayout::Gray => ExtendedColorType::L8,
        ChannelLayout::Rgb => ExtendedColorType::Rgb8,
    }
}

fn write_with<E: ImageEncoder>(encoder: E, buffer: &ImageBuffer, format: &'static str) -> EncoderResult<()> {
    encoder
        .write_image(
            buffer.samples(),
            buffer.width(),
            buffer.height(),
            color_type(buffer.layout()),
        )
        .map_err(|e| LunarzError::encode_failed(format, e.to_string()))
}

/// Encode to PNG
pub fn encode_png(buffer: &ImageBuffer) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:png", || {
        let mut out = Vec::new();
        write_with(PngEncoder::new(&mut out), buffer, "png")?;
        Ok(out)
    })
}

/// Encode to JPEG. `quality` is clamped to 1..=100.
pub fn encode_jpeg(buffer: &ImageBuffer, quality: u8) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:jpeg", || {
        let mut out = Vec::new();
        write_with(
            JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)),
            buffer,
            "jpeg",
        )?;
        Ok(out)
    })
}

/// Encode to BMP
pub fn encode_bmp(buffer: &ImageBuffer) -> EncoderResult<Vec<u8>> {
    run_with_panic_policy("encode:bmp", || {
        let mut out = Vec::new();
        write_with(BmpEncoder::new(&mut out), buffer, "bmp")?;
        Ok(out)
    })
}

pub fn encode(buffer: &ImageBuffer, format: OutputFormat) -> EncoderResult<Vec<u8>> {
    match format {
        OutputFormat::Png => encode_png(buffer),
        OutputFormat::Jpeg { quality } => encode_jpeg(buffer, quality),
        OutputFormat::Bmp => encode_bmp(buffer),
    }
}

/// Encode and write to `path`, the format implied by its extension.
pub fn save(buffer: &ImageBuffer, path: &Path) -> EncoderResult<()> {
    save_as(buffer, path, OutputFormat::from_path(path)?)
}

/// Encode with an explicit format and write atomically to `path`.
pub fn save_as(buffer: &ImageBuffer, path: &Path, format: OutputFormat) -> EncoderResult<()> {
    let encoded = encode(buffer, format)?;
    write_atomic(path, &encoded)
}

/// Write through a temp file in the destination directory, then rename,
/// so readers never observe a partially written image.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> EncoderResult<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut temp_file = NamedTempFile::new_in(dir)
        .map_err(|e| LunarzError::file_write_failed(dir.display().to_string(), e))?;

    let temp_path = temp_file.path().to_path_buf();
    temp_file
        .write_all(bytes)
        .map_err(|e| LunarzError::file_write_failed(temp_path.display().to_string(), e))?;

    temp_file
        .as_file_mut()
        .sync_all()
        .map_err(|e| LunarzError::file_write_failed(temp_path.display().to_string(), e))?;

    // Atomic rename
    temp_file
        .persist(path)
        .map_err(|e| LunarzError::file_write_failed(path.display().to_string(), e.error))?;
    Ok(())
}
