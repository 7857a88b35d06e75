// src/buffer.rs
//
// ImageBuffer: the immutable raster value stored in history and passed
// between operators. Samples live behind an Arc so history entries and
// batch results share storage instead of copying pixels.

use crate::error::{LunarzError, Result};
use image::{DynamicImage, GrayImage, RgbImage};
use std::fmt;
use std::sync::Arc;

/// Channel layout of an [`ImageBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelLayout {
    /// Single luma channel
    Gray,
    /// Interleaved R, G, B
    Rgb,
}

impl ChannelLayout {
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::Gray => 1,
            ChannelLayout::Rgb => 3,
        }
    }

    pub fn from_channels(channels: usize) -> Result<Self> {
        match channels {
            1 => Ok(ChannelLayout::Gray),
            3 => Ok(ChannelLayout::Rgb),
            other => Err(LunarzError::unsupported_layout(other)),
        }
    }
}

/// An 8-bit raster image that never changes once built.
///
/// Operators take `&ImageBuffer` and return a fresh one. `Clone` only
/// bumps a reference count.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageBuffer {
    width: u32,
    height: u32,
    layout: ChannelLayout,
    samples: Arc<[u8]>,
}

impl fmt::Debug for ImageBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("layout", &self.layout)
            .finish_non_exhaustive()
    }
}

/// `width * height * channels`, or `InvalidBuffer` when it doesn't fit in usize.
fn sample_count(width: u32, height: u32, layout: ChannelLayout) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(layout.channels()))
        .ok_or_else(|| {
            LunarzError::invalid_buffer(format!(
                "{width}x{height} {layout:?} exceeds addressable memory"
            ))
        })
}

impl ImageBuffer {
    /// Build a buffer from interleaved samples.
    ///
    /// Fails with `InvalidBuffer` for zero dimensions or a sample count
    /// that doesn't match `width * height * channels`.
    pub fn from_raw(
        width: u32,
        height: u32,
        layout: ChannelLayout,
        samples: Vec<u8>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(LunarzError::invalid_buffer(format!(
                "dimensions must be non-zero, got {width}x{height}"
            )));
        }
        let expected = sample_count(width, height, layout)?;
        if samples.len() != expected {
            return Err(LunarzError::invalid_buffer(format!(
                "expected {expected} samples for {width}x{height} {layout:?}, got {}",
                samples.len()
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            samples: samples.into(),
        })
    }

    /// Build from a raw sample vector whose channel count is only known at runtime.
    pub fn from_channels(width: u32, height: u32, channels: usize, samples: Vec<u8>) -> Result<Self> {
        Self::from_raw(width, height, ChannelLayout::from_channels(channels)?, samples)
    }

    pub fn from_gray(img: GrayImage) -> Result<Self> {
        let (w, h) = img.dimensions();
        Self::from_raw(w, h, ChannelLayout::Gray, img.into_raw())
    }

    pub fn from_rgb(img: RgbImage) -> Result<Self> {
        let (w, h) = img.dimensions();
        Self::from_raw(w, h, ChannelLayout::Rgb, img.into_raw())
    }

    /// Normalize any decoded image: luma sources stay single-channel,
    /// everything else becomes RGB8. Alpha is dropped.
    pub fn from_dynamic(img: DynamicImage) -> Result<Self> {
        match img {
            DynamicImage::ImageLuma8(gray) => Self::from_gray(gray),
            DynamicImage::ImageLumaA8(_)
            | DynamicImage::ImageLuma16(_)
            | DynamicImage::ImageLumaA16(_) => Self::from_gray(img.to_luma8()),
            DynamicImage::ImageRgb8(rgb) => Self::from_rgb(rgb),
            other => Self::from_rgb(other.to_rgb8()),
        }
    }

    /// Filled with a single value per channel.
    pub fn filled(width: u32, height: u32, layout: ChannelLayout, pixel: &[u8]) -> Result<Self> {
        if pixel.len() != layout.channels() {
            return Err(LunarzError::invalid_buffer(format!(
                "fill pixel has {} samples, layout {layout:?} needs {}",
                pixel.len(),
                layout.channels()
            )));
        }
        // Reject before allocating; from_raw only sees the finished vector.
        crate::engine::check_dimensions(width, height)?;
        let count = sample_count(width, height, layout)?;
        let samples = pixel.iter().copied().cycle().take(count).collect();
        Self::from_raw(width, height, layout, samples)
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    #[inline]
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Samples of pixel (x, y). Panics when out of bounds, like slice indexing.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of bounds for {}x{}",
            self.width,
            self.height
        );
        let c = self.channels();
        let start = (y as usize * self.width as usize + x as usize) * c;
        &self.samples[start..start + c]
    }

    /// True when both buffers point at the same sample storage.
    pub fn shares_samples_with(&self, other: &ImageBuffer) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }

    /// New buffer with the same shape and different samples.
    pub(crate) fn with_samples(&self, samples: Vec<u8>) -> Result<Self> {
        Self::from_raw(self.width, self.height, self.layout, samples)
    }

    /// Map every sample through a 256-entry lookup table.
    pub(crate) fn map_lut(&self, lut: &[u8; 256]) -> Result<Self> {
        self.with_samples(self.samples.iter().map(|&s| lut[s as usize]).collect())
    }

    /// BT.601 luma of every pixel. Gray buffers are returned as-is.
    pub fn luma(&self) -> GrayImage {
        let samples = match self.layout {
            ChannelLayout::Gray => self.samples.to_vec(),
            ChannelLayout::Rgb => self
                .samples
                .chunks_exact(3)
                .map(|p| luma_of(p[0], p[1], p[2]))
                .collect(),
        };
        // Length is width * height by construction.
        GrayImage::from_raw(self.width, self.height, samples)
            .unwrap_or_else(|| GrayImage::new(self.width, self.height))
    }

    /// Convert to an RGB image, replicating gray samples.
    pub fn to_rgb_image(&self) -> RgbImage {
        let samples = match self.layout {
            ChannelLayout::Rgb => self.samples.to_vec(),
            ChannelLayout::Gray => self.samples.iter().flat_map(|&v| [v, v, v]).collect(),
        };
        RgbImage::from_raw(self.width, self.height, samples)
            .unwrap_or_else(|| RgbImage::new(self.width, self.height))
    }

    pub fn to_dynamic(&self) -> DynamicImage {
        match self.layout {
            ChannelLayout::Gray => DynamicImage::ImageLuma8(self.luma()),
            ChannelLayout::Rgb => DynamicImage::ImageRgb8(self.to_rgb_image()),
        }
    }
}

/// BT.601 integer luma, rounded.
#[inline]
pub(crate) fn luma_of(r: u8, g: u8, b: u8) -> u8 {
    ((r as u32 * 299 + g as u32 * 587 + b as u32 * 114 + 500) / 1000) as u8
}

/// Round and clamp a float sample back into 8-bit range.
#[inline]
pub(crate) fn clamp_u8(value: f32) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.round().clamp(0.0, 255.0) as u8
    }
}
