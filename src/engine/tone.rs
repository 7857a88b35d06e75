// src/engine/tone.rs
//
// Point operators built on 256-entry tone reproduction curves:
// gamma correction and histogram equalization.

use crate::buffer::{clamp_u8, ChannelLayout, ImageBuffer};
use crate::engine::common::EngineResult;

/// `lut[v] = round(255 * (v / 255) ^ gamma)`
pub(crate) fn gamma_lut(gamma: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let g = gamma as f64;
    for (v, slot) in lut.iter_mut().enumerate() {
        *slot = clamp_u8(((v as f64 / 255.0).powf(g) * 255.0) as f32);
    }
    lut
}

pub(crate) fn gamma(input: &ImageBuffer, gamma: f32) -> EngineResult<ImageBuffer> {
    if gamma == 1.0 {
        return Ok(input.clone());
    }
    input.map_lut(&gamma_lut(gamma))
}

/// Cumulative-histogram equalization of the luma plane.
///
/// The lowest occupied level maps to 0 and the highest to 255. A single
/// occupied level maps to itself.
pub(crate) fn equalize_lut(histogram: &[u64; 256]) -> [u8; 256] {
    let mut lut = [0u8; 256];
    let total: u64 = histogram.iter().sum();
    let Some(first) = histogram.iter().position(|&n| n > 0) else {
        return lut;
    };
    let cdf_min = histogram[first];
    if cdf_min == total {
        lut[first] = first as u8;
        return lut;
    }
    let scale = 255.0 / (total - cdf_min) as f64;
    let mut cumulative = 0u64;
    for level in first + 1..256 {
        cumulative += histogram[level];
        lut[level] = clamp_u8((cumulative as f64 * scale) as f32);
    }
    lut
}

pub(crate) fn histogram(samples: &[u8]) -> [u64; 256] {
    let mut hist = [0u64; 256];
    for &s in samples {
        hist[s as usize] += 1;
    }
    hist
}

/// Always returns a single-channel buffer.
pub(crate) fn equalize_histogram(input: &ImageBuffer) -> EngineResult<ImageBuffer> {
    let luma = input.luma().into_raw();
    let lut = equalize_lut(&histogram(&luma));
    let samples = luma.iter().map(|&v| lut[v as usize]).collect();
    ImageBuffer::from_raw(input.width(), input.height(), ChannelLayout::Gray, samples)
}
