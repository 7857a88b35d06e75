// src/engine/denoise.rs
//
// Smoothing operators: edge-preserving bilateral denoise, Gaussian blur,
// median filter.

use crate::buffer::{clamp_u8, ChannelLayout, ImageBuffer};
use crate::engine::common::EngineResult;
use crate::engine::kernel::{gaussian_blur_planes, merge_planes, sigma_for_kernel_size, split_planes};
use crate::error::LunarzError;
use image::{GrayImage, RgbImage};

/// Bilateral window radius (5x5).
const DENOISE_RADIUS: isize = 2;
const DENOISE_SPATIAL_SIGMA: f32 = 1.5;
/// Range sigma per unit of strength; strength 10 gives sigma 20.
const DENOISE_RANGE_SCALE: f32 = 2.0;

/// Bilateral filter with a joint colour distance over all channels.
///
/// Neighbours that differ strongly in colour get little weight, so edges
/// survive while flat-region noise is averaged away.
pub(crate) fn denoise(input: &ImageBuffer, strength: f32) -> EngineResult<ImageBuffer> {
    if strength == 0.0 {
        return Ok(input.clone());
    }
    let range_sigma = strength * DENOISE_RANGE_SCALE;
    let range_denom = 2.0 * range_sigma * range_sigma;
    // Tiny strengths underflow the denominator; in that limit only exact
    // colour matches carry weight, which reproduces the input.
    if !(range_denom >= f32::MIN_POSITIVE) {
        return Ok(input.clone());
    }
    let spatial_denom = 2.0 * DENOISE_SPATIAL_SIGMA * DENOISE_SPATIAL_SIGMA;

    let mut spatial = Vec::with_capacity(((2 * DENOISE_RADIUS + 1) * (2 * DENOISE_RADIUS + 1)) as usize);
    for dy in -DENOISE_RADIUS..=DENOISE_RADIUS {
        for dx in -DENOISE_RADIUS..=DENOISE_RADIUS {
            spatial.push((dx, dy, (-((dx * dx + dy * dy) as f32) / spatial_denom).exp()));
        }
    }

    let (w, h) = (input.width() as isize, input.height() as isize);
    let c = input.channels();
    let src = input.samples();
    let at = |x: isize, y: isize| -> usize {
        let x = x.clamp(0, w - 1);
        let y = y.clamp(0, h - 1);
        (y * w + x) as usize * c
    };

    let mut out = Vec::with_capacity(src.len());
    let mut acc = [0.0f32; 3];
    for y in 0..h {
        for x in 0..w {
            let centre = &src[at(x, y)..at(x, y) + c];
            acc[..c].iter_mut().for_each(|a| *a = 0.0);
            let mut weight_sum = 0.0f32;
            for &(dx, dy, ws) in &spatial {
                let idx = at(x + dx, y + dy);
                let neighbour = &src[idx..idx + c];
                let dist_sq: f32 = neighbour
                    .iter()
                    .zip(centre)
                    .map(|(&n, &m)| {
                        let d = n as f32 - m as f32;
                        d * d
                    })
                    .sum();
                let weight = ws * (-dist_sq / range_denom).exp();
                for (a, &n) in acc.iter_mut().zip(neighbour) {
                    *a += weight * n as f32;
                }
                weight_sum += weight;
            }
            // The centre always contributes weight 1, so weight_sum > 0.
            out.extend(acc[..c].iter().map(|a| clamp_u8(a / weight_sum)));
        }
    }
    input.with_samples(out)
}

/// Separable Gaussian blur with sigma derived from the kernel size.
pub(crate) fn gaussian_blur(input: &ImageBuffer, kernel_size: u32) -> EngineResult<ImageBuffer> {
    if kernel_size <= 1 {
        return Ok(input.clone());
    }
    let planes = gaussian_blur_planes(
        &split_planes(input),
        kernel_size,
        sigma_for_kernel_size(kernel_size),
    );
    merge_planes(input, &planes)
}

/// Per-channel median over a square window of odd side `kernel_size`.
pub(crate) fn median_filter(input: &ImageBuffer, kernel_size: u32) -> EngineResult<ImageBuffer> {
    if kernel_size <= 1 {
        return Ok(input.clone());
    }
    let radius = kernel_size / 2;
    let (w, h) = input.dimensions();
    match input.layout() {
        ChannelLayout::Gray => {
            let img = GrayImage::from_raw(w, h, input.samples().to_vec())
                .ok_or_else(|| LunarzError::internal_panic("gray buffer size mismatch"))?;
            ImageBuffer::from_gray(imageproc::filter::median_filter(&img, radius, radius))
        }
        ChannelLayout::Rgb => {
            let img: RgbImage = input.to_rgb_image();
            ImageBuffer::from_rgb(imageproc::filter::median_filter(&img, radius, radius))
        }
    }
}
