// src/engine/sharpen.rs
//
// Unsharp masking.

use crate::buffer::{clamp_u8, ImageBuffer};
use crate::engine::common::EngineResult;
use crate::engine::kernel::{gaussian_blur_planes, kernel_size_for_sigma, merge_planes, split_planes};

/// `out = in + amount * (in - blur(in))` per channel.
///
/// The blur is a Gaussian with `sigma = radius`, rounded to 8-bit before
/// the difference is taken. Samples whose difference is below `threshold`
/// are passed through unchanged.
pub(crate) fn unsharp_mask(
    input: &ImageBuffer,
    radius: f32,
    amount: f32,
    threshold: u8,
) -> EngineResult<ImageBuffer> {
    if amount == 0.0 {
        return Ok(input.clone());
    }
    let blurred = merge_planes(
        input,
        &gaussian_blur_planes(&split_planes(input), kernel_size_for_sigma(radius), radius),
    )?;
    let threshold = threshold as i16;
    let samples = input
        .samples()
        .iter()
        .zip(blurred.samples())
        .map(|(&s, &b)| {
            let diff = s as i16 - b as i16;
            if diff.abs() < threshold {
                s
            } else {
                clamp_u8(s as f32 + amount * diff as f32)
            }
        })
        .collect();
    input.with_samples(samples)
}
