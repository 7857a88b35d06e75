// src/engine/adjust.rs
//
// Linear adjustments. Each one blends the image with a degenerate version
// of itself: `out = degenerate + factor * (in - degenerate)`.
// factor 0 gives the degenerate image, 1 the original, above 1 extrapolates.

use crate::buffer::{clamp_u8, luma_of, ChannelLayout, ImageBuffer};
use crate::engine::common::EngineResult;
use crate::ops::Adjustment;

pub(crate) fn adjust(input: &ImageBuffer, kind: Adjustment, factor: f32) -> EngineResult<ImageBuffer> {
    if factor == 1.0 {
        return Ok(input.clone());
    }
    let degenerate = match kind {
        Adjustment::Brightness => vec![0u8; input.samples().len()],
        Adjustment::Contrast => {
            let mean = mean_luma(input);
            vec![mean; input.samples().len()]
        }
        Adjustment::Saturation => match input.layout() {
            // No colour to remove.
            ChannelLayout::Gray => return Ok(input.clone()),
            ChannelLayout::Rgb => input
                .samples()
                .chunks_exact(3)
                .flat_map(|p| {
                    let l = luma_of(p[0], p[1], p[2]);
                    [l, l, l]
                })
                .collect(),
        },
        Adjustment::Sharpness => smooth(input),
    };
    blend(input, &degenerate, factor)
}

fn blend(input: &ImageBuffer, degenerate: &[u8], factor: f32) -> EngineResult<ImageBuffer> {
    let samples = input
        .samples()
        .iter()
        .zip(degenerate)
        .map(|(&s, &d)| clamp_u8(d as f32 + factor * (s as f32 - d as f32)))
        .collect();
    input.with_samples(samples)
}

/// Mean BT.601 luma, rounded.
fn mean_luma(input: &ImageBuffer) -> u8 {
    let luma = input.luma();
    let n = luma.len() as u64;
    let sum: u64 = luma.iter().map(|&v| v as u64).sum();
    ((sum + n / 2) / n) as u8
}

/// 3x3 smoothing `[1 1 1; 1 5 1; 1 1 1] / 13`, border pixels copied through.
fn smooth(input: &ImageBuffer) -> Vec<u8> {
    const WEIGHTS: [[u32; 3]; 3] = [[1, 1, 1], [1, 5, 1], [1, 1, 1]];
    let (w, h) = (input.width() as usize, input.height() as usize);
    let c = input.channels();
    let src = input.samples();
    let mut out = src.to_vec();
    if w < 3 || h < 3 {
        return out;
    }
    for y in 1..h - 1 {
        for x in 1..w - 1 {
            for ch in 0..c {
                let mut acc = 0u32;
                for (dy, row) in WEIGHTS.iter().enumerate() {
                    for (dx, &wt) in row.iter().enumerate() {
                        let idx = ((y + dy - 1) * w + (x + dx - 1)) * c + ch;
                        acc += wt * src[idx] as u32;
                    }
                }
                out[(y * w + x) * c + ch] = ((acc + 6) / 13) as u8;
            }
        }
    }
    out
}
