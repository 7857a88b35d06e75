// src/engine/kernel.rs
//
// Float planes and separable convolution shared by the neighbourhood
// operators (blur, unsharp, edges). Borders replicate the edge sample.

use crate::buffer::{clamp_u8, ImageBuffer};
use crate::engine::common::EngineResult;

/// One channel of an image as f32 samples, row-major.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Plane {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Plane {
    pub fn new(width: usize, height: usize, data: Vec<f32>) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            width,
            height,
            data,
        }
    }

    /// Extract channel `channel` of interleaved 8-bit samples.
    pub fn from_interleaved(
        samples: &[u8],
        width: usize,
        height: usize,
        channels: usize,
        channel: usize,
    ) -> Self {
        let data = samples
            .iter()
            .skip(channel)
            .step_by(channels)
            .map(|&v| v as f32)
            .collect();
        Self::new(width, height, data)
    }

    #[inline]
    pub fn get_clamped(&self, x: isize, y: isize) -> f32 {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        self.data[y * self.width + x]
    }

    /// Correlate rows with `kx` then columns with `ky`. Kernels have odd length.
    pub fn convolve_separable(&self, kx: &[f32], ky: &[f32]) -> Plane {
        self.convolve_rows(kx).convolve_cols(ky)
    }

    fn convolve_rows(&self, kernel: &[f32]) -> Plane {
        if kernel.len() == 1 {
            return self.scaled(kernel[0]);
        }
        let r = (kernel.len() / 2) as isize;
        let mut out = Vec::with_capacity(self.data.len());
        for y in 0..self.height {
            let row = &self.data[y * self.width..(y + 1) * self.width];
            let last = self.width as isize - 1;
            for x in 0..self.width as isize {
                let mut acc = 0.0f32;
                for (i, &k) in kernel.iter().enumerate() {
                    let sx = (x + i as isize - r).clamp(0, last) as usize;
                    acc += k * row[sx];
                }
                out.push(acc);
            }
        }
        Plane::new(self.width, self.height, out)
    }

    fn convolve_cols(&self, kernel: &[f32]) -> Plane {
        if kernel.len() == 1 {
            return self.scaled(kernel[0]);
        }
        let r = (kernel.len() / 2) as isize;
        let last = self.height as isize - 1;
        let mut out = vec![0.0f32; self.data.len()];
        for (i, &k) in kernel.iter().enumerate() {
            for y in 0..self.height {
                let sy = (y as isize + i as isize - r).clamp(0, last) as usize;
                let src = &self.data[sy * self.width..(sy + 1) * self.width];
                let dst = &mut out[y * self.width..(y + 1) * self.width];
                for (d, s) in dst.iter_mut().zip(src) {
                    *d += k * s;
                }
            }
        }
        Plane::new(self.width, self.height, out)
    }

    fn scaled(&self, factor: f32) -> Plane {
        if factor == 1.0 {
            return self.clone();
        }
        Plane::new(
            self.width,
            self.height,
            self.data.iter().map(|v| v * factor).collect(),
        )
    }

    pub fn to_u8(&self) -> Vec<u8> {
        self.data.iter().map(|&v| clamp_u8(v)).collect()
    }
}

/// Split a buffer into one plane per channel.
pub(crate) fn split_planes(buffer: &ImageBuffer) -> Vec<Plane> {
    let (w, h) = (buffer.width() as usize, buffer.height() as usize);
    let channels = buffer.channels();
    (0..channels)
        .map(|c| Plane::from_interleaved(buffer.samples(), w, h, channels, c))
        .collect()
}

/// Interleave planes back into a buffer shaped like `template`.
pub(crate) fn merge_planes(template: &ImageBuffer, planes: &[Plane]) -> EngineResult<ImageBuffer> {
    let channels = planes.len();
    let len = template.pixel_count() * channels;
    let mut samples = vec![0u8; len];
    for (c, plane) in planes.iter().enumerate() {
        for (i, &v) in plane.data.iter().enumerate() {
            samples[i * channels + c] = clamp_u8(v);
        }
    }
    template.with_samples(samples)
}

/// Sigma a Gaussian of odd `size` gets when none is given.
pub(crate) fn sigma_for_kernel_size(size: u32) -> f32 {
    0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

/// Smallest odd window that covers +-3 sigma.
pub(crate) fn kernel_size_for_sigma(sigma: f32) -> u32 {
    2 * (3.0 * sigma).ceil().max(1.0) as u32 + 1
}

/// Normalized 1-D Gaussian of odd `size`.
pub(crate) fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0];
    }
    let two_sigma_sq = 2.0 * sigma * sigma;
    // A sigma too small to square is a delta.
    if !(two_sigma_sq >= f32::MIN_POSITIVE) {
        return vec![1.0];
    }
    let r = (size / 2) as i32;
    let mut kernel: Vec<f32> = (-r..=r)
        .map(|i| (-((i * i) as f32) / two_sigma_sq).exp())
        .collect();
    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    kernel
}

/// Blur every plane with a separable Gaussian.
pub(crate) fn gaussian_blur_planes(planes: &[Plane], size: u32, sigma: f32) -> Vec<Plane> {
    let kernel = gaussian_kernel(size, sigma);
    planes
        .iter()
        .map(|p| p.convolve_separable(&kernel, &kernel))
        .collect()
}

fn poly_mul(a: &[f32], b: &[f32]) -> Vec<f32> {
    let mut out = vec![0.0; a.len() + b.len() - 1];
    for (i, x) in a.iter().enumerate() {
        for (j, y) in b.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// Unnormalized binomial smoothing kernel (`[1 2 1]` for size 3).
pub(crate) fn binomial_kernel(size: usize) -> Vec<f32> {
    (1..size).fold(vec![1.0], |k, _| poly_mul(&k, &[1.0, 1.0]))
}

/// Derivative of `order` folded into a binomial of odd `size`
/// (`[-1 0 1]` for size 3 order 1, `[1 -2 1]` for size 3 order 2).
pub(crate) fn derivative_kernel(size: usize, order: usize) -> Vec<f32> {
    let smooth = (0..size.saturating_sub(order + 1)).fold(vec![1.0], |k, _| poly_mul(&k, &[1.0, 1.0]));
    (0..order).fold(smooth, |k, _| poly_mul(&k, &[-1.0, 1.0]))
}
