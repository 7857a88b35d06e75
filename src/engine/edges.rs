// src/engine/edges.rs
//
// Edge detection on the luma plane. Every method yields a Gray buffer of
// the input's dimensions.

use crate::buffer::{ChannelLayout, ImageBuffer};
use crate::engine::common::EngineResult;
use crate::error::LunarzError;
use crate::engine::kernel::{
    binomial_kernel, derivative_kernel, gaussian_kernel, sigma_for_kernel_size, Plane,
};
use crate::ops::EdgeMethod;
use image::GrayImage;

pub(crate) fn detect_edges(
    input: &ImageBuffer,
    method: EdgeMethod,
    pre_blur: Option<u32>,
) -> EngineResult<ImageBuffer> {
    let (w, h) = (input.width() as usize, input.height() as usize);
    let luma = input.luma().into_raw();
    let mut plane = Plane::from_interleaved(&luma, w, h, 1, 0);
    if let Some(size) = pre_blur {
        let kernel = gaussian_kernel(size, sigma_for_kernel_size(size));
        plane = plane.convolve_separable(&kernel, &kernel);
    }

    let samples = match method {
        EdgeMethod::Canny { low, high } => {
            let gray = GrayImage::from_raw(input.width(), input.height(), plane.to_u8())
                .ok_or_else(|| LunarzError::internal_panic("luma plane size mismatch"))?;
            imageproc::edges::canny(&gray, low, high).into_raw()
        }
        EdgeMethod::Sobel { kernel_size } => sobel_magnitude(&plane, kernel_size as usize).to_u8(),
        EdgeMethod::Laplacian { kernel_size } => laplacian_abs(&plane, kernel_size as usize).to_u8(),
    };
    ImageBuffer::from_raw(input.width(), input.height(), ChannelLayout::Gray, samples)
}

/// `sqrt(gx^2 + gy^2)` with derivative kernels of odd `size`.
fn sobel_magnitude(plane: &Plane, size: usize) -> Plane {
    let deriv = derivative_kernel(size, 1);
    let smooth = binomial_kernel(size);
    let gx = plane.convolve_separable(&deriv, &smooth);
    let gy = plane.convolve_separable(&smooth, &deriv);
    let data = gx
        .data
        .iter()
        .zip(&gy.data)
        .map(|(x, y)| (x * x + y * y).sqrt())
        .collect();
    Plane::new(plane.width, plane.height, data)
}

/// `|d2/dx2 + d2/dy2|`. Size 1 is the 4-neighbour kernel.
fn laplacian_abs(plane: &Plane, size: usize) -> Plane {
    let (d2, smooth) = if size == 1 {
        (derivative_kernel(3, 2), vec![1.0])
    } else {
        (derivative_kernel(size, 2), binomial_kernel(size))
    };
    let dxx = plane.convolve_separable(&d2, &smooth);
    let dyy = plane.convolve_separable(&smooth, &d2);
    let data = dxx
        .data
        .iter()
        .zip(&dyy.data)
        .map(|(a, b)| (a + b).abs())
        .collect();
    Plane::new(plane.width, plane.height, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vertical_edge(width: u32, height: u32) -> ImageBuffer {
        let samples = (0..width * height)
            .map(|i| if i % width < width / 2 { 0 } else { 200 })
            .collect();
        ImageBuffer::from_raw(width, height, ChannelLayout::Gray, samples).unwrap()
    }

    #[test]
    fn flat_image_has_no_edges() {
        let img = ImageBuffer::filled(12, 12, ChannelLayout::Rgb, &[90, 90, 90]).unwrap();
        for method in [
            EdgeMethod::Canny {
                low: 100.0,
                high: 200.0,
            },
            EdgeMethod::Sobel { kernel_size: 3 },
            EdgeMethod::Laplacian { kernel_size: 1 },
        ] {
            let out = detect_edges(&img, method, None).unwrap();
            assert_eq!(out.layout(), ChannelLayout::Gray);
            assert!(out.samples().iter().all(|&v| v == 0), "{method:?}");
        }
    }

    #[test]
    fn sobel_responds_at_the_step_and_saturates() {
        let img = vertical_edge(10, 6);
        let out = detect_edges(&img, EdgeMethod::Sobel { kernel_size: 3 }, None).unwrap();
        // gx = 4 * 200 at the step, far above 255
        assert_eq!(out.pixel(5, 3)[0], 255);
        assert_eq!(out.pixel(0, 3)[0], 0);
        assert_eq!(out.pixel(9, 3)[0], 0);
    }

    #[test]
    fn laplacian_size_one_uses_four_neighbours() {
        // Single bright pixel: centre response is |-4 * 50| = 200
        let mut samples = vec![0u8; 25];
        samples[12] = 50;
        let img = ImageBuffer::from_raw(5, 5, ChannelLayout::Gray, samples).unwrap();
        let out = detect_edges(&img, EdgeMethod::Laplacian { kernel_size: 1 }, None).unwrap();
        assert_eq!(out.pixel(2, 2)[0], 200);
        assert_eq!(out.pixel(2, 1)[0], 50);
        assert_eq!(out.pixel(1, 1)[0], 0);
    }

    #[test]
    fn canny_finds_strong_step() {
        let img = vertical_edge(16, 16);
        let out = detect_edges(
            &img,
            EdgeMethod::Canny {
                low: 50.0,
                high: 100.0,
            },
            None,
        )
        .unwrap();
        assert!(out.samples().iter().any(|&v| v == 255));
        assert!(out.samples().iter().all(|&v| v == 0 || v == 255));
    }

    #[test]
    fn pre_blur_softens_sobel_response() {
        let img = vertical_edge(20, 8);
        let sharp = detect_edges(&img, EdgeMethod::Sobel { kernel_size: 3 }, None).unwrap();
        let soft = detect_edges(&img, EdgeMethod::Sobel { kernel_size: 3 }, Some(9)).unwrap();
        let count = |b: &ImageBuffer| b.samples().iter().filter(|&&v| v > 0).count();
        assert!(count(&soft) > count(&sharp));
    }
}
