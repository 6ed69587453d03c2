//! Gaussian and median blur primitives.
//!
//! [`gaussian_blur`] builds an explicit 1-D kernel for each axis, so the
//! caller controls the width and height of the window independently as
//! well as sigma. The horizontal pass is kept in `f32` and the result is
//! rounded once after the vertical pass; edges replicate the border
//! pixel. [`median_blur`] wraps [`imageproc::filter::median_filter`] with
//! a square window.
//!
//! Both operate on all three channels independently and are agnostic to
//! channel order.

use crate::color::to_u8;
use crate::types::RgbImage;

/// Build a normalized 1-D Gaussian kernel of `size` taps.
///
/// A non-positive `sigma` is derived from the kernel size as
/// `0.3 * ((size - 1) * 0.5 - 1) + 0.8`, which gives small kernels a
/// sensible spread when the requested sigma truncates to zero.
#[must_use]
pub fn gaussian_kernel(size: u32, sigma: f32) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0];
    }

    #[allow(clippy::cast_precision_loss)]
    let extent = size as f32;
    let sigma = if sigma > 0.0 {
        sigma
    } else {
        0.3f32.mul_add((extent - 1.0).mul_add(0.5, -1.0), 0.8)
    };

    let center = (extent - 1.0) / 2.0;
    let denominator = 2.0 * sigma * sigma;
    let weights: Vec<f32> = (0..size)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let offset = i as f32 - center;
            (-(offset * offset) / denominator).exp()
        })
        .collect();

    let total: f32 = weights.iter().sum();
    weights.into_iter().map(|w| w / total).collect()
}

/// Gaussian blur with an explicit `kernel_width` x `kernel_height` window.
///
/// Kernel extents of one leave that axis untouched.
#[must_use = "returns the blurred image"]
pub fn gaussian_blur(
    image: &RgbImage,
    kernel_width: u32,
    kernel_height: u32,
    sigma: f32,
) -> RgbImage {
    if kernel_width <= 1 && kernel_height <= 1 {
        return image.clone();
    }

    let (width, height) = image.dimensions();
    let horizontal = gaussian_kernel(kernel_width, sigma);
    let vertical = gaussian_kernel(kernel_height, sigma);

    let source: Vec<[f32; 3]> = image.pixels().map(|p| p.0.map(f32::from)).collect();
    let rows = convolve(&source, width, height, &horizontal, Axis::Horizontal);
    let columns = convolve(&rows, width, height, &vertical, Axis::Vertical);

    let mut out = RgbImage::new(width, height);
    for (pixel, value) in out.pixels_mut().zip(&columns) {
        pixel.0 = value.map(|c| to_u8(f64::from(c)));
    }
    out
}

#[derive(Clone, Copy)]
enum Axis {
    Horizontal,
    Vertical,
}

/// One separable pass over a row-major buffer with clamped edges.
fn convolve(
    source: &[[f32; 3]],
    width: u32,
    height: u32,
    kernel: &[f32],
    axis: Axis,
) -> Vec<[f32; 3]> {
    if kernel.len() <= 1 {
        return source.to_vec();
    }

    let (width, height) = (width as usize, height as usize);
    let radius = kernel.len() / 2;
    let mut out = vec![[0.0f32; 3]; source.len()];

    for y in 0..height {
        for x in 0..width {
            let mut sum = [0.0f32; 3];
            for (tap, &weight) in kernel.iter().enumerate() {
                let index = match axis {
                    Axis::Horizontal => y * width + clamp_tap(x, tap, radius, width),
                    Axis::Vertical => clamp_tap(y, tap, radius, height) * width + x,
                };
                for (acc, &c) in sum.iter_mut().zip(&source[index]) {
                    *acc = c.mul_add(weight, *acc);
                }
            }
            out[y * width + x] = sum;
        }
    }
    out
}

/// Position of kernel tap `tap` around `centre`, clamped to `0..len`.
const fn clamp_tap(centre: usize, tap: usize, radius: usize, len: usize) -> usize {
    let position = (centre + tap).saturating_sub(radius);
    if position >= len { len - 1 } else { position }
}

/// Median blur over a square `aperture` x `aperture` window.
///
/// `aperture` is expected to be odd; an even value behaves like the next
/// smaller odd one.
#[must_use = "returns the blurred image"]
pub fn median_blur(image: &RgbImage, aperture: u32) -> RgbImage {
    let radius = aperture / 2;
    if radius == 0 {
        return image.clone();
    }
    imageproc::filter::median_filter(image, radius, radius)
}
