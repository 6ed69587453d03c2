//! Channel-order and HSV colour conversions.
//!
//! [`swap_red_blue`] converts between RGB and BGR storage by permuting
//! bytes. [`HsvChannels`] holds a BGR image split into hue, saturation
//! and value planes in `f32` precision, so a split followed by a merge
//! reproduces the source pixels exactly.
//!
//! Plane ranges: hue in degrees `[0, 360)`, saturation and value in
//! `[0, 1]`. The 8-bit accessors report hue halved (`0..180`) and
//! saturation scaled to `0..=255`, the usual 8-bit HSV convention. Their
//! means are taken over per-pixel 8-bit values, as if the image had been
//! converted to an 8-bit HSV image first.

use image::Rgb;

use crate::types::{BgrImage, RgbImage};

/// Swap the first and third channel of every pixel.
///
/// Applying it twice returns the original image.
#[must_use = "returns the channel-swapped image"]
pub fn swap_red_blue(image: &RgbImage) -> RgbImage {
    let mut swapped = image.clone();
    for pixel in swapped.pixels_mut() {
        pixel.0.swap(0, 2);
    }
    swapped
}

/// A BGR image decomposed into separate H, S and V planes.
#[derive(Debug, Clone, PartialEq)]
pub struct HsvChannels {
    width: u32,
    height: u32,
    hue: Vec<f32>,
    saturation: Vec<f32>,
    value: Vec<f32>,
}

impl HsvChannels {
    /// Convert a BGR image to HSV and split it into planes.
    #[must_use]
    pub fn split(image: &BgrImage) -> Self {
        let buffer = image.as_bgr_buffer();
        let len = buffer.as_raw().len() / 3;
        let mut hue = Vec::with_capacity(len);
        let mut saturation = Vec::with_capacity(len);
        let mut value = Vec::with_capacity(len);

        for &Rgb([b, g, r]) in buffer.pixels() {
            let (h, s, v) = rgb_to_hsv(r, g, b);
            hue.push(h);
            saturation.push(s);
            value.push(v);
        }

        Self {
            width: image.width(),
            height: image.height(),
            hue,
            saturation,
            value,
        }
    }

    /// Recombine the planes and convert back to BGR.
    #[must_use]
    pub fn merge(&self) -> BgrImage {
        let mut planes = self
            .hue
            .iter()
            .zip(&self.saturation)
            .zip(&self.value)
            .map(|((&h, &s), &v)| hsv_to_rgb(h, s, v));

        let mut buffer = RgbImage::new(self.width, self.height);
        for pixel in buffer.pixels_mut() {
            if let Some([r, g, b]) = planes.next() {
                *pixel = Rgb([b, g, r]);
            }
        }
        BgrImage::from_bgr_buffer(buffer)
    }

    /// Hue plane in degrees.
    #[must_use]
    pub fn hue(&self) -> &[f32] {
        &self.hue
    }

    /// Saturation plane in `[0, 1]`.
    #[must_use]
    pub fn saturation(&self) -> &[f32] {
        &self.saturation
    }

    /// Value plane in `[0, 1]`.
    #[must_use]
    pub fn value(&self) -> &[f32] {
        &self.value
    }

    /// Mean of the per-pixel 8-bit hues (`0..180`), rounded.
    #[must_use]
    pub fn mean_hue_8bit(&self) -> u8 {
        quantized_mean(&self.hue, hue_8bit)
    }

    /// Mean of the per-pixel 8-bit saturations (`0..=255`), rounded.
    #[must_use]
    pub fn mean_saturation_8bit(&self) -> u8 {
        quantized_mean(&self.saturation, |s| to_u8(f64::from(s) * 255.0))
    }
}

/// Hue in degrees to the 8-bit convention; a value rounding up to 180
/// wraps to 0.
fn hue_8bit(degrees: f32) -> u8 {
    match to_u8(f64::from(degrees) / 2.0) {
        180.. => 0,
        h => h,
    }
}

fn quantized_mean(plane: &[f32], quantize: impl Fn(f32) -> u8) -> u8 {
    if plane.is_empty() {
        return 0;
    }
    let sum: u64 = plane.iter().map(|&v| u64::from(quantize(v))).sum();
    #[allow(clippy::cast_precision_loss)]
    let mean = sum as f64 / plane.len() as f64;
    to_u8(mean)
}

fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = f32::from(r) / 255.0;
    let g = f32::from(g) / 255.0;
    let b = f32::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let saturation = if max > 0.0 { delta / max } else { 0.0 };

    let hue = if delta <= 0.0 {
        0.0
    } else if (max - r).abs() < f32::EPSILON {
        let h = 60.0 * ((g - b) / delta);
        if h < 0.0 { h + 360.0 } else { h }
    } else if (max - g).abs() < f32::EPSILON {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    (hue, saturation, max)
}

fn hsv_to_rgb(h: f32, s: f32, v: f32) -> [u8; 3] {
    let chroma = v * s;
    let sector = (h / 60.0).rem_euclid(6.0);
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };

    let m = v - chroma;
    [
        to_u8(f64::from((r + m) * 255.0)),
        to_u8(f64::from((g + m) * 255.0)),
        to_u8(f64::from((b + m) * 255.0)),
    ]
}

/// Round to nearest and saturate to the 8-bit range.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub(crate) fn to_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}
