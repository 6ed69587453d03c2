//! Non-local-means denoising for three-channel images.
//!
//! Each output pixel is a weighted average of every pixel in a square
//! search window around it. A candidate's weight falls off with the mean
//! squared difference between the patch centred on it and the patch
//! centred on the output pixel: `w = exp(-d / h²)`. Patches that look
//! alike contribute most, so texture survives while noise averages out.
//!
//! Coordinates outside the image are clamped to the nearest edge pixel.
//!
//! Patch distances are computed one search offset at a time: the squared
//! difference between the image and its shifted copy goes into a
//! summed-area table, and every patch sum is then read off in constant
//! time. The cost is `O(pixels × search²)` regardless of patch size.

use crate::color::to_u8;
use crate::types::{NlMeansConfig, RgbImage};

/// Denoise `image` with the non-local-means algorithm.
///
/// A non-positive `strength` returns the image unchanged.
#[must_use = "returns the denoised image"]
pub fn non_local_means(image: &RgbImage, config: &NlMeansConfig) -> RgbImage {
    if config.strength <= 0.0 || image.width() == 0 || image.height() == 0 {
        return image.clone();
    }

    let pixels = Pixels::from_rgb(image);
    let (width, height) = (pixels.width, pixels.height);
    let template = i64::from(config.template_radius);
    let search = i64::from(config.search_radius);
    let h_squared = f64::from(config.strength).powi(2);
    let side = 2 * template + 1;
    #[allow(clippy::cast_precision_loss)]
    let samples = (3 * side * side) as f64;

    let mut accum = vec![[0.0f64; 3]; pixels.data.len()];
    let mut total_weight = vec![0.0f64; pixels.data.len()];
    let mut table = SummedArea::new(width + 2 * template, height + 2 * template);

    for oy in -search..=search {
        for ox in -search..=search {
            table.fill(|u, v| {
                let (x, y) = (u - template, v - template);
                squared_difference(pixels.sample(x, y), pixels.sample(x + ox, y + oy))
            });

            for y in 0..height {
                let qy = y + oy;
                if qy < 0 || qy >= height {
                    continue;
                }
                for x in 0..width {
                    let qx = x + ox;
                    if qx < 0 || qx >= width {
                        continue;
                    }
                    #[allow(clippy::cast_precision_loss)]
                    let distance = table.window(x, y, side) as f64 / samples;
                    let weight = (-distance / h_squared).exp();
                    let index = pixels.index(x, y);
                    for (sum, &channel) in accum[index].iter_mut().zip(&pixels.sample(qx, qy)) {
                        *sum += weight * f64::from(channel);
                    }
                    total_weight[index] += weight;
                }
            }
        }
    }

    // The zero offset gives every pixel weight 1, so total_weight > 0.
    let mut out = RgbImage::new(image.width(), image.height());
    for ((pixel, sums), &weight) in out.pixels_mut().zip(&accum).zip(&total_weight) {
        pixel.0 = sums.map(|sum| to_u8(sum / weight));
    }
    out
}

fn squared_difference(a: [u8; 3], b: [u8; 3]) -> u64 {
    a.iter()
        .zip(&b)
        .map(|(&ca, &cb)| u64::from(ca.abs_diff(cb)).pow(2))
        .sum()
}

/// Row-major pixel copy with edge-clamped sampling.
struct Pixels {
    width: i64,
    height: i64,
    data: Vec<[u8; 3]>,
}

impl Pixels {
    fn from_rgb(image: &RgbImage) -> Self {
        Self {
            width: i64::from(image.width()),
            height: i64::from(image.height()),
            data: image.pixels().map(|p| p.0).collect(),
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    const fn index(&self, x: i64, y: i64) -> usize {
        (y * self.width + x) as usize
    }

    fn sample(&self, x: i64, y: i64) -> [u8; 3] {
        let x = x.clamp(0, self.width - 1);
        let y = y.clamp(0, self.height - 1);
        self.data[self.index(x, y)]
    }
}

/// Summed-area table over a `width` x `height` grid of integer values.
///
/// Entry `(x, y)` of `sums` holds the total of every cell above and to
/// the left of `(x, y)`, exclusive, so `sums` has one extra row and
/// column of zeros.
struct SummedArea {
    width: i64,
    height: i64,
    sums: Vec<u64>,
}

impl SummedArea {
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn new(width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            sums: vec![0; ((width + 1) * (height + 1)) as usize],
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    const fn at(&self, x: i64, y: i64) -> usize {
        (y * (self.width + 1) + x) as usize
    }

    /// Rebuild the table from `cell(x, y)` for every grid cell.
    fn fill(&mut self, cell: impl Fn(i64, i64) -> u64) {
        for y in 0..self.height {
            let mut row = 0;
            for x in 0..self.width {
                row += cell(x, y);
                let above = self.sums[self.at(x + 1, y)];
                let index = self.at(x + 1, y + 1);
                self.sums[index] = above + row;
            }
        }
    }

    /// Sum of the `side` x `side` window whose top-left cell is `(x, y)`.
    fn window(&self, x: i64, y: i64, side: i64) -> u64 {
        let (x1, y1) = (x + side, y + side);
        self.sums[self.at(x1, y1)] + self.sums[self.at(x, y)]
            - self.sums[self.at(x, y1)]
            - self.sums[self.at(x1, y)]
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn small_config() -> NlMeansConfig {
        NlMeansConfig {
            strength: 10.0,
            template_radius: 1,
            search_radius: 2,
        }
    }

    #[test]
    fn uniform_image_unchanged() {
        let img = RgbImage::from_pixel(6, 6, image::Rgb([90, 120, 150]));
        assert_eq!(non_local_means(&img, &NlMeansConfig::default()), img);
    }

    #[test]
    fn zero_strength_is_identity() {
        let img = RgbImage::from_fn(5, 5, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([(x * 40) as u8, (y * 40) as u8, 7])
        });
        let config = NlMeansConfig {
            strength: 0.0,
            ..small_config()
        };
        assert_eq!(non_local_means(&img, &config), img);
    }

    #[test]
    fn isolated_outlier_is_pulled_toward_neighbours() {
        let mut img = RgbImage::from_pixel(7, 7, image::Rgb([100, 100, 100]));
        img.put_pixel(3, 3, image::Rgb([160, 160, 160]));
        let denoised = non_local_means(&img, &small_config());
        let centre = denoised.get_pixel(3, 3).0[0];
        assert!(centre < 160, "expected outlier to shrink, got {centre}");
        assert!(centre >= 100, "expected result within source range, got {centre}");
    }

    #[test]
    fn output_dimensions_preserved() {
        let img = RgbImage::new(4, 9);
        assert_eq!(non_local_means(&img, &small_config()).dimensions(), (4, 9));
    }

    /// Direct evaluation: every patch compared pixel by pixel.
    fn reference(image: &RgbImage, config: &NlMeansConfig) -> RgbImage {
        let pixels = Pixels::from_rgb(image);
        let (t, s) = (i64::from(config.template_radius), i64::from(config.search_radius));
        let h_squared = f64::from(config.strength).powi(2);
        #[allow(clippy::cast_precision_loss)]
        let samples = (3 * (2 * t + 1) * (2 * t + 1)) as f64;

        RgbImage::from_fn(image.width(), image.height(), |x, y| {
            let (x, y) = (i64::from(x), i64::from(y));
            let mut accum = [0.0f64; 3];
            let mut total = 0.0f64;
            for qy in (y - s).max(0)..=(y + s).min(pixels.height - 1) {
                for qx in (x - s).max(0)..=(x + s).min(pixels.width - 1) {
                    let mut sum = 0u64;
                    for dy in -t..=t {
                        for dx in -t..=t {
                            sum += squared_difference(
                                pixels.sample(x + dx, y + dy),
                                pixels.sample(qx + dx, qy + dy),
                            );
                        }
                    }
                    #[allow(clippy::cast_precision_loss)]
                    let weight = (-(sum as f64 / samples) / h_squared).exp();
                    for (acc, &c) in accum.iter_mut().zip(&pixels.sample(qx, qy)) {
                        *acc += weight * f64::from(c);
                    }
                    total += weight;
                }
            }
            image::Rgb(accum.map(|sum| to_u8(sum / total)))
        })
    }

    #[test]
    fn matches_direct_patch_comparison() {
        let img = RgbImage::from_fn(9, 7, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            image::Rgb([
                ((x * 29 + y * 3) % 256) as u8,
                ((x * 7 + y * 41) % 256) as u8,
                ((x * y * 13) % 256) as u8,
            ])
        });
        for config in [
            small_config(),
            NlMeansConfig {
                strength: 25.0,
                template_radius: 2,
                search_radius: 3,
            },
        ] {
            assert_eq!(non_local_means(&img, &config), reference(&img, &config), "{config:?}");
        }
    }

    #[test]
    fn window_sums_match_brute_force() {
        let mut table = SummedArea::new(5, 4);
        let cell = |x: i64, y: i64| u64::try_from(x * 3 + y * 7 + 1).unwrap();
        table.fill(cell);
        for (x, y, side) in [(0, 0, 1), (1, 1, 3), (2, 0, 3), (0, 1, 3)] {
            let expected: u64 = (y..y + side)
                .flat_map(|v| (x..x + side).map(move |u| (u, v)))
                .map(|(u, v)| cell(u, v))
                .sum();
            assert_eq!(table.window(x, y, side), expected, "({x}, {y}) side {side}");
        }
    }

    #[test]
    fn single_pixel_image_is_unchanged() {
        let img = RgbImage::from_pixel(1, 1, image::Rgb([3, 200, 90]));
        assert_eq!(non_local_means(&img, &NlMeansConfig::default()), img);
    }
}
