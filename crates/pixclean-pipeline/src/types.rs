//! Shared types for the pixclean processing core.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Re-export `RgbImage` so downstream crates can hand pixel buffers
/// around without depending on `image` directly.
pub use image::RgbImage;

/// An 8-bit, three-channel image stored in blue-green-red order.
///
/// This is the working representation of every pipeline buffer. It
/// reuses the [`RgbImage`] container, but the channel slots hold
/// `[B, G, R]`. Conversion to and from RGB is a pure byte permutation
/// (see [`crate::color::swap_red_blue`]), so no precision is lost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BgrImage(RgbImage);

impl BgrImage {
    /// An image with zero width and height.
    #[must_use]
    pub fn empty() -> Self {
        Self(RgbImage::new(0, 0))
    }

    /// Convert an RGB image into BGR storage order.
    #[must_use]
    pub fn from_rgb(rgb: &RgbImage) -> Self {
        Self(crate::color::swap_red_blue(rgb))
    }

    /// Wrap a buffer whose channels are already in `[B, G, R]` order.
    #[must_use]
    pub const fn from_bgr_buffer(bgr: RgbImage) -> Self {
        Self(bgr)
    }

    /// Convert back to RGB channel order.
    #[must_use]
    pub fn to_rgb(&self) -> RgbImage {
        crate::color::swap_red_blue(&self.0)
    }

    /// The underlying buffer, with channels in `[B, G, R]` order.
    #[must_use]
    pub const fn as_bgr_buffer(&self) -> &RgbImage {
        &self.0
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Returns `true` if the image holds no pixels.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.width() == 0 || self.0.height() == 0
    }
}

impl Default for BgrImage {
    fn default() -> Self {
        Self::empty()
    }
}

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// Selects which denoising primitive to run.
///
/// The set is closed: a value of this type is always dispatchable.
/// Untrusted input (CLI strings, legacy integer tags) is converted with
/// [`FromStr`] or [`TryFrom<i32>`], which is where
/// [`PipelineError::UnknownFilterKind`] is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterKind {
    /// Separable Gaussian blur with an explicit kernel size.
    GaussianBlur,
    /// Per-channel median filter over a square aperture.
    #[default]
    MedianBlur,
    /// Non-local-means denoising over colour patches.
    NonLocalMeansDenoise,
}

impl FilterKind {
    /// All variants, in legacy tag order.
    pub const ALL: [Self; 3] = [
        Self::GaussianBlur,
        Self::MedianBlur,
        Self::NonLocalMeansDenoise,
    ];

    /// Stable kebab-case name, matching the serde representation.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::GaussianBlur => "gaussian-blur",
            Self::MedianBlur => "median-blur",
            Self::NonLocalMeansDenoise => "non-local-means-denoise",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gaussian" | "gaussian-blur" => Ok(Self::GaussianBlur),
            "median" | "median-blur" => Ok(Self::MedianBlur),
            "nl-means" | "nlmeans" | "non-local-means-denoise" => Ok(Self::NonLocalMeansDenoise),
            _ => Err(PipelineError::UnknownFilterKind(s.to_string())),
        }
    }
}

impl TryFrom<i32> for FilterKind {
    type Error = PipelineError;

    /// Legacy integer tags: `0` Gaussian, `1` median, `2` non-local means.
    fn try_from(tag: i32) -> Result<Self, Self::Error> {
        match tag {
            0 => Ok(Self::GaussianBlur),
            1 => Ok(Self::MedianBlur),
            2 => Ok(Self::NonLocalMeansDenoise),
            other => Err(PipelineError::UnknownFilterKind(other.to_string())),
        }
    }
}

/// Numeric parameters for a denoising request.
///
/// Only the fields relevant to the chosen [`FilterKind`] are read.
/// Values are signed because they usually arrive from untrusted input;
/// [`crate::params::validate`] rejects anything out of range and forces
/// size-like fields odd.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterParameters {
    /// Gaussian smoothing strength in tenths. The effective sigma is
    /// `sigma_tenths / 10` with integer truncation.
    pub sigma_tenths: i32,
    /// Gaussian kernel width.
    pub kernel_width: i32,
    /// Gaussian kernel height.
    pub kernel_height: i32,
    /// Median filter window size.
    pub aperture: i32,
}

impl FilterParameters {
    pub const DEFAULT_SIGMA_TENTHS: i32 = 10;
    pub const DEFAULT_KERNEL_SIZE: i32 = 3;
    pub const DEFAULT_APERTURE: i32 = 3;

    /// Whole-unit sigma handed to the Gaussian primitive.
    ///
    /// Truncating division: 1..=9 tenths yield `0`, which the primitive
    /// treats as "derive sigma from the kernel size".
    #[must_use]
    pub const fn effective_sigma(&self) -> i32 {
        self.sigma_tenths / 10
    }
}

impl Default for FilterParameters {
    fn default() -> Self {
        Self {
            sigma_tenths: Self::DEFAULT_SIGMA_TENTHS,
            kernel_width: Self::DEFAULT_KERNEL_SIZE,
            kernel_height: Self::DEFAULT_KERNEL_SIZE,
            aperture: Self::DEFAULT_APERTURE,
        }
    }
}

/// Brightness, contrast, hue and saturation for an edit pass.
///
/// Out-of-range values are rejected, never clamped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditParameters {
    /// `1..=200`; `100` leaves brightness unchanged.
    pub brightness: i32,
    /// `1..=200`; `100` leaves contrast unchanged.
    pub contrast: i32,
    /// `0..=179`, in the 8-bit hue convention.
    pub hue: i32,
    /// `0..=255`.
    pub saturation: i32,
}

impl EditParameters {
    pub const BRIGHTNESS_RANGE: std::ops::RangeInclusive<i32> = 1..=200;
    pub const CONTRAST_RANGE: std::ops::RangeInclusive<i32> = 1..=200;
    pub const HUE_RANGE: std::ops::RangeInclusive<i32> = 0..=179;
    pub const SATURATION_RANGE: std::ops::RangeInclusive<i32> = 0..=255;

    /// Neutral brightness/contrast value.
    pub const NEUTRAL: i32 = 100;
}

impl Default for EditParameters {
    fn default() -> Self {
        Self {
            brightness: Self::NEUTRAL,
            contrast: Self::NEUTRAL,
            hue: 0,
            saturation: 0,
        }
    }
}

/// Tuning for the non-local-means primitive.
///
/// Callers of the dispatcher never pass these; the backend owns them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NlMeansConfig {
    /// Filter strength `h`. Larger values remove more noise and more detail.
    pub strength: f32,
    /// Half-size of the compared patches (a radius of 3 means 7x7 patches).
    pub template_radius: u32,
    /// Half-size of the window searched for similar patches.
    pub search_radius: u32,
}

impl NlMeansConfig {
    pub const DEFAULT_STRENGTH: f32 = 3.0;
    pub const DEFAULT_TEMPLATE_RADIUS: u32 = 3;
    pub const DEFAULT_SEARCH_RADIUS: u32 = 10;
}

impl Default for NlMeansConfig {
    fn default() -> Self {
        Self {
            strength: Self::DEFAULT_STRENGTH,
            template_radius: Self::DEFAULT_TEMPLATE_RADIUS,
            search_radius: Self::DEFAULT_SEARCH_RADIUS,
        }
    }
}

/// Serialisable defaults for a denoise run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseConfig {
    /// Which primitive to run.
    pub filter: FilterKind,
    /// Parameters for `filter`, validated before dispatch.
    pub parameters: FilterParameters,
    /// Edit pass applied before denoising, if any.
    pub edit: Option<EditParameters>,
    /// Settings for the non-local-means backend primitive.
    pub nl_means: NlMeansConfig,
}

impl DenoiseConfig {
    pub const DEFAULT_FILTER: FilterKind = FilterKind::MedianBlur;
}

impl Default for DenoiseConfig {
    fn default() -> Self {
        Self {
            filter: Self::DEFAULT_FILTER,
            parameters: FilterParameters::default(),
            edit: None,
            nl_means: NlMeansConfig::default(),
        }
    }
}

/// Errors produced by the processing core.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The buffer handed to a filter has no pixels.
    #[error("source image is empty")]
    EmptySource,

    /// Denoise parameters are out of range for their filter.
    #[error("invalid {kind} parameters: {reason}")]
    InvalidParameters {
        /// Filter whose rules were violated.
        kind: FilterKind,
        /// Which bound was violated.
        reason: String,
    },

    /// Edit parameters are out of range.
    #[error("invalid edit parameters: {0}")]
    InvalidEditParameters(String),

    /// A filter tag from untrusted input named no known filter.
    #[error("unknown filter kind: {0}")]
    UnknownFilterKind(String),

    /// Failed to decode image bytes.
    #[error("failed to decode image: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// Failed to encode an image.
    #[error("failed to encode image: {0}")]
    ImageEncode(String),
}
