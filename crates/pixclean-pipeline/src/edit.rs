//! Brightness, contrast, hue and saturation editing.
//!
//! [`apply_edit`] always works from the image it is given and never
//! from a previous edit result. The session layer passes the original
//! image, which makes consecutive edits replace one another instead of
//! accumulating.
//!
//! Brightness and contrast are a per-pixel affine map:
//!
//! ```text
//! out = saturate(round(in × contrast / 100 + (brightness − 100)))
//! ```
//!
//! Hue and saturation are validated, and the image passes through an HSV
//! split and merge, but the H and S planes are left as they are. A merge
//! of untouched planes is lossless, so only brightness and contrast
//! change pixel values.

use crate::color::{HsvChannels, to_u8};
use crate::types::{BgrImage, EditParameters, PipelineError};

/// Apply an edit pass to `base` and return the edited image.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidEditParameters`] if any field is out
/// of range. No value is clamped into range.
pub fn apply_edit(base: &BgrImage, params: &EditParameters) -> Result<BgrImage, PipelineError> {
    crate::params::validate_edit(params)?;

    let adjusted = brightness_contrast(base, params.brightness, params.contrast);

    let channels = HsvChannels::split(&adjusted);
    Ok(channels.merge())
}

/// Per-pixel `in × contrast/100 + (brightness − 100)`, saturated to 8 bits.
#[must_use = "returns the adjusted image"]
pub fn brightness_contrast(image: &BgrImage, brightness: i32, contrast: i32) -> BgrImage {
    let gain = f64::from(contrast) / 100.0;
    let bias = f64::from(brightness - EditParameters::NEUTRAL);

    let mut buffer = image.as_bgr_buffer().clone();
    for pixel in buffer.pixels_mut() {
        pixel.0 = pixel.0.map(|c| to_u8(f64::from(c).mul_add(gain, bias)));
    }
    BgrImage::from_bgr_buffer(buffer)
}
