//! In-memory image decoding and encoding.
//!
//! Raw bytes in, [`BgrImage`] out, and back. Filesystem access lives in
//! `pixclean-io`; this module only knows about byte slices and formats.

use std::io::Cursor;
use std::path::Path;

use image::ImageFormat;

use crate::types::{BgrImage, PipelineError, RgbImage};

/// Extensions accepted by [`format_for_path`], lowercase.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Decode raw image bytes into the working BGR layout.
///
/// Any colour type the `image` crate understands is accepted and
/// converted to 8-bit RGB first; alpha is dropped.
///
/// # Errors
///
/// Returns [`PipelineError::EmptySource`] if `bytes` is empty.
/// Returns [`PipelineError::ImageDecode`] if the format is unrecognized
/// or the data is corrupt.
pub fn decode(bytes: &[u8]) -> Result<BgrImage, PipelineError> {
    if bytes.is_empty() {
        return Err(PipelineError::EmptySource);
    }

    let img = image::load_from_memory(bytes)?;
    Ok(BgrImage::from_rgb(&img.to_rgb8()))
}

/// Pick the output format from a path's extension (case-insensitive).
///
/// # Errors
///
/// Returns [`PipelineError::ImageEncode`] if the extension is missing or
/// not one of [`SUPPORTED_EXTENSIONS`].
pub fn format_for_path(path: &Path) -> Result<ImageFormat, PipelineError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "png" => Ok(ImageFormat::Png),
        "jpg" | "jpeg" => Ok(ImageFormat::Jpeg),
        "tif" | "tiff" => Ok(ImageFormat::Tiff),
        "bmp" => Ok(ImageFormat::Bmp),
        "" => Err(PipelineError::ImageEncode(format!(
            "{} has no file extension",
            path.display()
        ))),
        other => Err(PipelineError::ImageEncode(format!(
            "unsupported output extension .{other} (expected one of {})",
            SUPPORTED_EXTENSIONS.join(", ")
        ))),
    }
}

/// Encode an RGB image to bytes in `format`.
///
/// # Errors
///
/// Returns [`PipelineError::EmptySource`] if `image` has no pixels.
/// Returns [`PipelineError::ImageEncode`] if the encoder fails.
pub fn encode(image: &RgbImage, format: ImageFormat) -> Result<Vec<u8>, PipelineError> {
    if image.width() == 0 || image.height() == 0 {
        return Err(PipelineError::EmptySource);
    }

    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), format)
        .map_err(|e| PipelineError::ImageEncode(e.to_string()))?;
    Ok(bytes)
}
