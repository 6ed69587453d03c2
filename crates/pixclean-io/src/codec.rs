//! Path-based image decoding and encoding.
//!
//! Thin wrappers that add filesystem access to the in-memory codec in
//! [`pixclean_pipeline::codec`] and translate its errors into
//! [`SessionError::Decode`] / [`SessionError::Encode`] carrying the path.
//!
//! Paths are passed to the OS as-is. Whether non-ASCII paths work is up
//! to the platform.

use std::fs;
use std::path::Path;

use pixclean_pipeline::codec;
use pixclean_pipeline::{BgrImage, PipelineError, RgbImage};
use tracing::warn;

use crate::error::SessionError;

/// Read and decode the image at `path` into the working BGR layout.
///
/// # Errors
///
/// Returns [`SessionError::Decode`] if the file cannot be read, is empty,
/// or is not a decodable image.
pub fn read_image(path: &Path) -> Result<BgrImage, SessionError> {
    let decode_error = |reason: String| SessionError::Decode {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = fs::read(path).map_err(|e| decode_error(e.to_string()))?;
    codec::decode(&bytes).map_err(|e| decode_error(e.to_string()))
}

/// Encode `image` (RGB order) and write it to `path`.
///
/// The format is chosen from the path extension. An empty buffer and a
/// codec or write failure both come back as [`SessionError::Encode`];
/// they are told apart only in the log.
///
/// # Errors
///
/// Returns [`SessionError::Encode`] if the extension is unsupported,
/// `image` has no pixels, encoding fails, or the file cannot be written.
pub fn write_image(path: &Path, image: &RgbImage) -> Result<(), SessionError> {
    let encode_error = |reason: String| SessionError::Encode {
        path: path.to_path_buf(),
        reason,
    };

    let bytes = codec::format_for_path(path)
        .and_then(|format| codec::encode(image, format))
        .map_err(|e| {
            if matches!(e, PipelineError::EmptySource) {
                warn!(path = %path.display(), "nothing to save: image is empty");
            } else {
                warn!(path = %path.display(), error = %e, "image encoding failed");
            }
            encode_error(e.to_string())
        })?;

    fs::write(path, bytes).map_err(|e| {
        warn!(path = %path.display(), error = %e, "failed to write image file");
        encode_error(e.to_string())
    })
}
