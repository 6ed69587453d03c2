//! pixclean-pipeline: Pure validation, filtering and editing core (sans-IO).
//!
//! Turns a decoded image plus caller-supplied parameters into a new
//! image through one of two paths:
//!
//! - denoise: parameter validation -> filter dispatch (Gaussian, median
//!   or non-local means) -> BGR to RGB conversion
//! - edit: range checks -> brightness/contrast -> HSV split and merge
//!
//! Images are held in BGR channel order internally ([`BgrImage`]) and
//! handed back to callers in RGB.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! buffers and byte slices. Filesystem access, session state, events
//! and the worker thread live in `pixclean-io`.

pub mod blur;
pub mod codec;
pub mod color;
pub mod edit;
pub mod filter;
pub mod nlmeans;
pub mod params;
pub mod types;

pub use color::HsvChannels;
pub use edit::apply_edit;
pub use filter::{Denoised, FilterBackend, ImageprocBackend, apply_denoise};
pub use types::{
    BgrImage, DenoiseConfig, Dimensions, EditParameters, FilterKind, FilterParameters,
    NlMeansConfig, PipelineError, RgbImage,
};
