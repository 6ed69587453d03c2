//! The image session: state, filtering and notifications behind one lock.
//!
//! [`ImageSession`] is the surface a shell (the CLI, a GUI, the worker
//! thread) drives. It owns an [`ImageState`], a [`FilterBackend`] and an
//! [`EventBus`].
//!
//! # Concurrency
//!
//! The state sits behind an [`RwLock`]. Operations that change the
//! working image (`load`, `apply_edit`, `apply_denoise`) take the write
//! lock and publish their event before releasing it, so events come out
//! in the order the mutations happened. Queries and saves take the read
//! lock and may overlap with each other but never with a mutation.
//!
//! # Edits rebase, denoise composes
//!
//! [`apply_edit`](ImageSession::apply_edit) always starts again from the
//! original image, so two edits in a row behave as if only the second
//! one ran. The reset happens before the parameters are checked, so even
//! a rejected edit discards earlier denoise results. [`apply_denoise`](ImageSession::apply_denoise) filters the
//! current working image and stores the result, so successive denoise
//! calls accumulate on top of each other and on top of a prior edit.

use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use pixclean_pipeline::{
    BgrImage, DenoiseConfig, Dimensions, EditParameters, FilterBackend, FilterKind,
    FilterParameters, ImageprocBackend, RgbImage,
};
use tracing::{debug, info, warn};

use crate::codec;
use crate::error::SessionError;
use crate::events::{EventBus, EventKind, ImageEvent};
use crate::state::ImageState;

/// A single image being edited and denoised.
#[derive(Debug, Default)]
pub struct ImageSession<B = ImageprocBackend> {
    state: RwLock<ImageState>,
    events: EventBus,
    backend: B,
}

impl ImageSession {
    /// A session using the default `imageproc` backend.
    #[must_use]
    pub fn new() -> Self {
        Self::with_backend(ImageprocBackend::default())
    }

    /// A session whose default backend uses the non-local-means settings
    /// from `config`.
    #[must_use]
    pub fn from_config(config: &DenoiseConfig) -> Self {
        Self::with_backend(ImageprocBackend::new(config.nl_means))
    }
}

impl<B: FilterBackend> ImageSession<B> {
    /// A session that filters through `backend`.
    pub fn with_backend(backend: B) -> Self {
        Self {
            state: RwLock::new(ImageState::new()),
            events: EventBus::new(),
            backend,
        }
    }

    /// The filtering backend.
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// Register for [`ImageEvent`]s published by this session.
    pub fn subscribe(&self) -> Receiver<ImageEvent> {
        self.events.subscribe()
    }

    /// Returns `true` once an image has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.read_state().is_loaded()
    }

    /// Decode the image at `path` and make it both the original and the
    /// working image. Publishes [`EventKind::Loaded`].
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Decode`] if the file cannot be read or
    /// decoded. The previously loaded image, if any, is kept.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Dimensions, SessionError> {
        let path = path.as_ref();
        let image = codec::read_image(path).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "load failed");
        })?;

        let mut state = self.write_state();
        state.replace(image);
        let dimensions = state.dimensions()?;
        info!(
            path = %path.display(),
            width = dimensions.width,
            height = dimensions.height,
            "image loaded"
        );
        self.publish(EventKind::Loaded, state.snapshot()?);
        Ok(dimensions)
    }

    /// Apply brightness/contrast (and the validated, pass-through
    /// hue/saturation) to the original image and make the result the
    /// working image. Publishes [`EventKind::Edited`] and returns the
    /// result in RGB order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    /// Returns [`SessionError::Pipeline`] wrapping
    /// [`InvalidEditParameters`](pixclean_pipeline::PipelineError::InvalidEditParameters)
    /// if any field is out of range. The working image has already been
    /// reset to the original by then, and no event is published.
    pub fn apply_edit(&self, params: &EditParameters) -> Result<RgbImage, SessionError> {
        let mut state = self.write_state();
        let edited = pixclean_pipeline::apply_edit(state.rebase()?, params)
            .inspect_err(|e| warn!(error = %e, "edit rejected"))?;

        let rgb = edited.to_rgb();
        state.set_current(edited)?;
        self.publish(EventKind::Edited, rgb.clone());
        Ok(rgb)
    }

    /// Denoise the working image in place. Publishes
    /// [`EventKind::Denoised`] and returns the result in RGB order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    /// Returns [`SessionError::Pipeline`] wrapping
    /// [`InvalidParameters`](pixclean_pipeline::PipelineError::InvalidParameters)
    /// if `params` fail validation for `kind`.
    pub fn apply_denoise(
        &self,
        kind: FilterKind,
        params: FilterParameters,
    ) -> Result<RgbImage, SessionError> {
        let mut state = self.write_state();
        let denoised = self.denoise(kind, params, state.current()?)?;

        let rgb = denoised.to_rgb();
        state.set_current(denoised)?;
        self.publish(EventKind::Denoised, rgb.clone());
        Ok(rgb)
    }

    /// Denoise the working image and return the result without storing
    /// it or publishing an event.
    ///
    /// # Errors
    ///
    /// Same as [`apply_denoise`](Self::apply_denoise).
    pub fn denoise_current(
        &self,
        kind: FilterKind,
        params: FilterParameters,
    ) -> Result<RgbImage, SessionError> {
        let state = self.read_state();
        Ok(self.denoise(kind, params, state.current()?)?.to_rgb())
    }

    /// Decode the image at `path`, denoise it and publish
    /// [`EventKind::Denoised`]. The session's own images are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Decode`] if the file cannot be decoded.
    /// Returns [`SessionError::Pipeline`] if `params` fail validation.
    pub fn denoise_file(
        &self,
        path: impl AsRef<Path>,
        kind: FilterKind,
        params: FilterParameters,
    ) -> Result<RgbImage, SessionError> {
        let path = path.as_ref();
        let source = codec::read_image(path).inspect_err(|e| {
            warn!(path = %path.display(), error = %e, "denoise source failed to load");
        })?;

        let rgb = self.denoise(kind, params, &source)?.to_rgb();
        self.publish(EventKind::Denoised, rgb.clone());
        Ok(rgb)
    }

    /// Encode `image` (RGB order) to `path`; the format follows the
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encode`] if `image` is empty, the
    /// extension is unsupported, or writing fails.
    pub fn save(&self, path: impl AsRef<Path>, image: &RgbImage) -> Result<(), SessionError> {
        let path = path.as_ref();
        let _state = self.read_state();
        codec::write_image(path, image)?;
        info!(
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            "image saved"
        );
        Ok(())
    }

    /// Save the working image to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load,
    /// otherwise as [`save`](Self::save).
    pub fn save_current(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let snapshot = self.current_snapshot()?;
        self.save(path, &snapshot)
    }

    /// The working image in RGB order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    pub fn current_snapshot(&self) -> Result<RgbImage, SessionError> {
        self.read_state().snapshot()
    }

    /// Size of the loaded image.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    pub fn dimensions(&self) -> Result<Dimensions, SessionError> {
        self.read_state().dimensions()
    }

    /// Mean hue of the working image in the 8-bit convention (`0..180`).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    pub fn mean_hue(&self) -> Result<u8, SessionError> {
        self.read_state().mean_hue()
    }

    /// Mean saturation of the working image (`0..=255`).
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    pub fn mean_saturation(&self) -> Result<u8, SessionError> {
        self.read_state().mean_saturation()
    }

    fn denoise(
        &self,
        kind: FilterKind,
        params: FilterParameters,
        source: &BgrImage,
    ) -> Result<BgrImage, SessionError> {
        pixclean_pipeline::apply_denoise(&self.backend, kind, params, source)
            .map(|denoised| denoised.image)
            .map_err(|e| {
                warn!(%kind, error = %e, "denoise rejected");
                SessionError::from(e)
            })
    }

    fn publish(&self, kind: EventKind, image: RgbImage) {
        let delivered = self.events.publish(&ImageEvent { kind, image });
        debug!(%kind, subscribers = delivered, "event published");
    }

    fn read_state(&self) -> RwLockReadGuard<'_, ImageState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, ImageState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
