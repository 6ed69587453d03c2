//! The original and working image buffers of a session.

use pixclean_pipeline::{BgrImage, Dimensions, HsvChannels, RgbImage};

use crate::error::SessionError;

/// Holds the loaded image and the working copy derived from it.
///
/// Both buffers start empty. [`replace`](Self::replace) sets them
/// together; nothing clears them afterwards. Every accessor fails with
/// [`SessionError::NoImageLoaded`] until the first successful load.
#[derive(Debug, Clone, Default)]
pub struct ImageState {
    original: BgrImage,
    current: BgrImage,
}

impl ImageState {
    /// An empty state with no image loaded.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` once an image has been loaded.
    #[must_use]
    pub fn is_loaded(&self) -> bool {
        !self.original.is_empty()
    }

    /// Install a freshly loaded image as both original and current.
    pub fn replace(&mut self, image: BgrImage) {
        self.current = image.clone();
        self.original = image;
    }

    /// The image as loaded, never modified afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    pub fn original(&self) -> Result<&BgrImage, SessionError> {
        if self.is_loaded() {
            Ok(&self.original)
        } else {
            Err(SessionError::NoImageLoaded)
        }
    }

    /// The working image that denoise operates on.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    pub fn current(&self) -> Result<&BgrImage, SessionError> {
        if self.is_loaded() {
            Ok(&self.current)
        } else {
            Err(SessionError::NoImageLoaded)
        }
    }

    /// Replace the working image.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load, so
    /// a working image can never exist without an original.
    pub fn set_current(&mut self, image: BgrImage) -> Result<(), SessionError> {
        if !self.is_loaded() {
            return Err(SessionError::NoImageLoaded);
        }
        self.current = image;
        Ok(())
    }

    /// Discard the working image and start again from the original.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    pub fn rebase(&mut self) -> Result<&BgrImage, SessionError> {
        if !self.is_loaded() {
            return Err(SessionError::NoImageLoaded);
        }
        self.current.clone_from(&self.original);
        Ok(&self.original)
    }

    /// The working image in RGB order.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    pub fn snapshot(&self) -> Result<RgbImage, SessionError> {
        Ok(self.current()?.to_rgb())
    }

    /// Size of the loaded image.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    pub fn dimensions(&self) -> Result<Dimensions, SessionError> {
        let image = self.original()?;
        Ok(Dimensions {
            width: image.width(),
            height: image.height(),
        })
    }

    /// Mean hue of the working image, `0..180`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    pub fn mean_hue(&self) -> Result<u8, SessionError> {
        Ok(HsvChannels::split(self.current()?).mean_hue_8bit())
    }

    /// Mean saturation of the working image, `0..=255`.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::NoImageLoaded`] before the first load.
    pub fn mean_saturation(&self) -> Result<u8, SessionError> {
        Ok(HsvChannels::split(self.current()?).mean_saturation_8bit())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn red_bgr(width: u32, height: u32) -> BgrImage {
        BgrImage::from_rgb(&RgbImage::from_pixel(width, height, image::Rgb([255, 0, 0])))
    }

    #[test]
    fn new_state_has_nothing_loaded() {
        let state = ImageState::new();
        assert!(!state.is_loaded());
        assert!(matches!(state.original(), Err(SessionError::NoImageLoaded)));
        assert!(matches!(state.current(), Err(SessionError::NoImageLoaded)));
        assert!(matches!(state.snapshot(), Err(SessionError::NoImageLoaded)));
        assert!(matches!(state.mean_hue(), Err(SessionError::NoImageLoaded)));
        assert!(matches!(state.mean_saturation(), Err(SessionError::NoImageLoaded)));
    }

    #[test]
    fn set_current_before_load_is_rejected() {
        let mut state = ImageState::new();
        let result = state.set_current(red_bgr(2, 2));
        assert!(matches!(result, Err(SessionError::NoImageLoaded)));
        assert!(!state.is_loaded());
    }

    #[test]
    fn replace_sets_original_and_current() {
        let mut state = ImageState::new();
        state.replace(red_bgr(3, 2));
        assert!(state.is_loaded());
        assert_eq!(state.original().unwrap(), state.current().unwrap());
        assert_eq!(
            state.dimensions().unwrap(),
            Dimensions {
                width: 3,
                height: 2
            }
        );
    }

    #[test]
    fn set_current_leaves_original_alone() {
        let mut state = ImageState::new();
        state.replace(red_bgr(2, 2));
        let gray = BgrImage::from_rgb(&RgbImage::from_pixel(2, 2, image::Rgb([9, 9, 9])));
        state.set_current(gray.clone()).unwrap();
        assert_eq!(state.current().unwrap(), &gray);
        assert_eq!(state.original().unwrap(), &red_bgr(2, 2));
    }

    #[test]
    fn rebase_restores_original() {
        let mut state = ImageState::new();
        assert!(matches!(state.rebase(), Err(SessionError::NoImageLoaded)));

        state.replace(red_bgr(2, 2));
        let gray = BgrImage::from_rgb(&RgbImage::from_pixel(2, 2, image::Rgb([9, 9, 9])));
        state.set_current(gray).unwrap();
        assert_eq!(state.rebase().unwrap(), &red_bgr(2, 2));
        assert_eq!(state.current().unwrap(), &red_bgr(2, 2));
    }

    #[test]
    fn snapshot_is_rgb() {
        let mut state = ImageState::new();
        state.replace(red_bgr(1, 1));
        assert_eq!(state.snapshot().unwrap().get_pixel(0, 0).0, [255, 0, 0]);
    }

    #[test]
    fn statistics_follow_the_working_image() {
        let mut state = ImageState::new();
        state.replace(red_bgr(2, 2));
        assert_eq!(state.mean_hue().unwrap(), 0);
        assert_eq!(state.mean_saturation().unwrap(), 255);

        let blue = BgrImage::from_rgb(&RgbImage::from_pixel(2, 2, image::Rgb([0, 0, 255])));
        state.set_current(blue).unwrap();
        assert_eq!(state.mean_hue().unwrap(), 120);
    }
}
