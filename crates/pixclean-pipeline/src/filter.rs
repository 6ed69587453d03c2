//! Denoise dispatch: validated parameters in, filtered image out.
//!
//! The pixel-level primitives sit behind the [`FilterBackend`] trait so
//! the dispatcher can be exercised against a recording backend in tests
//! and so an alternative implementation can be swapped in without
//! touching the validation or colour-order handling here.
//!
//! [`ImageprocBackend`] is the default, built on `imageproc` plus the
//! crate's own non-local-means routine.

use tracing::debug;

use crate::types::{BgrImage, FilterKind, FilterParameters, NlMeansConfig, PipelineError, RgbImage};

/// Pixel-level filtering primitives.
///
/// Implementations are pure with respect to their inputs and must
/// preserve image dimensions. They are channel-order agnostic; the
/// dispatcher hands them BGR buffers.
pub trait FilterBackend {
    /// Gaussian blur with an explicit kernel. `sigma <= 0` means "derive
    /// from the kernel size".
    fn gaussian_blur(
        &self,
        src: &RgbImage,
        kernel_width: u32,
        kernel_height: u32,
        sigma: f32,
    ) -> RgbImage;

    /// Median blur over an odd square aperture.
    fn median_blur(&self, src: &RgbImage, aperture: u32) -> RgbImage;

    /// Non-local-means colour denoising with backend-chosen settings.
    fn non_local_means(&self, src: &RgbImage) -> RgbImage;
}

/// Default backend backed by `imageproc`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImageprocBackend {
    /// Settings for [`FilterBackend::non_local_means`].
    pub nl_means: NlMeansConfig,
}

impl ImageprocBackend {
    /// Backend with custom non-local-means settings.
    #[must_use]
    pub const fn new(nl_means: NlMeansConfig) -> Self {
        Self { nl_means }
    }
}

impl FilterBackend for ImageprocBackend {
    fn gaussian_blur(
        &self,
        src: &RgbImage,
        kernel_width: u32,
        kernel_height: u32,
        sigma: f32,
    ) -> RgbImage {
        crate::blur::gaussian_blur(src, kernel_width, kernel_height, sigma)
    }

    fn median_blur(&self, src: &RgbImage, aperture: u32) -> RgbImage {
        crate::blur::median_blur(src, aperture)
    }

    fn non_local_means(&self, src: &RgbImage) -> RgbImage {
        crate::nlmeans::non_local_means(src, &self.nl_means)
    }
}

/// Output of a successful dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Denoised {
    /// Filtered image in working (BGR) order.
    pub image: BgrImage,
    /// The parameters after normalization, as actually used.
    pub parameters: FilterParameters,
}

impl Denoised {
    /// The filtered image in RGB order, ready for display or saving.
    #[must_use]
    pub fn to_rgb(&self) -> RgbImage {
        self.image.to_rgb()
    }
}

/// Validate `params` for `kind`, then run the matching primitive on
/// `source`.
///
/// # Errors
///
/// Returns [`PipelineError::EmptySource`] if `source` has no pixels.
/// Returns [`PipelineError::InvalidParameters`] if validation fails.
pub fn apply_denoise<B: FilterBackend + ?Sized>(
    backend: &B,
    kind: FilterKind,
    params: FilterParameters,
    source: &BgrImage,
) -> Result<Denoised, PipelineError> {
    if source.is_empty() {
        return Err(PipelineError::EmptySource);
    }

    let parameters = crate::params::validate(kind, params)?;
    let src = source.as_bgr_buffer();

    let filtered = match kind {
        FilterKind::GaussianBlur => {
            #[allow(clippy::cast_precision_loss)]
            let sigma = parameters.effective_sigma() as f32;
            debug!(
                %kind,
                kernel_width = parameters.kernel_width,
                kernel_height = parameters.kernel_height,
                sigma,
                "dispatching filter"
            );
            backend.gaussian_blur(
                src,
                kernel_extent(parameters.kernel_width),
                kernel_extent(parameters.kernel_height),
                sigma,
            )
        }
        FilterKind::MedianBlur => {
            debug!(%kind, aperture = parameters.aperture, "dispatching filter");
            backend.median_blur(src, kernel_extent(parameters.aperture))
        }
        FilterKind::NonLocalMeansDenoise => {
            debug!(%kind, "dispatching filter");
            backend.non_local_means(src)
        }
    };

    Ok(Denoised {
        image: BgrImage::from_bgr_buffer(filtered),
        parameters,
    })
}

/// Validated extents are positive, so the conversion never fails.
fn kernel_extent(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(1)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::cell::RefCell;

    use super::*;

    /// Records each primitive call and returns the source unchanged.
    #[derive(Default)]
    struct RecordingBackend {
        calls: RefCell<Vec<String>>,
    }

    impl FilterBackend for RecordingBackend {
        fn gaussian_blur(&self, src: &RgbImage, w: u32, h: u32, sigma: f32) -> RgbImage {
            self.calls
                .borrow_mut()
                .push(format!("gaussian {w}x{h} sigma={sigma}"));
            src.clone()
        }

        fn median_blur(&self, src: &RgbImage, aperture: u32) -> RgbImage {
            self.calls.borrow_mut().push(format!("median {aperture}"));
            src.clone()
        }

        fn non_local_means(&self, src: &RgbImage) -> RgbImage {
            self.calls.borrow_mut().push("nl-means".to_string());
            src.clone()
        }
    }

    fn gray_4x4() -> BgrImage {
        BgrImage::from_rgb(&RgbImage::from_pixel(4, 4, image::Rgb([128, 128, 128])))
    }

    #[test]
    fn empty_source_rejected_before_validation() {
        let backend = RecordingBackend::default();
        let params = FilterParameters {
            aperture: 0,
            ..FilterParameters::default()
        };
        let result = apply_denoise(&backend, FilterKind::MedianBlur, params, &BgrImage::empty());
        assert!(matches!(result, Err(PipelineError::EmptySource)));
        assert!(backend.calls.borrow().is_empty());
    }

    #[test]
    fn invalid_parameters_never_reach_backend() {
        let backend = RecordingBackend::default();
        let params = FilterParameters {
            aperture: 25,
            ..FilterParameters::default()
        };
        let result = apply_denoise(&backend, FilterKind::MedianBlur, params, &gray_4x4());
        assert!(matches!(
            result,
            Err(PipelineError::InvalidParameters { .. })
        ));
        assert!(backend.calls.borrow().is_empty());
    }

    #[test]
    fn gaussian_receives_normalized_kernel_and_truncated_sigma() {
        let backend = RecordingBackend::default();
        let params = FilterParameters {
            sigma_tenths: 29,
            kernel_width: 4,
            kernel_height: 6,
            aperture: 0,
        };
        let denoised =
            apply_denoise(&backend, FilterKind::GaussianBlur, params, &gray_4x4()).unwrap();
        assert_eq!(*backend.calls.borrow(), vec!["gaussian 5x7 sigma=2"]);
        assert_eq!(denoised.parameters.kernel_width, 5);
        assert_eq!(denoised.parameters.kernel_height, 7);
        assert_eq!(denoised.parameters.sigma_tenths, 29);
    }

    #[test]
    fn median_receives_normalized_aperture() {
        let backend = RecordingBackend::default();
        let params = FilterParameters {
            aperture: 4,
            ..FilterParameters::default()
        };
        apply_denoise(&backend, FilterKind::MedianBlur, params, &gray_4x4()).unwrap();
        assert_eq!(*backend.calls.borrow(), vec!["median 5"]);
    }

    #[test]
    fn nl_means_ignores_parameters() {
        let backend = RecordingBackend::default();
        let params = FilterParameters {
            sigma_tenths: -3,
            kernel_width: 99,
            kernel_height: -7,
            aperture: 0,
        };
        apply_denoise(&backend, FilterKind::NonLocalMeansDenoise, params, &gray_4x4()).unwrap();
        assert_eq!(*backend.calls.borrow(), vec!["nl-means"]);
    }

    #[test]
    fn median_on_uniform_gray_is_identity() {
        let source = gray_4x4();
        let params = FilterParameters {
            aperture: 4,
            ..FilterParameters::default()
        };
        let denoised =
            apply_denoise(&ImageprocBackend::default(), FilterKind::MedianBlur, params, &source)
                .unwrap();
        assert_eq!(denoised.parameters.aperture, 5);
        assert_eq!(denoised.image, source);
        assert_eq!(
            denoised.to_rgb(),
            RgbImage::from_pixel(4, 4, image::Rgb([128, 128, 128]))
        );
    }

    #[test]
    fn output_is_converted_back_to_rgb() {
        let rgb = RgbImage::from_pixel(3, 3, image::Rgb([10, 20, 30]));
        let denoised = apply_denoise(
            &RecordingBackend::default(),
            FilterKind::NonLocalMeansDenoise,
            FilterParameters::default(),
            &BgrImage::from_rgb(&rgb),
        )
        .unwrap();
        assert_eq!(denoised.image.as_bgr_buffer().get_pixel(0, 0).0, [30, 20, 10]);
        assert_eq!(denoised.to_rgb(), rgb);
    }

    #[test]
    fn backend_is_usable_as_trait_object() {
        let backend: Box<dyn FilterBackend> = Box::new(ImageprocBackend::default());
        let params = FilterParameters {
            sigma_tenths: 10,
            kernel_width: 3,
            kernel_height: 3,
            aperture: 3,
        };
        let result = apply_denoise(backend.as_ref(), FilterKind::GaussianBlur, params, &gray_4x4());
        assert!(result.is_ok());
    }
}
