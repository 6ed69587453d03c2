//! Parameter validation and normalization.
//!
//! Denoise parameters self-correct: size-like fields that pass the range
//! check are made odd. Even values move up by one, except at the top of
//! the range where 24 moves down to 23, so a normalized record always
//! passes validation again. Edit parameters do not; any
//! out-of-range field rejects the whole request.
//!
//! Both validators are pure. On failure the caller's values are left
//! untouched because validation works on a copy.

use crate::types::{EditParameters, FilterKind, FilterParameters, PipelineError};

/// Exclusive upper bound on Gaussian kernel width and height.
pub const GAUSSIAN_KERNEL_LIMIT: i32 = 25;

/// Exclusive upper bound on `sigma_tenths`.
pub const SIGMA_TENTHS_LIMIT: i32 = 100;

/// Exclusive upper bound on the median aperture.
pub const APERTURE_LIMIT: i32 = 25;

/// Returns `true` if `n` is odd.
#[must_use]
pub const fn is_odd(n: i32) -> bool {
    n & 1 == 1
}

/// Make `n` odd while keeping it below the exclusive `limit`.
const fn force_odd(n: i32, limit: i32) -> i32 {
    if is_odd(n) {
        n
    } else if n + 1 < limit {
        n + 1
    } else {
        n - 1
    }
}

/// Validate `params` for `kind` and return the normalized copy.
///
/// - Gaussian blur: `0 < kernel_width, kernel_height < 25` and
///   `0 < sigma_tenths < 100`; even kernel extents are incremented,
///   except 24 which becomes 23.
/// - Median blur: `1 < aperture < 25`; an even aperture is incremented,
///   except 24 which becomes 23.
/// - Non-local means: always valid, no field is read.
///
/// Normalizing an already-normalized record returns it unchanged.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidParameters`] naming the first field
/// that is out of range.
pub fn validate(
    kind: FilterKind,
    params: FilterParameters,
) -> Result<FilterParameters, PipelineError> {
    let invalid = |reason: String| PipelineError::InvalidParameters { kind, reason };

    match kind {
        FilterKind::GaussianBlur => {
            check_open_range("kernel_height", params.kernel_height, 0, GAUSSIAN_KERNEL_LIMIT)
                .map_err(invalid)?;
            check_open_range("kernel_width", params.kernel_width, 0, GAUSSIAN_KERNEL_LIMIT)
                .map_err(invalid)?;
            check_open_range("sigma_tenths", params.sigma_tenths, 0, SIGMA_TENTHS_LIMIT)
                .map_err(invalid)?;

            Ok(FilterParameters {
                kernel_width: force_odd(params.kernel_width, GAUSSIAN_KERNEL_LIMIT),
                kernel_height: force_odd(params.kernel_height, GAUSSIAN_KERNEL_LIMIT),
                ..params
            })
        }
        FilterKind::MedianBlur => {
            check_open_range("aperture", params.aperture, 1, APERTURE_LIMIT).map_err(invalid)?;

            Ok(FilterParameters {
                aperture: force_odd(params.aperture, APERTURE_LIMIT),
                ..params
            })
        }
        FilterKind::NonLocalMeansDenoise => Ok(params),
    }
}

/// Validate edit parameters against their inclusive ranges.
///
/// # Errors
///
/// Returns [`PipelineError::InvalidEditParameters`] listing every field
/// that is out of range.
pub fn validate_edit(params: &EditParameters) -> Result<(), PipelineError> {
    let checks = [
        ("brightness", params.brightness, EditParameters::BRIGHTNESS_RANGE),
        ("contrast", params.contrast, EditParameters::CONTRAST_RANGE),
        ("hue", params.hue, EditParameters::HUE_RANGE),
        ("saturation", params.saturation, EditParameters::SATURATION_RANGE),
    ];

    let violations: Vec<String> = checks
        .into_iter()
        .filter(|(_, value, range)| !range.contains(value))
        .map(|(name, value, range)| {
            format!("{name} {value} outside {}..={}", range.start(), range.end())
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(PipelineError::InvalidEditParameters(violations.join(", ")))
    }
}

/// Check `low < value < high`.
fn check_open_range(name: &str, value: i32, low: i32, high: i32) -> Result<(), String> {
    if value > low && value < high {
        Ok(())
    } else {
        Err(format!("{name} {value} outside {}..={}", low + 1, high - 1))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gaussian(width: i32, height: i32, sigma_tenths: i32) -> FilterParameters {
        FilterParameters {
            sigma_tenths,
            kernel_width: width,
            kernel_height: height,
            ..FilterParameters::default()
        }
    }

    fn median(aperture: i32) -> FilterParameters {
        FilterParameters {
            aperture,
            ..FilterParameters::default()
        }
    }

    #[test]
    fn parity_matches_modulo() {
        for n in 0..100 {
            assert_eq!(is_odd(n), n % 2 == 1, "n={n}");
        }
    }

    #[test]
    fn gaussian_kernel_sizes_become_odd() {
        for k in 1..GAUSSIAN_KERNEL_LIMIT {
            let normalized = validate(FilterKind::GaussianBlur, gaussian(k, k, 10)).unwrap();
            let expected = match k {
                24 => 23,
                _ if k % 2 == 0 => k + 1,
                _ => k,
            };
            assert_eq!(normalized.kernel_width, expected, "k={k}");
            assert_eq!(normalized.kernel_height, expected, "k={k}");
            assert!(is_odd(normalized.kernel_width));
            assert!((1..GAUSSIAN_KERNEL_LIMIT).contains(&normalized.kernel_width));
        }
    }

    #[test]
    fn gaussian_width_and_height_normalize_independently() {
        let normalized = validate(FilterKind::GaussianBlur, gaussian(4, 7, 30)).unwrap();
        assert_eq!(normalized.kernel_width, 5);
        assert_eq!(normalized.kernel_height, 7);
    }

    #[test]
    fn gaussian_never_alters_sigma() {
        for tenths in [1, 10, 15, 99] {
            let normalized = validate(FilterKind::GaussianBlur, gaussian(3, 3, tenths)).unwrap();
            assert_eq!(normalized.sigma_tenths, tenths);
        }
    }

    #[test]
    fn gaussian_out_of_range_rejected() {
        let cases = [
            gaussian(0, 3, 10),
            gaussian(3, 0, 10),
            gaussian(25, 3, 10),
            gaussian(3, 25, 10),
            gaussian(-2, 3, 10),
            gaussian(3, 3, 0),
            gaussian(3, 3, 100),
        ];
        for params in cases {
            let result = validate(FilterKind::GaussianBlur, params);
            assert!(
                matches!(
                    result,
                    Err(PipelineError::InvalidParameters {
                        kind: FilterKind::GaussianBlur,
                        ..
                    })
                ),
                "expected rejection for {params:?}, got {result:?}",
            );
        }
    }

    #[test]
    fn median_apertures_become_odd() {
        for a in 2..APERTURE_LIMIT {
            let normalized = validate(FilterKind::MedianBlur, median(a)).unwrap();
            let expected = match a {
                24 => 23,
                _ if a % 2 == 0 => a + 1,
                _ => a,
            };
            assert_eq!(normalized.aperture, expected, "a={a}");
            assert!(is_odd(normalized.aperture));
            assert!((3..APERTURE_LIMIT).contains(&normalized.aperture));
        }
    }

    #[test]
    fn median_bounds_rejected_not_normalized() {
        for a in [i32::MIN, -1, 0, 1, 25, 26, 100] {
            let result = validate(FilterKind::MedianBlur, median(a));
            assert!(result.is_err(), "aperture {a} should be rejected");
        }
    }

    #[test]
    fn median_ignores_gaussian_fields() {
        let params = FilterParameters {
            sigma_tenths: -5,
            kernel_width: 0,
            kernel_height: 400,
            aperture: 4,
        };
        let normalized = validate(FilterKind::MedianBlur, params).unwrap();
        assert_eq!(normalized.aperture, 5);
        assert_eq!(normalized.kernel_height, 400);
    }

    #[test]
    fn nl_means_always_valid() {
        let params = FilterParameters {
            sigma_tenths: -1,
            kernel_width: -1,
            kernel_height: -1,
            aperture: -1,
        };
        assert_eq!(
            validate(FilterKind::NonLocalMeansDenoise, params).unwrap(),
            params
        );
    }

    #[test]
    fn validation_is_idempotent() {
        let gaussians = (1..GAUSSIAN_KERNEL_LIMIT)
            .map(|k| (FilterKind::GaussianBlur, gaussian(k, GAUSSIAN_KERNEL_LIMIT - k, 45)));
        let medians = (2..APERTURE_LIMIT).map(|a| (FilterKind::MedianBlur, median(a)));
        for (kind, params) in gaussians.chain(medians) {
            let once = validate(kind, params).unwrap();
            let twice = validate(kind, once).unwrap();
            assert_eq!(once, twice, "{kind} {params:?}");
        }
    }

    #[test]
    fn upper_edge_normalizes_down_into_range() {
        let normalized = validate(FilterKind::GaussianBlur, gaussian(24, 24, 10)).unwrap();
        assert_eq!((normalized.kernel_width, normalized.kernel_height), (23, 23));
        let normalized = validate(FilterKind::MedianBlur, median(24)).unwrap();
        assert_eq!(normalized.aperture, 23);
    }

    #[test]
    fn rejection_names_field() {
        let err = validate(FilterKind::MedianBlur, median(30)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid median-blur parameters: aperture 30 outside 2..=24"
        );
    }

    // --- edit parameters ---

    #[test]
    fn edit_boundaries_accepted() {
        for params in [
            EditParameters {
                brightness: 1,
                contrast: 1,
                hue: 0,
                saturation: 0,
            },
            EditParameters {
                brightness: 200,
                contrast: 200,
                hue: 179,
                saturation: 255,
            },
        ] {
            assert!(validate_edit(&params).is_ok(), "{params:?}");
        }
    }

    #[test]
    fn edit_out_of_range_rejected() {
        let base = EditParameters::default();
        let cases = [
            EditParameters { brightness: 0, ..base },
            EditParameters { brightness: 201, ..base },
            EditParameters { contrast: 0, ..base },
            EditParameters { contrast: 201, ..base },
            EditParameters { hue: -1, ..base },
            EditParameters { hue: 180, ..base },
            EditParameters { saturation: -1, ..base },
            EditParameters { saturation: 256, ..base },
        ];
        for params in cases {
            assert!(
                matches!(
                    validate_edit(&params),
                    Err(PipelineError::InvalidEditParameters(_))
                ),
                "{params:?}",
            );
        }
    }

    #[test]
    fn edit_rejection_lists_every_field() {
        let params = EditParameters {
            brightness: 0,
            contrast: 100,
            hue: 500,
            saturation: 0,
        };
        let err = validate_edit(&params).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid edit parameters: brightness 0 outside 1..=200, hue 500 outside 0..=179",
        );
    }
}
