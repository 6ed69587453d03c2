//! pixclean: load an image, optionally edit it, denoise it and save it.
//!
//! Every request is routed through a [`ProcessingWorker`] running on its
//! own thread. Progress, errors and every event the session publishes
//! are logged to stderr through `tracing`; the optional statistics go to
//! stdout.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin pixclean -- [OPTIONS] <INPUT>
//! ```
//!
//! Set `RUST_LOG` (e.g. `RUST_LOG=pixclean_io=debug`) for more detail.

#![allow(clippy::print_stdout)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use pixclean_io::{ImageSession, ProcessingWorker, Reply, Request};
use pixclean_pipeline::{DenoiseConfig, EditParameters, FilterKind, FilterParameters};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Edit and denoise a raster image.
///
/// Loads INPUT, applies an optional brightness/contrast edit, runs one
/// denoise filter on the result and writes it to --output.
#[derive(Parser)]
#[command(name = "pixclean", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, TIFF, BMP).
    input: PathBuf,

    /// Where to write the result; the format follows the extension.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Denoise filter.
    #[arg(long, value_enum, default_value_t = CLI_DEFAULT_FILTER)]
    filter: Filter,

    /// Gaussian sigma in tenths (1..=99); whole units are used.
    #[arg(long, default_value_t = FilterParameters::DEFAULT_SIGMA_TENTHS)]
    sigma_tenths: i32,

    /// Gaussian kernel width (1..=24, even values are made odd).
    #[arg(long, default_value_t = FilterParameters::DEFAULT_KERNEL_SIZE)]
    kernel_width: i32,

    /// Gaussian kernel height (1..=24, even values are made odd).
    #[arg(long, default_value_t = FilterParameters::DEFAULT_KERNEL_SIZE)]
    kernel_height: i32,

    /// Median aperture (2..=24, even values are made odd).
    #[arg(long, default_value_t = FilterParameters::DEFAULT_APERTURE)]
    aperture: i32,

    /// Brightness, 1..=200 (100 is neutral). Enables the edit pass.
    #[arg(long)]
    brightness: Option<i32>,

    /// Contrast, 1..=200 (100 is neutral). Enables the edit pass.
    #[arg(long)]
    contrast: Option<i32>,

    /// Hue, 0..=179. Validated but not applied. Enables the edit pass.
    #[arg(long)]
    hue: Option<i32>,

    /// Saturation, 0..=255. Validated but not applied. Enables the edit pass.
    #[arg(long)]
    saturation: Option<i32>,

    /// Full denoise config as a JSON string.
    ///
    /// When provided, all other filter and edit flags are ignored.
    /// The JSON must be a valid `DenoiseConfig` serialization.
    #[arg(long)]
    config_json: Option<String>,

    /// Print mean hue and saturation of the final image.
    #[arg(long)]
    stats: bool,
}

/// Denoise filter selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Filter {
    /// Separable Gaussian blur.
    Gaussian,
    /// Median blur.
    Median,
    /// Non-local-means denoising.
    NlMeans,
}

impl From<Filter> for FilterKind {
    fn from(filter: Filter) -> Self {
        match filter {
            Filter::Gaussian => Self::GaussianBlur,
            Filter::Median => Self::MedianBlur,
            Filter::NlMeans => Self::NonLocalMeansDenoise,
        }
    }
}

const fn filter_from_kind(kind: FilterKind) -> Filter {
    match kind {
        FilterKind::GaussianBlur => Filter::Gaussian,
        FilterKind::MedianBlur => Filter::Median,
        FilterKind::NonLocalMeansDenoise => Filter::NlMeans,
    }
}

/// The CLI default filter, derived from the config default so the two
/// cannot silently diverge.
const CLI_DEFAULT_FILTER: Filter = filter_from_kind(DenoiseConfig::DEFAULT_FILTER);

/// Build a [`DenoiseConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual filter and edit flags are ignored. Otherwise a config is
/// assembled from the flags; the edit pass is enabled when any edit flag
/// is given, with neutral values for the rest.
fn config_from_cli(cli: &Cli) -> Result<DenoiseConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    let any_edit = cli.brightness.is_some()
        || cli.contrast.is_some()
        || cli.hue.is_some()
        || cli.saturation.is_some();
    let neutral = EditParameters::default();
    let edit = any_edit.then(|| EditParameters {
        brightness: cli.brightness.unwrap_or(neutral.brightness),
        contrast: cli.contrast.unwrap_or(neutral.contrast),
        hue: cli.hue.unwrap_or(neutral.hue),
        saturation: cli.saturation.unwrap_or(neutral.saturation),
    });

    Ok(DenoiseConfig {
        filter: cli.filter.into(),
        parameters: FilterParameters {
            sigma_tenths: cli.sigma_tenths,
            kernel_width: cli.kernel_width,
            kernel_height: cli.kernel_height,
            aperture: cli.aperture,
        },
        edit,
        ..DenoiseConfig::default()
    })
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            error!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let session = Arc::new(ImageSession::from_config(&config));
    let events = session.subscribe();
    let worker = ProcessingWorker::new(Arc::clone(&session));
    if let Err(e) = worker.start() {
        error!(error = %e, "failed to start worker");
        return ExitCode::FAILURE;
    }

    let mut requests = vec![Request::Load(cli.input.clone())];
    if let Some(edit) = config.edit {
        requests.push(Request::Edit(edit));
    }
    requests.push(Request::Denoise {
        kind: config.filter,
        parameters: config.parameters,
    });
    if let Some(ref output) = cli.output {
        requests.push(Request::Save(output.clone()));
    }

    for request in requests {
        match worker.call(request) {
            Ok(Reply::Loaded(d)) => {
                info!(input = %cli.input.display(), width = d.width, height = d.height, "input read");
            }
            Ok(Reply::Image(_)) => {}
            Ok(Reply::Saved(path)) => info!(output = %path.display(), "output written"),
            Err(e) => {
                error!(error = %e, "request failed");
                return ExitCode::FAILURE;
            }
        }

        for event in events.try_iter() {
            info!(
                kind = %event.kind,
                width = event.image.width(),
                height = event.image.height(),
                "event"
            );
        }
    }

    if let Err(e) = worker.stop() {
        error!(error = %e, "failed to stop worker");
        return ExitCode::FAILURE;
    }

    if cli.stats {
        match (session.mean_hue(), session.mean_saturation()) {
            (Ok(hue), Ok(saturation)) => {
                println!("mean hue: {hue}");
                println!("mean saturation: {saturation}");
            }
            (Err(e), _) | (_, Err(e)) => {
                error!(error = %e, "failed to compute statistics");
                return ExitCode::FAILURE;
            }
        }
    }

    ExitCode::SUCCESS
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pixclean").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn defaults_match_config_defaults() {
        let config = config_from_cli(&parse(&["in.png"])).unwrap();
        assert_eq!(config, DenoiseConfig::default());
    }

    #[test]
    fn default_filter_round_trips() {
        assert_eq!(FilterKind::from(CLI_DEFAULT_FILTER), DenoiseConfig::DEFAULT_FILTER);
        assert_eq!(DenoiseConfig::DEFAULT_FILTER, FilterKind::default());
    }

    #[test]
    fn filter_flags_are_copied() {
        let config = config_from_cli(&parse(&[
            "in.png",
            "--filter",
            "gaussian",
            "--sigma-tenths",
            "25",
            "--kernel-width",
            "4",
            "--kernel-height",
            "7",
        ]))
        .unwrap();
        assert_eq!(config.filter, FilterKind::GaussianBlur);
        assert_eq!(config.parameters.sigma_tenths, 25);
        assert_eq!(config.parameters.kernel_width, 4);
        assert_eq!(config.parameters.kernel_height, 7);
        assert_eq!(config.edit, None);
    }

    #[test]
    fn any_edit_flag_enables_edit_with_neutral_rest() {
        let config = config_from_cli(&parse(&["in.png", "--contrast", "150"])).unwrap();
        assert_eq!(
            config.edit,
            Some(EditParameters {
                contrast: 150,
                ..EditParameters::default()
            })
        );
    }

    #[test]
    fn config_json_overrides_flags() {
        let cli = parse(&[
            "in.png",
            "--filter",
            "gaussian",
            "--config-json",
            r#"{"filter":"non-local-means-denoise","nl_means":{"strength":5.0}}"#,
        ]);
        let config = config_from_cli(&cli).unwrap();
        assert_eq!(config.filter, FilterKind::NonLocalMeansDenoise);
        assert!((config.nl_means.strength - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn malformed_config_json_is_reported() {
        let cli = parse(&["in.png", "--config-json", "{not json"]);
        let err = config_from_cli(&cli).unwrap_err();
        assert!(err.starts_with("Error parsing --config-json"));
    }
}
