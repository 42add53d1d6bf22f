//! tinct: apply an ordered chain of pixel filters to an image.
//!
//! Decodes a source image, assembles a filter chain from the command
//! line, drives the pipeline to completion, writes the result as PNG,
//! and prints per-stage recompute diagnostics.
//!
//! # Usage
//!
//! ```text
//! tinct photo.jpg -o out.png \
//!     --filter grayscale \
//!     --filter brightness:intensity=20 \
//!     --filter color-balance:red=1.2,blue=0.9
//! ```
//!
//! A whole chain can also be supplied as JSON (the serde form of
//! `Vec<Filter>`) via `--chain-json`, which overrides `--filter`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tinct_pipeline::{BoxMullerNoise, Filter, FilterKind, NoiseSource, Pipeline, Raster};

/// Apply an ordered chain of pixel filters to an image.
///
/// Filters run in the order given. Each `--filter` takes a name with
/// optional parameters: `NAME` or `NAME:PARAM=VALUE[,PARAM=VALUE...]`.
#[derive(Parser)]
#[command(name = "tinct", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Output PNG path.
    #[arg(short, long)]
    output: PathBuf,

    /// Filter to append, in chain order. Repeatable.
    ///
    /// Names: grayscale, invert, brightness, contrast, saturation,
    /// color-balance, temperature, fade, grain. Unset parameters keep
    /// their defaults.
    #[arg(long = "filter", value_name = "SPEC")]
    filters: Vec<String>,

    /// Full filter chain as a JSON array.
    ///
    /// When provided, all `--filter` flags are ignored. The JSON must
    /// be a valid serialization of the filter list.
    #[arg(long)]
    chain_json: Option<String>,

    /// Seed for the grain noise source. Entropy-seeded when omitted.
    #[arg(long)]
    seed: Option<u64>,

    /// Output diagnostics as JSON instead of a human-readable report.
    #[arg(long)]
    json: bool,
}

/// Parse one `--filter` specification.
///
/// Accepts `NAME` or `NAME:PARAM=VALUE[,PARAM=VALUE...]`. Parameter
/// names are the ones the filter's control metadata exposes.
fn parse_filter_spec(spec: &str) -> Result<Filter, String> {
    let (name, params) = spec
        .split_once(':')
        .map_or((spec, None), |(name, params)| (name, Some(params)));

    let kind = kind_from_name(name.trim())?;
    let mut filter = Filter::new(kind);

    if let Some(params) = params {
        for assignment in params.split(',') {
            let (key, value) = assignment
                .split_once('=')
                .ok_or_else(|| format!("expected PARAM=VALUE, got '{assignment}'"))?;
            let value: f64 = value
                .trim()
                .parse()
                .map_err(|e| format!("invalid value for '{}': {e}", key.trim()))?;
            filter
                .set_param(key.trim(), value)
                .map_err(|e| e.to_string())?;
        }
    }

    Ok(filter)
}

/// Map a CLI filter name to its catalog kind.
fn kind_from_name(name: &str) -> Result<FilterKind, String> {
    match name.to_ascii_lowercase().as_str() {
        "grayscale" => Ok(FilterKind::Grayscale),
        "invert" => Ok(FilterKind::Invert),
        "brightness" => Ok(FilterKind::Brightness),
        "contrast" => Ok(FilterKind::Contrast),
        "saturation" => Ok(FilterKind::Saturation),
        "color-balance" | "colorbalance" => Ok(FilterKind::ColorBalance),
        "temperature" => Ok(FilterKind::Temperature),
        "fade" => Ok(FilterKind::Fade),
        "grain" => Ok(FilterKind::Grain),
        other => Err(format!("unknown filter '{other}'")),
    }
}

/// Build the filter chain from CLI arguments.
///
/// `--chain-json` wins over `--filter` flags when both are present.
fn chain_from_cli(cli: &Cli) -> Result<Vec<Filter>, String> {
    if let Some(ref json) = cli.chain_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --chain-json: {e}"));
    }
    cli.filters
        .iter()
        .map(|spec| parse_filter_spec(spec))
        .collect()
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let chain = match chain_from_cli(&cli) {
        Ok(chain) => chain,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };
    if chain.is_empty() {
        eprintln!("No filters given; the image passes through unchanged.");
    }

    let image = match image::open(&cli.image_path) {
        Ok(image) => image.to_rgba8(),
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.image_path.display());
            return ExitCode::FAILURE;
        }
    };
    eprintln!(
        "Image: {} ({}x{})",
        cli.image_path.display(),
        image.width(),
        image.height(),
    );

    let noise: Box<dyn NoiseSource> = match cli.seed {
        Some(seed) => Box::new(BoxMullerNoise::seeded(seed)),
        None => Box::new(BoxMullerNoise::from_entropy()),
    };

    let mut pipeline = Pipeline::with_noise(noise);
    pipeline.set_source(Raster::from_rgba(&image));
    for filter in &chain {
        pipeline.append(filter.clone());
    }
    pipeline.run_to_idle();

    let Some(raster) = pipeline.final_raster() else {
        // Unreachable with a decoded source, but the contract of the
        // tail is Option and the CLI reports rather than assumes.
        eprintln!("The chain produced no output.");
        return ExitCode::FAILURE;
    };

    let png = match tinct_export::to_png(raster) {
        Ok(png) => png,
        Err(e) => {
            eprintln!("Export error: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = std::fs::write(&cli.output, &png) {
        eprintln!("Error writing {}: {e}", cli.output.display());
        return ExitCode::FAILURE;
    }
    eprintln!("PNG written to {} ({} bytes)", cli.output.display(), png.len());

    if cli.json {
        match serde_json::to_string_pretty(pipeline.diagnostics()) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", pipeline.diagnostics().report());
    }

    ExitCode::SUCCESS
}
