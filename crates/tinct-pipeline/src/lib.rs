//! tinct-pipeline: ordered per-pixel image filter chains (sans-IO).
//!
//! An image flows through an ordered chain of stages rooted at a source
//! raster. Every stage applies one per-pixel filter to its
//! predecessor's output and owns the raster it produces; editing a
//! stage invalidates it and everything downstream, and recomputation
//! cascades forward through a cooperative task queue.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! pixel buffers. Decoding source images and writing results belong to
//! the callers (`tinct-cli`, `tinct-export`).
//!
//! Two ways in:
//!
//! - [`Pipeline`] for the interactive shape of the problem: append
//!   stages, edit parameters, pump the queue, observe validity.
//! - [`process`] for the one-shot shape: source in, filters applied in
//!   order, final raster out.

pub mod color;
pub mod diagnostics;
pub mod filter;
pub mod noise;
pub mod pipeline;
pub mod raster;
pub mod stage;
pub mod types;

pub use color::Color;
pub use filter::{Filter, FilterKind, ParamSpec};
pub use noise::{BoxMullerNoise, FixedNoise, NoiseSource};
pub use pipeline::Pipeline;
pub use raster::Raster;
pub use stage::{Stage, StageKind, Validity};
pub use types::{Dimensions, PipelineError, RgbaImage};

/// Apply a chain of filters to a source raster in one shot.
///
/// Builds a [`Pipeline`], installs the source, appends every filter in
/// order, runs the queue to idle, and returns the final raster. An
/// empty filter list returns the source unchanged. Grain noise comes
/// from an entropy-seeded source; use [`process_with_noise`] to inject
/// one.
///
/// # Errors
///
/// Returns [`PipelineError::NoOutput`] if the chain finished without a
/// final raster, which only happens for a source raster that was never
/// supplied -- not reachable through this function's signature, but kept
/// as the honest contract of reading the tail.
pub fn process(source: Raster, filters: &[Filter]) -> Result<Raster, PipelineError> {
    process_with_noise(source, filters, Box::new(BoxMullerNoise::from_entropy()))
}

/// [`process`] with an injected grain noise source.
///
/// # Errors
///
/// As [`process`].
pub fn process_with_noise(
    source: Raster,
    filters: &[Filter],
    noise: Box<dyn NoiseSource>,
) -> Result<Raster, PipelineError> {
    let mut pipeline = Pipeline::with_noise(noise);
    pipeline.set_source(source);
    for filter in filters {
        pipeline.append(filter.clone());
    }
    pipeline.run_to_idle();
    pipeline
        .final_raster()
        .cloned()
        .ok_or(PipelineError::NoOutput)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn process_grayscale_then_invert() {
        let source = Raster::from_pixel(1, 1, Color::opaque(200.0, 100.0, 50.0));
        let result = process_with_noise(
            source,
            &[Filter::Grayscale, Filter::Invert],
            Box::new(FixedNoise(0.0)),
        )
        .unwrap();
        let pixel = result.pixel(0, 0);
        assert!((pixel.red - 137.35).abs() < 1e-9);
        assert!((pixel.green - 137.35).abs() < 1e-9);
        assert!((pixel.blue - 137.35).abs() < 1e-9);
        assert!((pixel.alpha - 255.0).abs() < 1e-9);
    }

    #[test]
    fn process_with_no_filters_returns_the_source() {
        let source = Raster::from_pixel(2, 2, Color::opaque(5.0, 6.0, 7.0));
        let result = process(source.clone(), &[]).unwrap();
        assert_eq!(result, source);
    }

    #[test]
    fn process_preserves_dimensions_through_the_chain() {
        let source = Raster::from_pixel(7, 3, Color::opaque(1.0, 2.0, 3.0));
        let result = process(
            source,
            &[
                Filter::Brightness { intensity: 10.0 },
                Filter::Contrast { intensity: 1.5 },
            ],
        )
        .unwrap();
        assert_eq!(result.width(), 7);
        assert_eq!(result.height(), 3);
    }
}
