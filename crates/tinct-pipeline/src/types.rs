//! Shared types for the tinct filter pipeline.

use serde::{Deserialize, Serialize};

/// Re-export `RgbaImage` so downstream crates can exchange materialized
/// rasters without depending on `image` directly.
pub use image::RgbaImage;

/// Raster dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total pixel count (`width * height`).
    #[must_use]
    #[allow(clippy::cast_lossless)]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// Errors surfaced by chain manipulation.
///
/// The recompute protocol itself has almost nothing to report: a
/// recompute with no valid upstream raster is a benign no-op (the chain
/// simply has nothing to show yet), and output dimensions are always
/// derived from the input raster, so they cannot mismatch. What remains
/// are addressing mistakes by the caller.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A stage index past the current tail.
    #[error("stage index {index} out of range for a chain of {len} stages")]
    StageOutOfRange {
        /// The requested index.
        index: usize,
        /// Current chain length, including the source stage.
        len: usize,
    },

    /// A filter operation addressed at the source stage.
    #[error("stage {index} is the source stage and has no filter")]
    NotATransform {
        /// The requested index.
        index: usize,
    },

    /// A parameter name the filter does not expose.
    #[error("filter {filter} has no parameter named {name:?}")]
    UnknownParameter {
        /// Label of the filter that rejected the edit.
        filter: &'static str,
        /// The unrecognized parameter name.
        name: String,
    },

    /// A one-shot run finished with the chain tail unavailable, which
    /// only happens when no source image was supplied.
    #[error("the chain produced no output")]
    NoOutput,
}
