//! Per-pixel color values and the shared luminance primitive.
//!
//! Channels are stored as `f64` rather than bytes because filter
//! arithmetic (brightness, contrast, fade, grain) transiently leaves the
//! displayable [0, 255] range. Clamping to integer channels happens only
//! when a raster is materialized for display via
//! [`Raster::to_rgba`](crate::raster::Raster::to_rgba).

use serde::{Deserialize, Serialize};

/// Weight of the red channel in the relative luminance sum.
pub const LUMA_RED: f64 = 0.2126;
/// Weight of the green channel in the relative luminance sum.
pub const LUMA_GREEN: f64 = 0.7152;
/// Weight of the blue channel in the relative luminance sum.
pub const LUMA_BLUE: f64 = 0.0722;

/// A single pixel value with unclamped `f64` channels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red channel, nominally 0–255.
    pub red: f64,
    /// Green channel, nominally 0–255.
    pub green: f64,
    /// Blue channel, nominally 0–255.
    pub blue: f64,
    /// Alpha channel, nominally 0–255. No shipped filter modifies it.
    pub alpha: f64,
}

impl Color {
    /// Create a color from explicit channel values.
    #[must_use]
    pub const fn new(red: f64, green: f64, blue: f64, alpha: f64) -> Self {
        Self {
            red,
            green,
            blue,
            alpha,
        }
    }

    /// Create a fully opaque color (alpha = 255).
    #[must_use]
    pub const fn opaque(red: f64, green: f64, blue: f64) -> Self {
        Self::new(red, green, blue, 255.0)
    }

    /// Relative luminance: `0.2126·R + 0.7152·G + 0.0722·B`.
    ///
    /// Alpha is excluded. Channels are treated as already linear -- no
    /// gamma correction -- so this is a brightness proxy rather than a
    /// photometric luminance. Shared by the grayscale, saturation, and
    /// fade filters.
    #[must_use]
    pub fn relative_luminance(self) -> f64 {
        LUMA_RED.mul_add(self.red, LUMA_GREEN.mul_add(self.green, LUMA_BLUE * self.blue))
    }

    /// Apply `f` to each of red, green, and blue, leaving alpha as is.
    #[must_use]
    pub fn map_rgb(self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            red: f(self.red),
            green: f(self.green),
            blue: f(self.blue),
            alpha: self.alpha,
        }
    }
}
