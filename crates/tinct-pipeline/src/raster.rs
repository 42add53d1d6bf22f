//! Fixed-size pixel buffers produced by pipeline stages.
//!
//! A [`Raster`] owns its buffer for its whole lifetime. Stages never
//! mutate a published raster in place: each recompute allocates a fresh
//! buffer via [`Raster::map`] and replaces the old one whole, so a
//! partially transformed result is never observable.
//!
//! Rasters carry unclamped `f64` colors. The [0, 255] saturation and
//! rounding rule of the rendering surface is applied only at
//! materialization, in [`Raster::to_rgba`].

use image::RgbaImage;

use crate::color::Color;
use crate::types::Dimensions;

/// A width×height buffer of [`Color`] pixels in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    width: u32,
    height: u32,
    pixels: Vec<Color>,
}

impl Raster {
    /// Create a raster filled with a single color.
    #[must_use]
    pub fn from_pixel(width: u32, height: u32, color: Color) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            pixels: vec![color; len],
        }
    }

    /// Import a decoded 8-bit RGBA image into an unclamped raster.
    #[must_use]
    pub fn from_rgba(image: &RgbaImage) -> Self {
        let pixels = image
            .pixels()
            .map(|p| {
                Color::new(
                    f64::from(p.0[0]),
                    f64::from(p.0[1]),
                    f64::from(p.0[2]),
                    f64::from(p.0[3]),
                )
            })
            .collect();
        Self {
            width: image.width(),
            height: image.height(),
            pixels,
        }
    }

    /// Materialize the raster for display or export.
    ///
    /// This is where the rendering surface's contract is enforced:
    /// channel values outside [0, 255] saturate to the boundary and
    /// fractional values round to the nearest integer.
    #[must_use]
    pub fn to_rgba(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let color = self.pixel(x, y);
            image::Rgba([
                channel_to_u8(color.red),
                channel_to_u8(color.green),
                channel_to_u8(color.blue),
                channel_to_u8(color.alpha),
            ])
        })
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Width and height together.
    #[must_use]
    pub const fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width,
            height: self.height,
        }
    }

    /// All pixels in row-major order.
    #[must_use]
    pub fn pixels(&self) -> &[Color] {
        &self.pixels
    }

    /// The pixel at (`x`, `y`).
    ///
    /// Coordinates must lie within the raster; this is a contract of the
    /// buffer, matching `width()`/`height()`.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Color {
        debug_assert!(x < self.width && y < self.height, "pixel out of bounds");
        #[allow(clippy::cast_possible_truncation)]
        let index = y as usize * self.width as usize + x as usize;
        self.pixels[index]
    }

    /// Apply a pure per-pixel function to every pixel, producing a fresh
    /// raster of the same dimensions.
    ///
    /// The input is read-only; the output buffer is newly allocated.
    /// Filters have no cross-pixel dependencies, so any iteration order
    /// (or a future chunked-parallel strategy) yields the same result.
    #[must_use]
    pub fn map(&self, mut f: impl FnMut(Color) -> Color) -> Self {
        Self {
            width: self.width,
            height: self.height,
            pixels: self.pixels.iter().map(|&color| f(color)).collect(),
        }
    }
}

/// Saturate a channel to [0, 255] and round to the nearest integer.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel_to_u8(value: f64) -> u8 {
    value.clamp(0.0, 255.0).round() as u8
}
