//! The filter catalog: nine per-pixel transforms.
//!
//! Every filter is a pure function `Color -> Color` with no cross-pixel
//! state and no dependence on pixel position, applied independently to
//! every pixel of a stage's input raster. Filters never clamp their
//! output; channel values outside [0, 255] are legal in transit and are
//! saturated only at materialization
//! ([`Raster::to_rgba`](crate::raster::Raster::to_rgba)).
//!
//! Parameters live as named fields on the enum variants, so a chain of
//! filters serializes as plain JSON and round-trips through presets.
//! Each parameter also carries control metadata ([`ParamSpec`]: label,
//! min, max, step, current value) for whatever surface presents it;
//! the range is advisory -- arithmetic is well-defined for any real
//! input, only the visual result of an out-of-range value is odd.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color::Color;
use crate::noise::NoiseSource;
use crate::types::PipelineError;

/// Identifies a filter variant without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterKind {
    /// Reduce to the relative luminance.
    Grayscale,
    /// Mirror every channel around the midpoint of the byte range.
    Invert,
    /// Add a constant to every channel.
    Brightness,
    /// Stretch channels away from (or towards) mid-gray.
    Contrast,
    /// Scale each channel's distance from the relative luminance.
    Saturation,
    /// Scale each channel independently.
    ColorBalance,
    /// Shift red up and blue down by the same warmth amount.
    Temperature,
    /// Lift shadows towards a shade, weighted by darkness.
    Fade,
    /// Add normally distributed noise, one sample per pixel.
    Grain,
}

impl FilterKind {
    /// All filters in catalog order.
    pub const ALL: [Self; 9] = [
        Self::Grayscale,
        Self::Invert,
        Self::Brightness,
        Self::Contrast,
        Self::Saturation,
        Self::ColorBalance,
        Self::Temperature,
        Self::Fade,
        Self::Grain,
    ];

    /// Display label for the filter.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Grayscale => "Grayscale",
            Self::Invert => "Invert",
            Self::Brightness => "Brightness",
            Self::Contrast => "Contrast",
            Self::Saturation => "Saturation",
            Self::ColorBalance => "Color Balance",
            Self::Temperature => "Temperature",
            Self::Fade => "Fade",
            Self::Grain => "Grain",
        }
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A numeric filter parameter together with its control range.
///
/// Whatever surface presents parameters gets one numeric control per
/// entry: (name, min, max, step, initial = current value). The range is
/// for the control; values are not validated against it here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParamSpec {
    /// Machine name, also the key accepted by [`Filter::set_param`].
    pub name: &'static str,
    /// Lower bound of the control range.
    pub min: f64,
    /// Upper bound of the control range.
    pub max: f64,
    /// Control step size.
    pub step: f64,
    /// Current value of the parameter.
    pub value: f64,
}

/// A single per-pixel transform with its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Filter {
    /// `r = g = b = relative_luminance(c)`.
    Grayscale,
    /// `c' = 255 - c` per channel.
    Invert,
    /// `c' = c + intensity` per channel.
    Brightness {
        /// Additive offset, default 0.
        intensity: f64,
    },
    /// `c' = (c - 128)·intensity + 128` per channel.
    Contrast {
        /// Scale factor around mid-gray, default 1 (identity).
        intensity: f64,
    },
    /// `c' = L + (c - L)·intensity` per channel, `L` the luminance.
    Saturation {
        /// Scale factor away from gray, default 1 (identity).
        intensity: f64,
    },
    /// `c' = c·intensity` independently per channel.
    ColorBalance {
        /// Red channel scale, default 1.
        red_intensity: f64,
        /// Green channel scale, default 1.
        green_intensity: f64,
        /// Blue channel scale, default 1.
        blue_intensity: f64,
    },
    /// `red' = red + warmth`, `blue' = blue - warmth`, green unchanged.
    Temperature {
        /// Warmth shift, default 0.
        warmth: f64,
    },
    /// Blend dark pixels towards a shade, then floor at `shade·intensity`.
    Fade {
        /// Strength of the fade, default 0.25.
        intensity: f64,
        /// Shade the shadows are pulled towards, default 128.
        shade: f64,
        /// Exponent controlling how sharply the effect is confined to
        /// dark pixels, default 3.
        tolerance: f64,
    },
    /// Add `n·64·intensity` to r, g, and b, with `n` one standard-normal
    /// sample per pixel.
    Grain {
        /// Noise strength, default 0.05.
        intensity: f64,
    },
}

impl Filter {
    /// Default brightness offset.
    pub const DEFAULT_BRIGHTNESS_INTENSITY: f64 = 0.0;
    /// Default contrast factor (identity).
    pub const DEFAULT_CONTRAST_INTENSITY: f64 = 1.0;
    /// Default saturation factor (identity).
    pub const DEFAULT_SATURATION_INTENSITY: f64 = 1.0;
    /// Default per-channel balance factor (identity).
    pub const DEFAULT_BALANCE_INTENSITY: f64 = 1.0;
    /// Default temperature warmth.
    pub const DEFAULT_WARMTH: f64 = 0.0;
    /// Default fade strength.
    pub const DEFAULT_FADE_INTENSITY: f64 = 0.25;
    /// Default fade shade.
    pub const DEFAULT_FADE_SHADE: f64 = 128.0;
    /// Default fade tolerance exponent.
    pub const DEFAULT_FADE_TOLERANCE: f64 = 3.0;
    /// Default grain strength.
    pub const DEFAULT_GRAIN_INTENSITY: f64 = 0.05;

    /// Create a filter of the given kind with its default parameters.
    #[must_use]
    pub const fn new(kind: FilterKind) -> Self {
        match kind {
            FilterKind::Grayscale => Self::Grayscale,
            FilterKind::Invert => Self::Invert,
            FilterKind::Brightness => Self::Brightness {
                intensity: Self::DEFAULT_BRIGHTNESS_INTENSITY,
            },
            FilterKind::Contrast => Self::Contrast {
                intensity: Self::DEFAULT_CONTRAST_INTENSITY,
            },
            FilterKind::Saturation => Self::Saturation {
                intensity: Self::DEFAULT_SATURATION_INTENSITY,
            },
            FilterKind::ColorBalance => Self::ColorBalance {
                red_intensity: Self::DEFAULT_BALANCE_INTENSITY,
                green_intensity: Self::DEFAULT_BALANCE_INTENSITY,
                blue_intensity: Self::DEFAULT_BALANCE_INTENSITY,
            },
            FilterKind::Temperature => Self::Temperature {
                warmth: Self::DEFAULT_WARMTH,
            },
            FilterKind::Fade => Self::Fade {
                intensity: Self::DEFAULT_FADE_INTENSITY,
                shade: Self::DEFAULT_FADE_SHADE,
                tolerance: Self::DEFAULT_FADE_TOLERANCE,
            },
            FilterKind::Grain => Self::Grain {
                intensity: Self::DEFAULT_GRAIN_INTENSITY,
            },
        }
    }

    /// The kind of this filter.
    #[must_use]
    pub const fn kind(&self) -> FilterKind {
        match self {
            Self::Grayscale => FilterKind::Grayscale,
            Self::Invert => FilterKind::Invert,
            Self::Brightness { .. } => FilterKind::Brightness,
            Self::Contrast { .. } => FilterKind::Contrast,
            Self::Saturation { .. } => FilterKind::Saturation,
            Self::ColorBalance { .. } => FilterKind::ColorBalance,
            Self::Temperature { .. } => FilterKind::Temperature,
            Self::Fade { .. } => FilterKind::Fade,
            Self::Grain { .. } => FilterKind::Grain,
        }
    }

    /// Display label for the filter.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        self.kind().label()
    }

    /// Control metadata for every parameter this filter exposes.
    ///
    /// Ranges and steps are the stock control ranges; parameterless
    /// filters return an empty list.
    #[must_use]
    pub fn params(&self) -> Vec<ParamSpec> {
        match *self {
            Self::Grayscale | Self::Invert => Vec::new(),
            Self::Brightness { intensity } => vec![ParamSpec {
                name: "intensity",
                min: -128.0,
                max: 128.0,
                step: 1.0,
                value: intensity,
            }],
            Self::Contrast { intensity } => vec![ParamSpec {
                name: "intensity",
                min: 0.5,
                max: 2.0,
                step: 0.015,
                value: intensity,
            }],
            Self::Saturation { intensity } => vec![ParamSpec {
                name: "intensity",
                min: 0.0,
                max: 2.0,
                step: 0.02,
                value: intensity,
            }],
            Self::ColorBalance {
                red_intensity,
                green_intensity,
                blue_intensity,
            } => vec![
                ParamSpec {
                    name: "red",
                    min: 0.0,
                    max: 2.0,
                    step: 0.02,
                    value: red_intensity,
                },
                ParamSpec {
                    name: "green",
                    min: 0.0,
                    max: 2.0,
                    step: 0.02,
                    value: green_intensity,
                },
                ParamSpec {
                    name: "blue",
                    min: 0.0,
                    max: 2.0,
                    step: 0.02,
                    value: blue_intensity,
                },
            ],
            Self::Temperature { warmth } => vec![ParamSpec {
                name: "warmth",
                min: -100.0,
                max: 100.0,
                step: 1.0,
                value: warmth,
            }],
            Self::Fade {
                intensity,
                shade,
                tolerance,
            } => vec![
                ParamSpec {
                    name: "intensity",
                    min: 0.0,
                    max: 1.0,
                    step: 0.01,
                    value: intensity,
                },
                ParamSpec {
                    name: "shade",
                    min: 0.0,
                    max: 255.0,
                    step: 1.0,
                    value: shade,
                },
                ParamSpec {
                    name: "tolerance",
                    min: 1.0,
                    max: 5.0,
                    step: 0.04,
                    value: tolerance,
                },
            ],
            Self::Grain { intensity } => vec![ParamSpec {
                name: "intensity",
                min: 0.0,
                max: 1.0,
                step: 0.01,
                value: intensity,
            }],
        }
    }

    /// Set a parameter by its [`ParamSpec`] name.
    ///
    /// Values are taken as given -- range enforcement belongs to the
    /// control surface. Setting a parameter does not recompute anything;
    /// the owning stage must be updated for the edit to become visible.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownParameter`] if this filter has no
    /// parameter with that name.
    pub fn set_param(&mut self, name: &str, value: f64) -> Result<(), PipelineError> {
        let label = self.label();
        let slot = match (self, name) {
            (Self::Brightness { intensity }, "intensity")
            | (Self::Contrast { intensity }, "intensity")
            | (Self::Saturation { intensity }, "intensity")
            | (Self::Fade { intensity, .. }, "intensity")
            | (Self::Grain { intensity }, "intensity") => intensity,
            (Self::ColorBalance { red_intensity, .. }, "red") => red_intensity,
            (Self::ColorBalance { green_intensity, .. }, "green") => green_intensity,
            (Self::ColorBalance { blue_intensity, .. }, "blue") => blue_intensity,
            (Self::Temperature { warmth }, "warmth") => warmth,
            (Self::Fade { shade, .. }, "shade") => shade,
            (Self::Fade { tolerance, .. }, "tolerance") => tolerance,
            _ => {
                return Err(PipelineError::UnknownParameter {
                    filter: label,
                    name: name.to_owned(),
                })
            }
        };
        *slot = value;
        Ok(())
    }

    /// Transform one pixel.
    ///
    /// `noise` is consulted only by [`Filter::Grain`]; every other
    /// variant is deterministic. Alpha passes through unchanged in all
    /// cases.
    #[must_use]
    pub fn apply(&self, color: Color, noise: &mut dyn NoiseSource) -> Color {
        match *self {
            Self::Grayscale => {
                let luminance = color.relative_luminance();
                color.map_rgb(|_| luminance)
            }
            Self::Invert => color.map_rgb(|c| 255.0 - c),
            Self::Brightness { intensity } => color.map_rgb(|c| c + intensity),
            Self::Contrast { intensity } => color.map_rgb(|c| (c - 128.0) * intensity + 128.0),
            Self::Saturation { intensity } => {
                let luminance = color.relative_luminance();
                color.map_rgb(|c| luminance + (c - luminance) * intensity)
            }
            Self::ColorBalance {
                red_intensity,
                green_intensity,
                blue_intensity,
            } => Color {
                red: color.red * red_intensity,
                green: color.green * green_intensity,
                blue: color.blue * blue_intensity,
                alpha: color.alpha,
            },
            Self::Temperature { warmth } => Color {
                red: color.red + warmth,
                blue: color.blue - warmth,
                ..color
            },
            Self::Fade {
                intensity,
                shade,
                tolerance,
            } => {
                // Blend weight comes from the luminance of the original
                // color, so darker pixels fade harder.
                let weight = (1.0 - color.relative_luminance() / 255.0).powf(tolerance);
                let floor = shade * intensity;
                color.map_rgb(|c| {
                    let faded = c * (1.0 - intensity) + shade * intensity;
                    (c * (1.0 - weight) + faded * weight).max(floor)
                })
            }
            Self::Grain { intensity } => {
                // One sample per pixel, added identically to all three
                // channels.
                let modifier = noise.standard_normal() * 64.0 * intensity;
                color.map_rgb(|c| c + modifier)
            }
        }
    }
}
