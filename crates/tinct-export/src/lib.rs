//! tinct-export: Pure format serializers (sans-IO)
//!
//! Converts materialized rasters into output formats. Currently
//! supports PNG. Callers are expected to check chain
//! validity first -- these functions serialize whatever raster they are
//! handed.

pub mod png;

pub use png::{ExportError, to_png};
