//! PNG export serializer.
//!
//! Materializes a raster -- saturating each channel to [0, 255] and
//! rounding, the rendering surface's contract -- and encodes the result
//! as PNG bytes using the [`image`] crate.
//!
//! This is a pure function with no I/O: bytes in memory out. Writing
//! them to a file or a download belongs to the caller.

use image::ImageEncoder;

use tinct_pipeline::Raster;

/// Errors that can occur while serializing a raster.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// PNG encoding failed.
    #[error("PNG encoding failed: {0}")]
    PngEncode(#[from] image::ImageError),
}

/// Encode a raster as PNG bytes.
///
/// # Errors
///
/// Returns [`ExportError::PngEncode`] if the underlying encoder fails.
pub fn to_png(raster: &Raster) -> Result<Vec<u8>, ExportError> {
    let rgba = raster.to_rgba();
    let mut png_bytes = Vec::new();
    let encoder = image::codecs::png::PngEncoder::new(&mut png_bytes);
    encoder.write_image(
        rgba.as_raw(),
        rgba.width(),
        rgba.height(),
        image::ExtendedColorType::Rgba8,
    )?;
    Ok(png_bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tinct_pipeline::Color;

    #[test]
    fn png_bytes_decode_back_to_the_materialized_pixels() {
        let raster = Raster::from_pixel(3, 2, Color::opaque(10.0, 20.0, 30.0));
        let png = to_png(&raster).unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.dimensions(), (3, 2));
        for pixel in decoded.pixels() {
            assert_eq!(pixel.0, [10, 20, 30, 255]);
        }
    }

    #[test]
    fn out_of_range_channels_saturate_in_the_encoded_image() {
        let raster = Raster::from_pixel(1, 1, Color::new(300.0, -40.0, 127.5, 255.0));
        let png = to_png(&raster).unwrap();

        let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
        assert_eq!(decoded.get_pixel(0, 0).0, [255, 0, 128, 255]);
    }

    #[test]
    fn output_starts_with_the_png_signature() {
        let raster = Raster::from_pixel(1, 1, Color::opaque(0.0, 0.0, 0.0));
        let png = to_png(&raster).unwrap();
        assert_eq!(&png[..8], &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]);
    }
}
