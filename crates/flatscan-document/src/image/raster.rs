// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Immutable RGBA raster with an extent. Camera frames arrive zero-based;
// corrected images keep the (possibly offset) origin their transform produced.

use flatscan_core::Extent;
use flatscan_core::error::{Result, ScanError};
use image::{DynamicImage, ImageFormat, RgbaImage};
use tracing::{debug, instrument};

/// A pixel buffer placed in its coordinate space.
///
/// The extent's size always equals the pixel dimensions; only the origin can
/// differ from (0, 0). There are no mutating accessors: once built, an image
/// is handed from lane to lane by value or behind an `Arc`.
#[derive(Debug, Clone)]
pub struct RasterImage {
    /// The RGBA8 pixels.
    pixels: RgbaImage,
    /// Where the pixels live.
    extent: Extent,
}

impl RasterImage {
    // -- Construction ---------------------------------------------------------

    /// Wrap a zero-based RGBA buffer.
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        let extent = Extent::from_size(pixels.width(), pixels.height());
        Self { pixels, extent }
    }

    /// Wrap an RGBA buffer whose top-left pixel sits at `(x, y)`.
    pub fn with_origin(pixels: RgbaImage, x: f64, y: f64) -> Self {
        let extent = Extent::new(x, y, pixels.width() as f64, pixels.height() as f64);
        Self { pixels, extent }
    }

    /// Convert any decoded image to RGBA8.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self::from_rgba(image.to_rgba8())
    }

    /// Decode an encoded frame (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data).map_err(|err| {
            ScanError::ImageError(format!("failed to decode frame: {}", err))
        })?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Frame decoded from bytes"
        );
        Ok(Self::from_dynamic(img))
    }

    // -- Accessors ------------------------------------------------------------

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    /// Borrow the pixel buffer.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Consume the image and return the pixel buffer.
    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    // -- Output ---------------------------------------------------------------

    /// Encode as PNG for handoff to a native image view.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut buffer = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buffer);
        self.pixels
            .write_to(&mut cursor, ImageFormat::Png)
            .map_err(|err| ScanError::ImageError(format!("PNG encoding failed: {}", err)))?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// Zero-based images report an extent matching their pixel size.
    #[test]
    fn from_rgba_is_zero_based() {
        let img = RasterImage::from_rgba(RgbaImage::new(40, 30));
        assert_eq!(img.extent(), Extent::new(0.0, 0.0, 40.0, 30.0));
        assert_eq!((img.width(), img.height()), (40, 30));
    }

    /// Offset origins are preserved alongside the pixel size.
    #[test]
    fn with_origin_keeps_offset() {
        let img = RasterImage::with_origin(RgbaImage::new(20, 10), -5.0, 12.5);
        let extent = img.extent();
        assert_eq!((extent.x, extent.y), (-5.0, 12.5));
        assert_eq!((extent.width, extent.height), (20.0, 10.0));
    }

    /// PNG bytes decode back to the same pixels.
    #[test]
    fn png_handoff_decodes() {
        let mut buf = RgbaImage::from_pixel(8, 6, Rgba([10, 20, 30, 255]));
        buf.put_pixel(3, 2, Rgba([200, 100, 50, 255]));
        let original = RasterImage::from_rgba(buf);

        let bytes = original.to_png_bytes().expect("encode");
        let decoded = RasterImage::from_bytes(&bytes).expect("decode");
        assert_eq!(decoded.pixels(), original.pixels());
    }

    /// Garbage bytes are an image error, not a panic.
    #[test]
    fn from_bytes_rejects_garbage() {
        let result = RasterImage::from_bytes(b"definitely not an image");
        assert!(matches!(result, Err(ScanError::ImageError(_))));
    }
}
