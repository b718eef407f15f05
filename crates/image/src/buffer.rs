//! Immutable RGB/RGBA pixel buffers.
//!
//! Every transform in this crate takes a `&PixelBuffer` and returns a new one,
//! so stages compose without aliasing.

use crate::{Color, ImageError, Result, Size};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

/// Channel layout of a [`PixelBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelMode {
    /// 8-bit red, green, blue
    Rgb,
    /// 8-bit red, green, blue, alpha
    Rgba,
}

impl PixelMode {
    /// Bytes per pixel.
    pub fn channels(&self) -> usize {
        match self {
            PixelMode::Rgb => 3,
            PixelMode::Rgba => 4,
        }
    }

    /// Whether the mode carries an alpha channel.
    pub fn has_alpha(&self) -> bool {
        matches!(self, PixelMode::Rgba)
    }
}

/// A decoded image in RGB or RGBA mode.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    // Always ImageRgb8 or ImageRgba8.
    image: DynamicImage,
}

impl PixelBuffer {
    /// Build a buffer from raw interleaved bytes.
    ///
    /// Fails with [`ImageError::InvalidData`] when `data.len()` does not equal
    /// `width * height * mode.channels()`.
    pub fn from_raw(width: u32, height: u32, mode: PixelMode, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * mode.channels();
        if data.len() != expected {
            return Err(ImageError::InvalidData(format!(
                "expected {} bytes for {}x{} {:?}, got {}",
                expected,
                width,
                height,
                mode,
                data.len()
            )));
        }

        let image = match mode {
            PixelMode::Rgb => RgbImage::from_raw(width, height, data).map(DynamicImage::ImageRgb8),
            PixelMode::Rgba => RgbaImage::from_raw(width, height, data).map(DynamicImage::ImageRgba8),
        };

        image
            .map(|image| Self { image })
            .ok_or_else(|| ImageError::InvalidData("pixel data does not fit dimensions".into()))
    }

    /// Normalize any decoded image to RGB or RGBA.
    ///
    /// Layouts with an alpha channel become RGBA, everything else RGB.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let image = match image {
            DynamicImage::ImageRgb8(rgb) => DynamicImage::ImageRgb8(rgb),
            DynamicImage::ImageRgba8(rgba) => DynamicImage::ImageRgba8(rgba),
            other if other.color().has_alpha() => DynamicImage::ImageRgba8(other.into_rgba8()),
            other => DynamicImage::ImageRgb8(other.into_rgb8()),
        };
        Self { image }
    }

    /// A buffer of `size` filled with a single opaque color.
    pub fn solid(size: Size, mode: PixelMode, color: Color) -> Self {
        let image = match mode {
            PixelMode::Rgb => {
                DynamicImage::ImageRgb8(RgbImage::from_pixel(size.width, size.height, Rgb(color.rgb())))
            }
            PixelMode::Rgba => DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                size.width,
                size.height,
                Rgba(color.to_rgba(255)),
            )),
        };
        Self { image }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    /// Channel layout.
    pub fn mode(&self) -> PixelMode {
        match self.image {
            DynamicImage::ImageRgba8(_) => PixelMode::Rgba,
            _ => PixelMode::Rgb,
        }
    }

    /// True when the buffer has zero area.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Dimensions as a [`Size`], failing with [`ImageError::EmptyImage`] for
    /// zero-area buffers.
    pub fn size(&self) -> Result<Size> {
        if self.is_empty() {
            return Err(ImageError::EmptyImage {
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(Size {
            width: self.width(),
            height: self.height(),
        })
    }

    /// Raw interleaved channel bytes.
    pub fn as_bytes(&self) -> &[u8] {
        self.image.as_bytes()
    }

    /// Pixel at (x, y) as RGBA; RGB buffers report alpha 255.
    ///
    /// Returns `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        let channels = self.mode().channels();
        let start = (y as usize * self.width() as usize + x as usize) * channels;
        let px = &self.as_bytes()[start..start + channels];
        Some([px[0], px[1], px[2], px.get(3).copied().unwrap_or(255)])
    }

    /// Iterate pixels in raster order as RGBA.
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.as_bytes()
            .chunks_exact(self.mode().channels())
            .map(|px| [px[0], px[1], px[2], px.get(3).copied().unwrap_or(255)])
    }

    /// True when any pixel is not fully opaque.
    pub fn has_transparency(&self) -> bool {
        self.mode().has_alpha() && self.pixels().any(|px| px[3] < 255)
    }

    /// Borrow the underlying image.
    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    /// Unwrap into the underlying image.
    pub fn into_dynamic(self) -> DynamicImage {
        self.image
    }

    /// Copy into an RGBA image.
    pub fn to_rgba8(&self) -> RgbaImage {
        self.image.to_rgba8()
    }
}

impl From<RgbImage> for PixelBuffer {
    fn from(image: RgbImage) -> Self {
        Self {
            image: DynamicImage::ImageRgb8(image),
        }
    }
}

impl From<RgbaImage> for PixelBuffer {
    fn from(image: RgbaImage) -> Self {
        Self {
            image: DynamicImage::ImageRgba8(image),
        }
    }
}

impl From<DynamicImage> for PixelBuffer {
    fn from(image: DynamicImage) -> Self {
        Self::from_dynamic(image)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayAlphaImage, GrayImage, LumaA};

    #[test]
    fn test_from_raw_checks_length() {
        assert!(PixelBuffer::from_raw(2, 2, PixelMode::Rgb, vec![0; 12]).is_ok());
        assert!(PixelBuffer::from_raw(2, 2, PixelMode::Rgba, vec![0; 12]).is_err());
        assert!(PixelBuffer::from_raw(2, 2, PixelMode::Rgb, vec![0; 11]).is_err());
    }

    #[test]
    fn test_from_dynamic_normalizes_modes() {
        let gray = PixelBuffer::from_dynamic(DynamicImage::ImageLuma8(GrayImage::new(3, 2)));
        assert_eq!(gray.mode(), PixelMode::Rgb);
        assert_eq!(gray.as_bytes().len(), 3 * 2 * 3);

        let gray_alpha = GrayAlphaImage::from_pixel(1, 1, LumaA([10, 20]));
        let buffer = PixelBuffer::from_dynamic(DynamicImage::ImageLumaA8(gray_alpha));
        assert_eq!(buffer.mode(), PixelMode::Rgba);
        assert_eq!(buffer.pixel(0, 0), Some([10, 10, 10, 20]));
    }

    #[test]
    fn test_pixel_access() {
        let data = vec![1, 2, 3, 4, 5, 6];
        let buffer = PixelBuffer::from_raw(2, 1, PixelMode::Rgb, data).unwrap();
        assert_eq!(buffer.pixel(1, 0), Some([4, 5, 6, 255]));
        assert_eq!(buffer.pixel(2, 0), None);
        assert_eq!(buffer.pixels().count(), 2);
    }

    #[test]
    fn test_empty_buffer_size() {
        let buffer = PixelBuffer::from(RgbImage::new(0, 5));
        assert!(buffer.is_empty());
        assert!(matches!(buffer.size(), Err(ImageError::EmptyImage { width: 0, height: 5 })));
    }

    #[test]
    fn test_has_transparency() {
        let opaque = PixelBuffer::solid(Size { width: 2, height: 2 }, PixelMode::Rgba, Color::WHITE);
        assert!(!opaque.has_transparency());

        let mut img = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        img.put_pixel(1, 1, Rgba([0, 0, 0, 254]));
        assert!(PixelBuffer::from(img).has_transparency());
    }
}
