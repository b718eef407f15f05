//! Overlay tinting and alpha-over compositing.

use crate::canvas::RESIZE_FILTER;
use crate::{Color, ImageError, PixelBuffer, PixelMode, Result, Size};
use image::imageops;
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// A translucent RGBA image laid over a base image.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    image: RgbaImage,
}

impl Overlay {
    /// Wrap an RGBA image.
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    /// Convert any buffer; RGB buffers become fully opaque overlays.
    pub fn from_buffer(buffer: &PixelBuffer) -> Self {
        Self::new(buffer.to_rgba8())
    }

    /// Decode an overlay asset from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        crate::decode::open(path).map(|buffer| Self::from_buffer(&buffer))
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
        self.image.dimensions()
    }

    /// Borrow the RGBA pixels.
    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    /// A copy resampled to exactly `size`.
    ///
    /// [`composite`] never resizes on its own; callers that accept a softer
    /// overlay resize explicitly with this.
    pub fn resized(&self, size: Size) -> Result<Overlay> {
        size.validate()?;
        if self.dimensions() == (size.width, size.height) {
            return Ok(self.clone());
        }
        Ok(Overlay::new(imageops::resize(
            &self.image,
            size.width,
            size.height,
            RESIZE_FILTER,
        )))
    }

    /// Convert into an RGBA pixel buffer.
    pub fn into_buffer(self) -> PixelBuffer {
        PixelBuffer::from(self.image)
    }
}

impl From<RgbaImage> for Overlay {
    fn from(image: RgbaImage) -> Self {
        Self::new(image)
    }
}

/// How a tint color is applied to an overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TintMode {
    /// Replace RGB with the tint color
    #[default]
    Flat,
    /// Blend the tint color by the overlay's luminance
    Shaded,
}

impl TintMode {
    /// Apply this mode's tint.
    pub fn apply(&self, overlay: &Overlay, color: Color) -> Overlay {
        match self {
            TintMode::Flat => tint(overlay, color),
            TintMode::Shaded => tint_shaded(overlay, color),
        }
    }
}

/// Replace every pixel's RGB with `color`, keeping its alpha.
pub fn tint(overlay: &Overlay, color: Color) -> Overlay {
    let mut image = overlay.image.clone();
    for px in image.pixels_mut() {
        *px = Rgba(color.to_rgba(px[3]));
    }
    Overlay::new(image)
}

/// Recolor while keeping the overlay's shading: each pixel becomes
/// `color * L + rgb * (1 - L)` where `L` is the pixel's luminance. Alpha is
/// kept.
pub fn tint_shaded(overlay: &Overlay, color: Color) -> Overlay {
    let mut image = overlay.image.clone();
    for px in image.pixels_mut() {
        let Rgba([r, g, b, a]) = *px;
        let luma = (r as u32 * 299 + g as u32 * 587 + b as u32 * 114) / 1000;
        let mix = |tint: u8, orig: u8| {
            ((tint as u32 * luma + orig as u32 * (255 - luma) + 127) / 255) as u8
        };
        *px = Rgba([mix(color.r, r), mix(color.g, g), mix(color.b, b), a]);
    }
    Overlay::new(image)
}

/// Alpha-composite `overlay` over `base`.
///
/// Both must have identical dimensions, otherwise this fails with
/// [`ImageError::SizeMismatch`]. The result keeps the base's mode.
pub fn composite(base: &PixelBuffer, overlay: &Overlay) -> Result<PixelBuffer> {
    if base.dimensions() != overlay.dimensions() {
        return Err(ImageError::SizeMismatch {
            base: base.dimensions(),
            overlay: overlay.dimensions(),
        });
    }

    let (width, height) = base.dimensions();
    let over_px = overlay.image.pixels().map(|px| px.0);
    let blended = base.pixels().zip(over_px).map(|(bg, fg)| over(fg, bg));

    let image = match base.mode() {
        PixelMode::Rgb => {
            let mut out = RgbImage::new(width, height);
            for (dst, [r, g, b, _]) in out.pixels_mut().zip(blended) {
                *dst = Rgb([r, g, b]);
            }
            DynamicImage::ImageRgb8(out)
        }
        PixelMode::Rgba => {
            let mut out = RgbaImage::new(width, height);
            for (dst, px) in out.pixels_mut().zip(blended) {
                *dst = Rgba(px);
            }
            DynamicImage::ImageRgba8(out)
        }
    };

    debug!(width, height, mode = ?base.mode(), "Composited overlay");
    Ok(PixelBuffer::from_dynamic(image))
}

/// Alpha-over weighted by the overlay's alpha only: the base color is not
/// scaled by its own alpha, which only feeds the output alpha.
fn over(fg: [u8; 4], bg: [u8; 4]) -> [u8; 4] {
    match fg[3] {
        0 => return bg,
        255 => return [fg[0], fg[1], fg[2], 255],
        _ => {}
    }

    let fg_a = fg[3] as f32 / 255.0;
    let bg_a = bg[3] as f32 / 255.0;
    let out_a = fg_a + bg_a * (1.0 - fg_a);

    let channel = |f: u8, b: u8| {
        let v = f as f32 * fg_a + b as f32 * (1.0 - fg_a);
        v.round().clamp(0.0, 255.0) as u8
    };

    [
        channel(fg[0], bg[0]),
        channel(fg[1], bg[1]),
        channel(fg[2], bg[2]),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ]
}
