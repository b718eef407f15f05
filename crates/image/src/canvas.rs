//! Resize onto a padded canvas.

use crate::color::{complementary_color, dominant_color};
use crate::{fit, Color, ImageError, PixelBuffer, PixelMode, Result, Size};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgb, RgbImage, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Resampling filter used for every resize in this crate.
pub const RESIZE_FILTER: FilterType = FilterType::Lanczos3;

/// How the padding color around a fitted image is chosen.
///
/// Parses from `dominant`, `complementary`, or any [`Color`] literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum PaddingPolicy {
    /// The image's dominant color
    #[default]
    Dominant,
    /// The complement of the dominant color
    Complementary,
    /// A fixed color
    Fixed(Color),
}

impl PaddingPolicy {
    /// Pick the color given already-computed analysis results.
    pub fn pick(&self, dominant: Color, complementary: Color) -> Color {
        match self {
            PaddingPolicy::Dominant => dominant,
            PaddingPolicy::Complementary => complementary,
            PaddingPolicy::Fixed(color) => *color,
        }
    }

    /// Resolve to a concrete color, analyzing `buffer` only when needed.
    pub fn resolve(&self, buffer: &PixelBuffer, quality: u32) -> Result<Color> {
        match self {
            PaddingPolicy::Dominant => dominant_color(buffer, quality),
            PaddingPolicy::Complementary => dominant_color(buffer, quality).map(complementary_color),
            PaddingPolicy::Fixed(color) => Ok(*color),
        }
    }
}

impl fmt::Display for PaddingPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PaddingPolicy::Dominant => f.write_str("dominant"),
            PaddingPolicy::Complementary => f.write_str("complementary"),
            PaddingPolicy::Fixed(color) => color.fmt(f),
        }
    }
}

impl FromStr for PaddingPolicy {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dominant" => Ok(PaddingPolicy::Dominant),
            "complementary" => Ok(PaddingPolicy::Complementary),
            _ => s.parse::<Color>().map(PaddingPolicy::Fixed).map_err(|_| {
                ImageError::InvalidColor(format!(
                    "'{}': expected 'dominant', 'complementary' or a color",
                    s
                ))
            }),
        }
    }
}

impl TryFrom<String> for PaddingPolicy {
    type Error = ImageError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<PaddingPolicy> for String {
    fn from(policy: PaddingPolicy) -> Self {
        policy.to_string()
    }
}

/// Resize `buffer` to fit inside `target` and center it on a canvas of
/// exactly `target` filled with `fill`.
///
/// The output keeps the input's mode. RGBA sources keep their per-pixel alpha
/// inside the pasted region; the padding is always opaque `fill`.
///
/// Fails with [`ImageError::InvalidSize`] for a zero target and
/// [`ImageError::EmptyImage`] for a zero-area source.
pub fn resize_and_pad(buffer: &PixelBuffer, target: Size, fill: Color) -> Result<PixelBuffer> {
    let layout = fit(buffer.size()?, target)?;
    let scaled = layout.scaled_size;

    let resized = if scaled.width == buffer.width() && scaled.height == buffer.height() {
        buffer.as_dynamic().clone()
    } else {
        buffer
            .as_dynamic()
            .resize_exact(scaled.width, scaled.height, RESIZE_FILTER)
    };

    let (x, y) = (layout.offset.0 as i64, layout.offset.1 as i64);
    let canvas = match buffer.mode() {
        PixelMode::Rgb => {
            let mut canvas = RgbImage::from_pixel(target.width, target.height, Rgb(fill.rgb()));
            imageops::replace(&mut canvas, &resized.to_rgb8(), x, y);
            DynamicImage::ImageRgb8(canvas)
        }
        PixelMode::Rgba => {
            let mut canvas =
                RgbaImage::from_pixel(target.width, target.height, Rgba(fill.to_rgba(255)));
            imageops::replace(&mut canvas, &resized.to_rgba8(), x, y);
            DynamicImage::ImageRgba8(canvas)
        }
    };

    debug!(
        source = %format!("{}x{}", buffer.width(), buffer.height()),
        target = %target,
        scaled = %scaled,
        offset_x = layout.offset.0,
        offset_y = layout.offset.1,
        fill = %fill,
        "Resized and padded image"
    );

    Ok(PixelBuffer::from_dynamic(canvas))
}

/// [`resize_and_pad`] with the fill chosen by `policy`, analyzing the source
/// with sampling stride `quality` when the policy needs it.
pub fn resize_and_pad_with_policy(
    buffer: &PixelBuffer,
    target: Size,
    policy: PaddingPolicy,
    quality: u32,
) -> Result<PixelBuffer> {
    target.validate()?;
    let fill = policy.resolve(buffer, quality)?;
    resize_and_pad(buffer, target, fill)
}
