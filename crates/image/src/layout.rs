//! Aspect-preserving fit of a source size into a target canvas.

use crate::{ImageError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A (width, height) pair in pixels. Valid sizes have both dimensions > 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Size {
    /// Create a validated size.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let size = Self { width, height };
        size.validate()?;
        Ok(size)
    }

    /// Fails with [`ImageError::InvalidSize`] if either dimension is zero.
    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(ImageError::InvalidSize {
                width: self.width,
                height: self.height,
            });
        }
        Ok(())
    }

    /// Width / height.
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// Number of pixels.
    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Size {
    type Err = ImageError;

    /// Parse `WIDTHxHEIGHT`, e.g. `800x600`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ImageError::Config(format!("'{}' is not a WIDTHxHEIGHT size", s));
        let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
        let width = w.trim().parse().map_err(|_| invalid())?;
        let height = h.trim().parse().map_err(|_| invalid())?;
        Size::new(width, height)
    }
}

/// Placement of a scaled source inside a target canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    /// Canvas size
    pub target: Size,
    /// Size of the resampled source, never larger than `target`
    pub scaled_size: Size,
    /// Top-left corner of the scaled source within the canvas
    pub offset: (u32, u32),
    /// Uniform scale factor applied to the source
    pub scale: f64,
}

impl Layout {
    /// True when the scaled source covers the whole canvas.
    pub fn is_exact(&self) -> bool {
        self.scaled_size == self.target
    }

    /// Padding bands as (left, top, right, bottom).
    pub fn padding(&self) -> (u32, u32, u32, u32) {
        let (x, y) = self.offset;
        (
            x,
            y,
            self.target.width - self.scaled_size.width - x,
            self.target.height - self.scaled_size.height - y,
        )
    }
}

/// Fit `source` inside `target` preserving aspect ratio, centered.
///
/// The constraining axis matches the target exactly; the other axis is
/// rounded to the nearest pixel and clamped to `[1, target]`.
///
/// # Example
/// ```
/// use artificer_image::{fit, Size};
///
/// let layout = fit(Size::new(1920, 1080).unwrap(), Size::new(800, 800).unwrap()).unwrap();
/// assert_eq!(layout.scaled_size, Size::new(800, 450).unwrap());
/// assert_eq!(layout.offset, (0, 175));
/// ```
pub fn fit(source: Size, target: Size) -> Result<Layout> {
    target.validate()?;
    if source.area() == 0 {
        return Err(ImageError::EmptyImage {
            width: source.width,
            height: source.height,
        });
    }

    let scale_w = target.width as f64 / source.width as f64;
    let scale_h = target.height as f64 / source.height as f64;

    let (scale, width, height) = if scale_w <= scale_h {
        (scale_w, target.width, scale_dimension(source.height, scale_w, target.height))
    } else {
        (scale_h, scale_dimension(source.width, scale_h, target.width), target.height)
    };

    Ok(Layout {
        target,
        scaled_size: Size { width, height },
        offset: ((target.width - width) / 2, (target.height - height) / 2),
        scale,
    })
}

fn scale_dimension(value: u32, scale: f64, max: u32) -> u32 {
    ((value as f64 * scale).round() as u32).clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn size(width: u32, height: u32) -> Size {
        Size { width, height }
    }

    #[test]
    fn test_fit_landscape_into_square() {
        let layout = fit(size(1920, 1080), size(800, 800)).unwrap();
        assert_eq!(layout.scaled_size, size(800, 450));
        assert_eq!(layout.offset, (0, 175));
        assert_eq!(layout.padding(), (0, 175, 0, 175));
        assert!((layout.scale - 800.0 / 1920.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_portrait_into_landscape() {
        let layout = fit(size(300, 600), size(400, 200)).unwrap();
        assert_eq!(layout.scaled_size, size(100, 200));
        assert_eq!(layout.offset, (150, 0));
    }

    #[test]
    fn test_fit_same_aspect() {
        let layout = fit(size(1600, 900), size(800, 450)).unwrap();
        assert!(layout.is_exact());
        assert_eq!(layout.offset, (0, 0));
    }

    #[test]
    fn test_fit_upscale() {
        let layout = fit(size(10, 5), size(100, 100)).unwrap();
        assert_eq!(layout.scaled_size, size(100, 50));
        assert!((layout.scale - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_extreme_aspect_keeps_one_pixel() {
        let layout = fit(size(10_000, 1), size(100, 100)).unwrap();
        assert_eq!(layout.scaled_size, size(100, 1));
        assert_eq!(layout.offset, (0, 49));
    }

    #[test]
    fn test_fit_odd_padding() {
        let layout = fit(size(100, 100), size(101, 50)).unwrap();
        assert_eq!(layout.scaled_size, size(50, 50));
        assert_eq!(layout.padding(), (25, 0, 26, 0));
    }

    #[test]
    fn test_fit_invalid_target() {
        assert!(matches!(
            fit(size(10, 10), size(0, 10)),
            Err(ImageError::InvalidSize { width: 0, height: 10 })
        ));
        assert!(matches!(
            fit(size(0, 10), size(10, 10)),
            Err(ImageError::EmptyImage { .. })
        ));
    }

    #[test]
    fn test_size_parse() {
        assert_eq!("800x600".parse::<Size>().unwrap(), size(800, 600));
        assert_eq!(" 64 X 32 ".parse::<Size>().unwrap(), size(64, 32));
        assert!("800".parse::<Size>().is_err());
        assert!("0x600".parse::<Size>().is_err());
        assert_eq!(size(3, 4).to_string(), "3x4");
    }

    proptest! {
        #[test]
        fn prop_fit_stays_inside_target(
            sw in 1u32..5000, sh in 1u32..5000, tw in 1u32..2000, th in 1u32..2000,
        ) {
            let layout = fit(size(sw, sh), size(tw, th)).unwrap();
            let s = layout.scaled_size;
            prop_assert!(s.width >= 1 && s.width <= tw);
            prop_assert!(s.height >= 1 && s.height <= th);
            prop_assert!(s.width == tw || s.height == th);
            prop_assert!(layout.offset.0 + s.width <= tw);
            prop_assert!(layout.offset.1 + s.height <= th);
        }

        #[test]
        fn prop_fit_preserves_aspect(
            sw in 1u32..5000, sh in 1u32..5000, tw in 1u32..2000, th in 1u32..2000,
        ) {
            let layout = fit(size(sw, sh), size(tw, th)).unwrap();
            let s = layout.scaled_size;
            let ideal_w = sw as f64 * layout.scale;
            let ideal_h = sh as f64 * layout.scale;
            if ideal_w >= 1.0 {
                prop_assert!((s.width as f64 - ideal_w).abs() <= 1.0);
            }
            if ideal_h >= 1.0 {
                prop_assert!((s.height as f64 - ideal_h).abs() <= 1.0);
            }
        }
    }
}
