//! Color analysis: dominant color extraction and complementary colors.
//!
//! The dominant color comes from a median-cut quantizer. Sampled pixels start
//! in a single box; the most populous box that still spans more than one
//! color is repeatedly split on its widest channel, at the median of that
//! channel's value histogram, until the requested palette size is reached or
//! no box can be split further. A split never separates pixels sharing the
//! split channel's value, so a run of one color always stays in one box. Each
//! box contributes its mean color, and boxes are ranked by how many sampled
//! pixels they hold.

use crate::{ImageError, PixelBuffer, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

/// Number of boxes the quantizer builds when asked for "the" dominant color.
///
/// Splitting always targets the most populous box, so a color covering a
/// plurality of the image ends up alone in its box and ranks first; equal
/// populations fall back to the box with the narrowest channel range.
pub const DEFAULT_PALETTE_SIZE: usize = 5;

/// Default sampling stride; 1 samples every pixel.
pub const DEFAULT_SAMPLE_QUALITY: u32 = 1;

/// Pixels at or below this alpha are ignored while sampling, unless every
/// sampled pixel is below it.
const MIN_SAMPLE_ALPHA: u8 = 125;

/// An opaque 8-bit RGB color.
///
/// Parses from `#RRGGBB`, `RRGGBB` or `r,g,b`; serializes as `#RRGGBB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl Color {
    /// Pure white.
    pub const WHITE: Color = Color::new(255, 255, 255);
    /// Pure black.
    pub const BLACK: Color = Color::new(0, 0, 0);

    /// Create a color from channel values.
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Channels as an array.
    pub fn rgb(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Channels plus the given alpha.
    pub fn to_rgba(&self, alpha: u8) -> [u8; 4] {
        [self.r, self.g, self.b, alpha]
    }

    /// Parse `#RRGGBB` or `RRGGBB`.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let digits = hex.trim().trim_start_matches('#');
        if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ImageError::InvalidColor(format!(
                "'{}' is not a #RRGGBB hex color",
                hex
            )));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|e| ImageError::InvalidColor(format!("'{}': {}", hex, e)))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }

    /// Uppercase `#RRGGBB`.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }

    /// Wrap `text` in a 24-bit ANSI foreground escape of this color.
    pub fn ansi_paint(&self, text: &str) -> String {
        format!("\x1b[38;2;{};{};{}m{}\x1b[0m", self.r, self.g, self.b, text)
    }

    /// Hue, saturation and lightness of this color.
    pub fn to_hsl(&self) -> Hsl {
        Hsl::from(*self)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Color {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if !s.contains(',') {
            return Self::from_hex(s);
        }

        let inner = s.trim_start_matches('(').trim_end_matches(')');
        let channels = inner
            .split(',')
            .map(|part| part.trim().parse::<u8>())
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| ImageError::InvalidColor(format!("'{}': {}", s, e)))?;

        match channels.as_slice() {
            [r, g, b] => Ok(Self::new(*r, *g, *b)),
            _ => Err(ImageError::InvalidColor(format!(
                "'{}' must have exactly three channels",
                s
            ))),
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ImageError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

impl From<[u8; 3]> for Color {
    fn from([r, g, b]: [u8; 3]) -> Self {
        Self::new(r, g, b)
    }
}

/// A color in HSL space. Hue in degrees [0, 360), saturation and lightness
/// in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    /// Hue in degrees
    pub h: f64,
    /// Saturation
    pub s: f64,
    /// Lightness
    pub l: f64,
}

impl From<Color> for Hsl {
    fn from(color: Color) -> Self {
        let r = color.r as f64 / 255.0;
        let g = color.g as f64 / 255.0;
        let b = color.b as f64 / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        let d = max - min;

        if d == 0.0 {
            return Hsl { h: 0.0, s: 0.0, l };
        }

        let s = if l > 0.5 { d / (2.0 - max - min) } else { d / (max + min) };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };

        Hsl { h: h * 60.0, s, l }
    }
}

impl From<Hsl> for Color {
    fn from(hsl: Hsl) -> Self {
        let to_u8 = |v: f64| (v * 255.0).round().clamp(0.0, 255.0) as u8;

        if hsl.s == 0.0 {
            let v = to_u8(hsl.l);
            return Color::new(v, v, v);
        }

        let q = if hsl.l < 0.5 {
            hsl.l * (1.0 + hsl.s)
        } else {
            hsl.l + hsl.s - hsl.l * hsl.s
        };
        let p = 2.0 * hsl.l - q;
        let h = hsl.h.rem_euclid(360.0) / 360.0;

        Color::new(
            to_u8(hue_to_channel(p, q, h + 1.0 / 3.0)),
            to_u8(hue_to_channel(p, q, h)),
            to_u8(hue_to_channel(p, q, h - 1.0 / 3.0)),
        )
    }
}

fn hue_to_channel(p: f64, q: f64, t: f64) -> f64 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        p + (q - p) * 6.0 * t
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        p + (q - p) * (2.0 / 3.0 - t) * 6.0
    } else {
        p
    }
}

/// One entry of an extracted palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Swatch {
    /// Mean color of the box
    pub color: Color,
    /// Number of sampled pixels in the box
    pub population: usize,
}

/// The complement of `color`: hue rotated by 180 degrees in HSL space with
/// saturation and lightness kept.
///
/// Achromatic colors (saturation 0) have no distinct complement and map to
/// themselves.
///
/// # Example
/// ```
/// use artificer_image::{complementary_color, Color};
///
/// assert_eq!(complementary_color(Color::new(255, 0, 0)), Color::new(0, 255, 255));
/// assert_eq!(complementary_color(Color::new(90, 90, 90)), Color::new(90, 90, 90));
/// ```
pub fn complementary_color(color: Color) -> Color {
    let hsl = color.to_hsl();
    if hsl.s == 0.0 {
        return color;
    }
    Hsl {
        h: (hsl.h + 180.0) % 360.0,
        ..hsl
    }
    .into()
}

/// Dominant color of `buffer`.
///
/// `quality` is the sampling stride: every `quality`-th pixel in raster order
/// is sampled (0 is treated as 1). Higher values are faster and less accurate.
///
/// Fails with [`ImageError::EmptyImage`] for zero-area buffers.
pub fn dominant_color(buffer: &PixelBuffer, quality: u32) -> Result<Color> {
    let swatches = palette(buffer, DEFAULT_PALETTE_SIZE, quality)?;
    swatches
        .first()
        .map(|swatch| swatch.color)
        .ok_or(ImageError::EmptyImage {
            width: buffer.width(),
            height: buffer.height(),
        })
}

/// Up to `count` representative colors of `buffer`, most populous first.
///
/// Fewer than `count` swatches are returned when the sampled pixels cannot be
/// split further (for example a single-color image yields one swatch).
pub fn palette(buffer: &PixelBuffer, count: usize, quality: u32) -> Result<Vec<Swatch>> {
    if buffer.is_empty() {
        return Err(ImageError::EmptyImage {
            width: buffer.width(),
            height: buffer.height(),
        });
    }

    let samples = sample_pixels(buffer, quality);
    let sampled = samples.len();
    let mut boxes = vec![ColorBox::new(samples)];

    while boxes.len() < count.max(1) {
        let next = boxes
            .iter()
            .enumerate()
            .filter_map(|(i, b)| {
                let (channel, range) = b.widest_channel();
                (range > 0).then_some((i, channel, range, b.pixels.len()))
            })
            .max_by_key(|&(_, _, range, population)| (population, range));

        let Some((index, channel, range, population)) = next else {
            break;
        };

        trace!(box_index = index, channel, range, population, "Splitting color box");
        let (low, high) = boxes.swap_remove(index).split(channel);
        boxes.push(low);
        boxes.push(high);
    }

    let mut ranked: Vec<(Swatch, u8)> = boxes
        .iter()
        .map(|b| {
            let swatch = Swatch {
                color: b.mean(),
                population: b.pixels.len(),
            };
            (swatch, b.widest_channel().1)
        })
        .collect();
    ranked.sort_by(|(a, a_range), (b, b_range)| {
        b.population
            .cmp(&a.population)
            .then(a_range.cmp(b_range))
    });
    let swatches: Vec<Swatch> = ranked.into_iter().map(|(swatch, _)| swatch).collect();

    debug!(
        width = buffer.width(),
        height = buffer.height(),
        sampled,
        swatches = swatches.len(),
        "Extracted palette"
    );

    Ok(swatches)
}

/// Sample RGB values with the given stride, dropping mostly transparent
/// pixels. If nothing survives the alpha filter, every sampled pixel is kept
/// so a fully transparent image still reports its color.
fn sample_pixels(buffer: &PixelBuffer, quality: u32) -> Vec<[u8; 3]> {
    let stride = quality.max(1) as usize;

    let opaque: Vec<[u8; 3]> = buffer
        .pixels()
        .step_by(stride)
        .filter(|px| px[3] > MIN_SAMPLE_ALPHA)
        .map(|px| [px[0], px[1], px[2]])
        .collect();

    if !opaque.is_empty() {
        return opaque;
    }

    buffer
        .pixels()
        .step_by(stride)
        .map(|px| [px[0], px[1], px[2]])
        .collect()
}

/// A box of sampled pixels in RGB space.
struct ColorBox {
    pixels: Vec<[u8; 3]>,
}

impl ColorBox {
    fn new(pixels: Vec<[u8; 3]>) -> Self {
        Self { pixels }
    }

    fn range(&self, channel: usize) -> u8 {
        let (min, max) = self
            .pixels
            .iter()
            .fold((u8::MAX, u8::MIN), |(lo, hi), px| (lo.min(px[channel]), hi.max(px[channel])));
        max.saturating_sub(min)
    }

    /// Channel with the largest value range, and that range.
    fn widest_channel(&self) -> (usize, u8) {
        (0..3)
            .map(|channel| (channel, self.range(channel)))
            .fold((0, 0), |best, cur| if cur.1 > best.1 { cur } else { best })
    }

    /// Split at the median value of `channel`. Pixels with equal values stay
    /// on the same side: the cut goes after the median value's run, or before
    /// it when the run reaches the top. Both halves are non-empty as long as
    /// the box's range on `channel` is non-zero.
    fn split(mut self, channel: usize) -> (ColorBox, ColorBox) {
        self.pixels.sort_unstable_by_key(|px| px[channel]);
        let median = self.pixels[self.pixels.len() / 2][channel];

        let after_run = self.pixels.partition_point(|px| px[channel] <= median);
        let cut = if after_run < self.pixels.len() {
            after_run
        } else {
            self.pixels.partition_point(|px| px[channel] < median)
        };

        let upper = self.pixels.split_off(cut);
        (ColorBox::new(self.pixels), ColorBox::new(upper))
    }

    fn mean(&self) -> Color {
        let n = self.pixels.len().max(1) as u64;
        let mut sums = [0u64; 3];
        for px in &self.pixels {
            for (sum, v) in sums.iter_mut().zip(px) {
                *sum += *v as u64;
            }
        }
        let avg = |sum: u64| ((sum + n / 2) / n) as u8;
        Color::new(avg(sums[0]), avg(sums[1]), avg(sums[2]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{PixelMode, Size};
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use proptest::prelude::*;

    fn size(width: u32, height: u32) -> Size {
        Size { width, height }
    }

    #[test]
    fn test_parse_hex() {
        assert_eq!(Color::from_hex("#FF5733").unwrap(), Color::new(255, 87, 51));
        assert_eq!("ff5733".parse::<Color>().unwrap(), Color::new(255, 87, 51));
        assert!(Color::from_hex("#FF57").is_err());
        assert!(Color::from_hex("#GG5733").is_err());
    }

    #[test]
    fn test_parse_triple() {
        assert_eq!("255, 87, 51".parse::<Color>().unwrap(), Color::new(255, 87, 51));
        assert_eq!("(1,2,3)".parse::<Color>().unwrap(), Color::new(1, 2, 3));
        assert!("1,2".parse::<Color>().is_err());
        assert!("1,2,300".parse::<Color>().is_err());
    }

    #[test]
    fn test_hex_display() {
        assert_eq!(Color::new(255, 87, 51).to_string(), "#FF5733");
        let json = serde_json::to_string(&Color::new(0, 16, 255)).unwrap();
        assert_eq!(json, "\"#0010FF\"");
        let back: Color = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Color::new(0, 16, 255));
    }

    #[test]
    fn test_ansi_paint() {
        let painted = Color::new(1, 2, 3).ansi_paint("x");
        assert_eq!(painted, "\x1b[38;2;1;2;3mx\x1b[0m");
    }

    #[test]
    fn test_complementary_primary() {
        assert_eq!(complementary_color(Color::new(255, 0, 0)), Color::new(0, 255, 255));
        assert_eq!(complementary_color(Color::new(0, 0, 255)), Color::new(255, 255, 0));
    }

    #[test]
    fn test_complementary_keeps_saturation_and_lightness() {
        assert_eq!(
            complementary_color(Color::new(255, 87, 51)),
            Color::new(51, 219, 255)
        );
    }

    #[test]
    fn test_complementary_achromatic() {
        for v in [0u8, 1, 128, 254, 255] {
            let gray = Color::new(v, v, v);
            assert_eq!(complementary_color(gray), gray);
        }
    }

    #[test]
    fn test_dominant_single_color() {
        let buffer = PixelBuffer::solid(size(16, 9), PixelMode::Rgb, Color::new(12, 200, 99));
        assert_eq!(dominant_color(&buffer, 1).unwrap(), Color::new(12, 200, 99));
        assert_eq!(palette(&buffer, 5, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_dominant_fully_transparent() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([40, 50, 60, 0]));
        let buffer = PixelBuffer::from(img);
        assert_eq!(dominant_color(&buffer, 1).unwrap(), Color::new(40, 50, 60));
    }

    #[test]
    fn test_dominant_ignores_transparent_pixels() {
        let mut img = RgbaImage::from_pixel(10, 10, Rgba([255, 0, 0, 0]));
        img.put_pixel(0, 0, Rgba([0, 0, 255, 255]));
        let buffer = PixelBuffer::from(img);
        assert_eq!(dominant_color(&buffer, 1).unwrap(), Color::new(0, 0, 255));
    }

    #[test]
    fn test_dominant_majority_wins() {
        // 3/4 green, 1/4 red
        let img = RgbImage::from_fn(40, 40, |x, _| {
            if x < 10 { Rgb([220, 20, 20]) } else { Rgb([20, 180, 40]) }
        });
        let buffer = PixelBuffer::from(img);
        assert_eq!(dominant_color(&buffer, 1).unwrap(), Color::new(20, 180, 40));
    }

    #[test]
    fn test_dominant_majority_straddling_median() {
        // Half blue on the left, red above green on the right. The blue run
        // covers the median of every channel.
        let img = RgbImage::from_fn(40, 40, |x, y| match (x < 20, y < 20) {
            (true, _) => Rgb([0, 0, 255]),
            (false, true) => Rgb([255, 0, 0]),
            (false, false) => Rgb([0, 255, 0]),
        });
        let buffer = PixelBuffer::from(img);

        assert_eq!(dominant_color(&buffer, 1).unwrap(), Color::new(0, 0, 255));

        let swatches = palette(&buffer, 5, 1).unwrap();
        assert_eq!(
            swatches,
            vec![
                Swatch { color: Color::new(0, 0, 255), population: 800 },
                Swatch { color: Color::new(255, 0, 0), population: 400 },
                Swatch { color: Color::new(0, 255, 0), population: 400 },
            ]
        );
    }

    #[test]
    fn test_dominant_survives_noisy_background() {
        // Three pixels in five are a flat green, the rest pseudo-random.
        let mut state: u32 = 0x1234_5678;
        let mut noise = move || {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            (state >> 24) as u8
        };
        let mut data = Vec::with_capacity(40 * 40 * 3);
        for i in 0..40 * 40 {
            if i % 5 < 3 {
                data.extend_from_slice(&[10, 200, 30]);
            } else {
                data.extend_from_slice(&[noise(), noise(), noise()]);
            }
        }
        let buffer = PixelBuffer::from_raw(40, 40, PixelMode::Rgb, data).unwrap();

        let swatches = palette(&buffer, 5, 1).unwrap();
        assert_eq!(swatches[0], Swatch { color: Color::new(10, 200, 30), population: 960 });
        assert_eq!(dominant_color(&buffer, 1).unwrap(), Color::new(10, 200, 30));
    }

    #[test]
    fn test_split_keeps_equal_values_together() {
        let pixels = vec![[0, 0, 0], [5, 0, 0], [5, 0, 0], [5, 0, 0], [9, 0, 0]];
        let (low, high) = ColorBox::new(pixels).split(0);
        assert_eq!(low.pixels, vec![[0, 0, 0], [5, 0, 0], [5, 0, 0], [5, 0, 0]]);
        assert_eq!(high.pixels, vec![[9, 0, 0]]);

        // Median run reaching the top is cut below instead.
        let pixels = vec![[1, 0, 0], [7, 0, 0], [7, 0, 0]];
        let (low, high) = ColorBox::new(pixels).split(0);
        assert_eq!(low.pixels, vec![[1, 0, 0]]);
        assert_eq!(high.pixels, vec![[7, 0, 0], [7, 0, 0]]);
    }

    #[test]
    fn test_quality_stride() {
        let img = RgbImage::from_fn(30, 30, |x, y| Rgb([(x * 8) as u8, (y * 8) as u8, 90]));
        let buffer = PixelBuffer::from(img);
        assert!(dominant_color(&buffer, 0).is_ok());
        assert!(dominant_color(&buffer, 7).is_ok());
        assert!(dominant_color(&buffer, 10_000).is_ok());
    }

    #[test]
    fn test_palette_sorted_by_population() {
        let img = RgbImage::from_fn(20, 20, |x, y| match (x < 5, y < 10) {
            (true, _) => Rgb([255, 0, 0]),
            (false, true) => Rgb([0, 255, 0]),
            (false, false) => Rgb([0, 0, 255]),
        });
        let swatches = palette(&PixelBuffer::from(img), 3, 1).unwrap();
        assert_eq!(swatches.len(), 3);
        assert!(swatches.windows(2).all(|w| w[0].population >= w[1].population));
        let total: usize = swatches.iter().map(|s| s.population).sum();
        assert_eq!(total, 400);
    }

    #[test]
    fn test_empty_image() {
        let buffer = PixelBuffer::from(RgbImage::new(0, 0));
        assert!(matches!(dominant_color(&buffer, 1), Err(ImageError::EmptyImage { .. })));
        assert!(matches!(palette(&buffer, 3, 1), Err(ImageError::EmptyImage { .. })));
    }

    proptest! {
        #[test]
        fn prop_complement_twice_restores_hue(r in 0u8..=255, g in 0u8..=255, b in 0u8..=255) {
            let c = Color::new(r, g, b);
            let original = c.to_hsl();
            let back = complementary_color(complementary_color(c)).to_hsl();
            if original.s > 0.05 && back.s > 0.0 {
                let diff = (original.h - back.h).abs();
                let diff = diff.min(360.0 - diff);
                prop_assert!(diff < 3.0, "hue {} vs {}", original.h, back.h);
            }
        }

        #[test]
        fn prop_dominant_within_sampled_gamut(
            pixels in proptest::collection::vec(any::<[u8; 3]>(), 1..64),
            quality in 1u32..4,
        ) {
            let width = pixels.len() as u32;
            let data: Vec<u8> = pixels.iter().flatten().copied().collect();
            let buffer = PixelBuffer::from_raw(width, 1, PixelMode::Rgb, data).unwrap();
            let color = dominant_color(&buffer, quality).unwrap();
            let sampled: Vec<_> = pixels.iter().step_by(quality as usize).collect();
            for (channel, value) in color.rgb().iter().enumerate() {
                let lo = sampled.iter().map(|p| p[channel]).min().unwrap();
                let hi = sampled.iter().map(|p| p[channel]).max().unwrap();
                prop_assert!(lo <= *value && *value <= hi);
            }
        }
    }
}
