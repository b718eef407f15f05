//! End-to-end pipeline: analyze, fit and pad, overlay, encode.

use crate::color::DEFAULT_SAMPLE_QUALITY;
use crate::{
    complementary_color, composite, dominant_color, encode, resize_and_pad, Color, Overlay,
    OutputSpec, PaddingPolicy, PipelineConfig, PixelBuffer, Result, Size, TintMode,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// An image together with its analyzed colors.
///
/// Colors are computed once on construction and are read-only. Every
/// transform returns a new `Artificer` analyzed afresh; the original is left
/// untouched.
#[derive(Debug, Clone)]
pub struct Artificer {
    image: PixelBuffer,
    dominant: Color,
    complementary: Color,
    sample_quality: u32,
}

/// Summary of an analyzed image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorReport {
    /// Dominant color
    pub dominant: Color,
    /// Complement of the dominant color
    pub complementary: Color,
    /// Image width
    pub width: u32,
    /// Image height
    pub height: u32,
}

impl Artificer {
    /// Analyze `image` sampling every pixel.
    pub fn new(image: PixelBuffer) -> Result<Self> {
        Self::with_quality(image, DEFAULT_SAMPLE_QUALITY)
    }

    /// Analyze `image` with the given sampling stride.
    pub fn with_quality(image: PixelBuffer, sample_quality: u32) -> Result<Self> {
        let dominant = dominant_color(&image, sample_quality)?;
        let complementary = complementary_color(dominant);
        debug!(%dominant, %complementary, "Analyzed image colors");
        Ok(Self {
            image,
            dominant,
            complementary,
            sample_quality,
        })
    }

    /// Decode encoded bytes and analyze them.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::new(crate::decode::decode(data)?)
    }

    /// Open and analyze an image file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(crate::decode::open(path)?)
    }

    /// The current image.
    pub fn image(&self) -> &PixelBuffer {
        &self.image
    }

    /// Unwrap the current image.
    pub fn into_image(self) -> PixelBuffer {
        self.image
    }

    /// Dominant color of the current image.
    pub fn dominant_color(&self) -> Color {
        self.dominant
    }

    /// Complement of the dominant color.
    pub fn complementary_color(&self) -> Color {
        self.complementary
    }

    /// Analysis summary.
    pub fn report(&self) -> ColorReport {
        ColorReport {
            dominant: self.dominant,
            complementary: self.complementary,
            width: self.image.width(),
            height: self.image.height(),
        }
    }

    /// Fit into `target` and pad with the color `policy` picks from this
    /// image's analysis.
    pub fn resize_and_pad(&self, target: Size, policy: PaddingPolicy) -> Result<Self> {
        let fill = policy.pick(self.dominant, self.complementary);
        let padded = resize_and_pad(&self.image, target, fill)?;
        Self::with_quality(padded, self.sample_quality)
    }

    /// Lay `overlay` over the image, tinted by `color` if given.
    ///
    /// An overlay of a different size is resized to the image first.
    pub fn apply_overlay(
        &self,
        overlay: &Overlay,
        color: Option<Color>,
        mode: TintMode,
    ) -> Result<Self> {
        let composed = overlay_onto(&self.image, overlay, color, mode)?;
        Self::with_quality(composed, self.sample_quality)
    }

    /// Encode the current image.
    pub fn encode(&self, spec: &OutputSpec) -> Result<Vec<u8>> {
        encode(&self.image, spec)
    }

    /// Encode and write to a local file.
    pub fn save(&self, path: impl AsRef<Path>, spec: &OutputSpec) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.encode(spec)?;
        std::fs::write(path, &bytes)?;
        info!(path = %path.display(), format = %spec.format, size_bytes = bytes.len(), "Saved image");
        Ok(())
    }
}

impl fmt::Display for Artificer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.dominant;
        let c = self.complementary;
        writeln!(
            f,
            "{}",
            d.ansi_paint(&format!("Dominant color: RGB({}, {}, {}) {}", d.r, d.g, d.b, d))
        )?;
        writeln!(
            f,
            "{}",
            c.ansi_paint(&format!("Complementary color: RGB({}, {}, {}) {}", c.r, c.g, c.b, c))
        )?;
        write!(f, "image_size={}x{}", self.image.width(), self.image.height())
    }
}

/// Resize `overlay` to `base` if needed, tint it, and composite.
fn overlay_onto(
    base: &PixelBuffer,
    overlay: &Overlay,
    color: Option<Color>,
    mode: TintMode,
) -> Result<PixelBuffer> {
    let base_size = base.size()?;
    let fitted = if overlay.dimensions() != base.dimensions() {
        debug!(
            from = ?overlay.dimensions(),
            to = %base_size,
            "Resizing overlay to base image"
        );
        overlay.resized(base_size)?
    } else {
        overlay.clone()
    };

    let tinted = match color {
        Some(color) => mode.apply(&fitted, color),
        None => fitted,
    };

    composite(base, &tinted)
}

impl PipelineConfig {
    /// Run the whole pipeline on one image and return the encoded bytes.
    pub fn run(&self, buffer: &PixelBuffer, overlay: Option<&Overlay>) -> Result<Vec<u8>> {
        self.validate()?;

        let fill = self.padding.resolve(buffer, self.sample_quality)?;
        let padded = resize_and_pad(buffer, self.target_size, fill)?;

        let finished = match overlay {
            Some(overlay) => overlay_onto(&padded, overlay, self.overlay_color, self.tint_mode)?,
            None => padded,
        };

        encode(&finished, &self.output)
    }
}

/// Run the pipeline over independent images in parallel.
///
/// Results are returned in input order; one failing image does not affect
/// the others.
#[cfg(feature = "parallel")]
pub fn process_batch(
    inputs: &[PixelBuffer],
    config: &PipelineConfig,
    overlay: Option<&Overlay>,
) -> Vec<Result<Vec<u8>>> {
    use rayon::prelude::*;

    inputs
        .par_iter()
        .map(|buffer| config.run(buffer, overlay))
        .collect()
}
