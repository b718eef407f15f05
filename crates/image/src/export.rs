//! Encoding pixel buffers to JPEG, PNG or WEBP bytes.

use crate::decode::SourceFormat;
use crate::{Color, ImageError, PixelBuffer, PixelMode, Result};
use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::{ColorType, ImageEncoder, ImageOutputFormat, Rgb, RgbImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, warn};

/// Supported output encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JPEG (no alpha)
    Jpeg = 0,
    /// PNG (lossless, alpha)
    Png = 1,
    /// WebP (alpha)
    WebP = 2,
}

/// What an output format can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatCapabilities {
    /// Whether the alpha channel survives encoding
    pub supports_alpha: bool,
    /// Whether the `quality` setting applies
    pub lossy: bool,
    /// MIME type
    pub mime_type: &'static str,
    /// Preferred file extension
    pub extension: &'static str,
}

/// Indexed by `OutputFormat as usize`.
const CAPABILITIES: [FormatCapabilities; 3] = [
    FormatCapabilities {
        supports_alpha: false,
        lossy: true,
        mime_type: "image/jpeg",
        extension: "jpg",
    },
    FormatCapabilities {
        supports_alpha: true,
        lossy: false,
        mime_type: "image/png",
        extension: "png",
    },
    // The bundled WebP encoder is lossless only.
    FormatCapabilities {
        supports_alpha: true,
        lossy: false,
        mime_type: "image/webp",
        extension: "webp",
    },
];

impl OutputFormat {
    /// Capability row for this format.
    pub fn capabilities(&self) -> &'static FormatCapabilities {
        &CAPABILITIES[*self as usize]
    }

    /// Whether the alpha channel survives encoding.
    pub fn supports_alpha(&self) -> bool {
        self.capabilities().supports_alpha
    }

    /// MIME type.
    pub fn mime_type(&self) -> &'static str {
        self.capabilities().mime_type
    }

    /// Preferred file extension.
    pub fn extension(&self) -> &'static str {
        self.capabilities().extension
    }

    /// Format for a file extension (`jpg`, `jpeg`, `png`, `webp`).
    pub fn from_extension(ext: &str) -> Result<Self> {
        ext.parse()
    }

    /// Format implied by a path's extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ImageError::UnsupportedFormat(path.display().to_string()))?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Png => "png",
            OutputFormat::WebP => "webp",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().trim_start_matches('.').to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::WebP),
            _ => Err(ImageError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl TryFrom<SourceFormat> for OutputFormat {
    type Error = ImageError;

    fn try_from(format: SourceFormat) -> Result<Self> {
        match format {
            SourceFormat::Jpeg => Ok(OutputFormat::Jpeg),
            SourceFormat::Png => Ok(OutputFormat::Png),
            SourceFormat::WebP => Ok(OutputFormat::WebP),
            other => Err(ImageError::UnsupportedFormat(format!("{:?}", other))),
        }
    }
}

/// PNG deflate effort.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngCompression {
    /// Fastest encoding
    Fast,
    /// Balanced
    #[default]
    Default,
    /// Smallest output
    Best,
}

impl From<PngCompression> for CompressionType {
    fn from(c: PngCompression) -> Self {
        match c {
            PngCompression::Fast => CompressionType::Fast,
            PngCompression::Default => CompressionType::Default,
            PngCompression::Best => CompressionType::Best,
        }
    }
}

impl FromStr for PngCompression {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(PngCompression::Fast),
            "default" => Ok(PngCompression::Default),
            "best" => Ok(PngCompression::Best),
            _ => Err(ImageError::Config(format!(
                "'{}': PNG compression must be fast, default or best",
                s
            ))),
        }
    }
}

/// Requested encoding plus its parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSpec {
    /// Output encoding
    pub format: OutputFormat,
    /// JPEG quality (1-100)
    pub quality: u8,
    /// PNG compression effort
    pub compression: PngCompression,
    /// Background that RGBA images are flattened onto for formats without alpha
    pub background: Color,
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            quality: 85,
            compression: PngCompression::Default,
            background: Color::WHITE,
        }
    }
}

impl OutputSpec {
    /// Defaults for `format`.
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    /// Set the JPEG quality.
    pub fn with_quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Set the flatten background.
    pub fn with_background(mut self, background: Color) -> Self {
        self.background = background;
        self
    }

    /// Set the PNG compression effort.
    pub fn with_compression(mut self, compression: PngCompression) -> Self {
        self.compression = compression;
        self
    }
}

/// Composite an image over an opaque `background`, producing an RGB buffer.
/// RGB inputs are returned unchanged.
pub fn flatten(buffer: &PixelBuffer, background: Color) -> PixelBuffer {
    if !buffer.mode().has_alpha() {
        return buffer.clone();
    }

    let (width, height) = buffer.dimensions();
    let mut output = RgbImage::new(width, height);

    for (dst, [r, g, b, a]) in output.pixels_mut().zip(buffer.pixels()) {
        // Alpha blending: composite over background
        let alpha = a as u32;
        let inv_alpha = 255 - alpha;
        let blend = |fg: u8, bg: u8| ((fg as u32 * alpha + bg as u32 * inv_alpha + 127) / 255) as u8;
        *dst = Rgb([blend(r, background.r), blend(g, background.g), blend(b, background.b)]);
    }

    PixelBuffer::from(output)
}

/// Encode `buffer` as `spec.format`.
///
/// RGBA buffers are flattened onto `spec.background` first when the format
/// has no alpha channel; otherwise the mode passes through unchanged.
pub fn encode(buffer: &PixelBuffer, spec: &OutputSpec) -> Result<Vec<u8>> {
    if buffer.is_empty() {
        return Err(ImageError::EmptyImage {
            width: buffer.width(),
            height: buffer.height(),
        });
    }

    let flattened;
    let source = if buffer.mode().has_alpha() && !spec.format.supports_alpha() {
        debug!(format = %spec.format, background = %spec.background, "Flattening alpha channel");
        flattened = flatten(buffer, spec.background);
        &flattened
    } else {
        buffer
    };

    let mut cursor = Cursor::new(Vec::new());
    match spec.format {
        OutputFormat::Jpeg => {
            let quality = spec.quality.clamp(1, 100);
            if quality != spec.quality {
                warn!(requested = spec.quality, used = quality, "JPEG quality out of range");
            }
            source
                .as_dynamic()
                .write_to(&mut cursor, ImageOutputFormat::Jpeg(quality))?;
        }
        OutputFormat::Png => {
            let color_type = match source.mode() {
                PixelMode::Rgb => ColorType::Rgb8,
                PixelMode::Rgba => ColorType::Rgba8,
            };
            PngEncoder::new_with_quality(&mut cursor, spec.compression.into(), PngFilter::Adaptive)
                .write_image(source.as_bytes(), source.width(), source.height(), color_type)?;
        }
        OutputFormat::WebP => {
            source.as_dynamic().write_to(&mut cursor, ImageOutputFormat::WebP)?;
        }
    }

    let bytes = cursor.into_inner();
    debug!(
        format = %spec.format,
        mode = ?source.mode(),
        size_bytes = bytes.len(),
        "Encoded image"
    );
    Ok(bytes)
}
