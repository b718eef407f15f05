//! Input format detection and decoding into [`PixelBuffer`]s.

use crate::{ImageError, PixelBuffer, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Formats recognized from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// JPEG image
    Jpeg,
    /// PNG image
    Png,
    /// GIF image
    Gif,
    /// WebP image
    WebP,
    /// BMP image
    Bmp,
    /// TIFF image
    Tiff,
    /// AVIF image
    Avif,
    /// HEIC/HEIF image
    Heic,
}

impl SourceFormat {
    /// The codec used to decode this format, if one is compiled in.
    fn codec(&self) -> Option<image::ImageFormat> {
        match self {
            SourceFormat::Jpeg => Some(image::ImageFormat::Jpeg),
            SourceFormat::Png => Some(image::ImageFormat::Png),
            SourceFormat::Gif => Some(image::ImageFormat::Gif),
            SourceFormat::WebP => Some(image::ImageFormat::WebP),
            SourceFormat::Bmp | SourceFormat::Tiff | SourceFormat::Avif | SourceFormat::Heic => None,
        }
    }

    /// Whether [`decode`] can read this format.
    pub fn is_decodable(&self) -> bool {
        self.codec().is_some()
    }
}

/// Detect the format of encoded image bytes.
///
/// # Example
/// ```
/// use artificer_image::{detect_format, SourceFormat};
///
/// let png = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
/// assert_eq!(detect_format(&png).unwrap(), SourceFormat::Png);
/// ```
pub fn detect_format(data: &[u8]) -> Result<SourceFormat> {
    if data.len() < 4 {
        return Err(ImageError::InvalidData("Not enough data for format detection".into()));
    }

    let format = match data {
        [0xFF, 0xD8, 0xFF, ..] => SourceFormat::Jpeg,
        [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, ..] => SourceFormat::Png,
        [b'G', b'I', b'F', b'8', b'7' | b'9', b'a', ..] => SourceFormat::Gif,
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => SourceFormat::WebP,
        [b'I', b'I', 0x2A, 0x00, ..] | [b'M', b'M', 0x00, 0x2A, ..] => SourceFormat::Tiff,
        [b'B', b'M', ..] => SourceFormat::Bmp,
        [_, _, _, _, b'f', b't', b'y', b'p', brand @ ..] if brand.len() >= 4 => match &brand[..4] {
            b"avif" | b"avis" => SourceFormat::Avif,
            b"heic" | b"heix" | b"mif1" => SourceFormat::Heic,
            _ => return Err(ImageError::UnknownFormat),
        },
        _ => return Err(ImageError::UnknownFormat),
    };

    Ok(format)
}

/// Decode encoded bytes into an RGB or RGBA buffer.
pub fn decode(data: &[u8]) -> Result<PixelBuffer> {
    let format = detect_format(data)?;
    let codec = format.codec().ok_or_else(|| {
        ImageError::InvalidData(format!("No decoder available for {:?} images", format))
    })?;

    let image = image::load_from_memory_with_format(data, codec)?;
    let buffer = PixelBuffer::from_dynamic(image);
    debug!(
        format = ?format,
        width = buffer.width(),
        height = buffer.height(),
        mode = ?buffer.mode(),
        "Decoded image"
    );
    Ok(buffer)
}

/// Read and decode an image file.
pub fn open(path: impl AsRef<Path>) -> Result<PixelBuffer> {
    let data = std::fs::read(path.as_ref())?;
    decode(&data)
}
