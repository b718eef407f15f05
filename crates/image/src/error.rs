//! Error types for the image crate.

use thiserror::Error;

/// Result type alias for image operations.
pub type Result<T> = std::result::Result<T, ImageError>;

/// Errors that can occur during image operations.
///
/// Every error is terminal for the call that raised it; no operation returns
/// a partially processed buffer alongside an error.
#[derive(Debug, Error)]
pub enum ImageError {
    /// Input image has zero area
    #[error("Image is empty ({width}x{height})")]
    EmptyImage {
        /// Width of the rejected image
        width: u32,
        /// Height of the rejected image
        height: u32,
    },

    /// Target dimensions are not positive
    #[error("Invalid target size {width}x{height}: both dimensions must be positive")]
    InvalidSize {
        /// Requested width
        width: u32,
        /// Requested height
        height: u32,
    },

    /// Overlay and base image dimensions differ
    #[error("Overlay is {overlay:?} but base image is {base:?}")]
    SizeMismatch {
        /// Base (width, height)
        base: (u32, u32),
        /// Overlay (width, height)
        overlay: (u32, u32),
    },

    /// Requested output encoding is not JPEG, PNG or WEBP
    #[error("Unsupported output format: {0}")]
    UnsupportedFormat(String),

    /// Unknown input format
    #[error("Unknown image format")]
    UnknownFormat,

    /// Color string could not be parsed
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Invalid image data
    #[error("Invalid image data: {0}")]
    InvalidData(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Image processing error
    #[error("Image processing error: {0}")]
    ProcessingError(#[from] image::ImageError),
}

/// Stable numeric codes for [`ImageError`].
/// Range: 20xxx for image errors.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageErrorCode {
    /// Zero-area input
    EmptyImage = 20001,
    /// Non-positive target dimensions
    InvalidSize = 20002,
    /// Overlay/base dimension mismatch
    SizeMismatch = 20003,
    /// Unknown output encoding
    UnsupportedFormat = 20004,
    /// Unknown input format
    UnknownFormat = 20005,
    /// Unparseable color
    InvalidColor = 20006,
    /// Malformed pixel data
    InvalidData = 20007,
    /// Configuration problem
    Config = 20008,
    /// IO failure
    Io = 20009,
    /// Codec failure
    Processing = 20010,
}

impl ImageError {
    /// Returns the error code for this error.
    pub fn code(&self) -> ImageErrorCode {
        match self {
            ImageError::EmptyImage { .. } => ImageErrorCode::EmptyImage,
            ImageError::InvalidSize { .. } => ImageErrorCode::InvalidSize,
            ImageError::SizeMismatch { .. } => ImageErrorCode::SizeMismatch,
            ImageError::UnsupportedFormat(_) => ImageErrorCode::UnsupportedFormat,
            ImageError::UnknownFormat => ImageErrorCode::UnknownFormat,
            ImageError::InvalidColor(_) => ImageErrorCode::InvalidColor,
            ImageError::InvalidData(_) => ImageErrorCode::InvalidData,
            ImageError::Config(_) => ImageErrorCode::Config,
            ImageError::IoError(_) => ImageErrorCode::Io,
            ImageError::ProcessingError(_) => ImageErrorCode::Processing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = ImageError::EmptyImage { width: 0, height: 10 };
        assert_eq!(err.code(), ImageErrorCode::EmptyImage);
        assert_eq!(err.code() as u32, 20001);

        let err = ImageError::UnsupportedFormat("gif".into());
        assert_eq!(err.code(), ImageErrorCode::UnsupportedFormat);
    }

    #[test]
    fn test_error_messages() {
        let err = ImageError::SizeMismatch { base: (100, 100), overlay: (50, 50) };
        assert_eq!(err.to_string(), "Overlay is (50, 50) but base image is (100, 100)");

        let err = ImageError::InvalidSize { width: 0, height: 800 };
        assert!(err.to_string().contains("0x800"));
    }
}
