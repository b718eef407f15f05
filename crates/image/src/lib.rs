//! Color-aware image normalization.
//!
//! This crate provides:
//! - Dominant and complementary color extraction
//! - Aspect-preserving resize onto a padded canvas of fixed size
//! - Overlay tinting and alpha compositing
//! - Format-aware export to JPEG, PNG and WebP
//!
//! All operations are pure: they borrow their inputs and return new buffers.
//!
//! # Example
//! ```
//! use artificer_image::{PipelineConfig, PixelBuffer, PixelMode, Color, Size, OutputFormat};
//!
//! let source = PixelBuffer::solid(Size::new(320, 180).unwrap(), PixelMode::Rgb, Color::new(30, 90, 160));
//! let mut config = PipelineConfig::default();
//! config.target_size = Size::new(100, 100).unwrap();
//! config.output.format = OutputFormat::Png;
//!
//! let bytes = config.run(&source, None).unwrap();
//! assert!(!bytes.is_empty());
//! ```

#![warn(missing_docs)]

mod buffer;
mod canvas;
pub mod color;
mod config;
mod decode;
mod error;
mod export;
mod layout;
mod overlay;
mod pipeline;

pub use buffer::{PixelBuffer, PixelMode};
pub use canvas::{resize_and_pad, resize_and_pad_with_policy, PaddingPolicy, RESIZE_FILTER};
pub use color::{complementary_color, dominant_color, palette, Color, Hsl, Swatch};
pub use config::{find_config_file, PipelineConfig, CONFIG_CANDIDATES};
pub use decode::{decode, detect_format, open, SourceFormat};
pub use error::{ImageError, ImageErrorCode, Result};
pub use export::{encode, flatten, FormatCapabilities, OutputFormat, OutputSpec, PngCompression};
pub use layout::{fit, Layout, Size};
pub use overlay::{composite, tint, tint_shaded, Overlay, TintMode};
pub use pipeline::{Artificer, ColorReport};

#[cfg(feature = "parallel")]
pub use pipeline::process_batch;
