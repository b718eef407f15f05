//! Pipeline configuration and TOML loading.

use crate::{Color, ImageError, OutputSpec, PaddingPolicy, Result, Size, TintMode};
use crate::color::DEFAULT_SAMPLE_QUALITY;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// File names searched, in order, when no config path is given.
pub const CONFIG_CANDIDATES: &[&str] = &[
    ".artificer.toml",
    "artificer.toml",
    ".config/artificer.toml",
];

/// Everything the pipeline needs besides the pixels themselves.
///
/// ```toml
/// padding = "complementary"
/// overlay_color = "#FF5733"
/// tint_mode = "shaded"
/// sample_quality = 4
///
/// [target_size]
/// width = 1024
/// height = 768
///
/// [output]
/// format = "png"
/// compression = "best"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Padding color policy
    pub padding: PaddingPolicy,
    /// Tint applied to the overlay, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_color: Option<Color>,
    /// How the overlay tint is applied
    pub tint_mode: TintMode,
    /// Sampling stride for color analysis
    pub sample_quality: u32,
    /// Canvas size of the output
    pub target_size: Size,
    /// Output encoding
    pub output: OutputSpec,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            padding: PaddingPolicy::Dominant,
            overlay_color: None,
            tint_mode: TintMode::Flat,
            sample_quality: DEFAULT_SAMPLE_QUALITY,
            target_size: Size {
                width: 800,
                height: 800,
            },
            output: OutputSpec::default(),
        }
    }
}

impl PipelineConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ImageError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ImageError::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            ImageError::Config(msg) => ImageError::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Load from `path`, or from the first of [`CONFIG_CANDIDATES`] that
    /// exists, or fall back to defaults. Returns the file used, if any.
    pub fn load(path: Option<&Path>) -> Result<(Self, Option<PathBuf>)> {
        let config_path = path.map(Path::to_path_buf).or_else(find_config_file);

        match config_path {
            Some(p) => Ok((Self::from_file(&p)?, Some(p))),
            None => Ok((Self::default(), None)),
        }
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.target_size.validate()?;
        if !(1..=100).contains(&self.output.quality) {
            return Err(ImageError::Config(format!(
                "output.quality must be between 1 and 100, got {}",
                self.output.quality
            )));
        }
        Ok(())
    }

    /// Serialize back to TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ImageError::Config(format!("Failed to serialize config: {}", e)))
    }
}

/// Find a configuration file in the current directory.
pub fn find_config_file() -> Option<PathBuf> {
    CONFIG_CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|candidate| candidate.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{OutputFormat, PngCompression};

    #[test]
    fn test_config_default() {
        let config = PipelineConfig::default();
        assert_eq!(config.target_size, Size { width: 800, height: 800 });
        assert_eq!(config.padding, PaddingPolicy::Dominant);
        assert_eq!(config.output.format, OutputFormat::Jpeg);
        assert_eq!(config.output.quality, 85);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let config = PipelineConfig::from_toml_str(
            r##"
            padding = "complementary"
            overlay_color = "#FF5733"
            tint_mode = "shaded"

            [target_size]
            width = 1024
            height = 768

            [output]
            format = "png"
            compression = "best"
            "##,
        )
        .unwrap();

        assert_eq!(config.target_size, Size { width: 1024, height: 768 });
        assert_eq!(config.padding, PaddingPolicy::Complementary);
        assert_eq!(config.overlay_color, Some(Color::new(255, 87, 51)));
        assert_eq!(config.tint_mode, TintMode::Shaded);
        assert_eq!(config.output.format, OutputFormat::Png);
        assert_eq!(config.output.compression, PngCompression::Best);
        assert_eq!(config.output.quality, 85);
        assert_eq!(config.sample_quality, 1);
    }

    #[test]
    fn test_config_fixed_padding() {
        let config = PipelineConfig::from_toml_str(r#"padding = "10, 20, 30""#).unwrap();
        assert_eq!(config.padding, PaddingPolicy::Fixed(Color::new(10, 20, 30)));
    }

    #[test]
    fn test_config_rejects_bad_values() {
        assert!(PipelineConfig::from_toml_str("[target_size]\nwidth = 0\nheight = 5").is_err());
        assert!(PipelineConfig::from_toml_str("[output]\nformat = \"gif\"").is_err());
        assert!(PipelineConfig::from_toml_str("[output]\nquality = 0").is_err());
        assert!(PipelineConfig::from_toml_str("padding = \"sparkly\"").is_err());
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let mut config = PipelineConfig::default();
        config.overlay_color = Some(Color::new(1, 2, 3));
        config.padding = PaddingPolicy::Fixed(Color::BLACK);
        let text = config.to_toml_string().unwrap();
        assert_eq!(PipelineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_config_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artificer.toml");
        std::fs::write(&path, "sample_quality = 10\n").unwrap();

        let (config, used) = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.sample_quality, 10);
        assert_eq!(used.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_config_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = PipelineConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ImageError::Config(_))));
    }
}
