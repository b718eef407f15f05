//! artificer: resize, pad and decorate images using their own colors.

mod logging;
mod output;

use anyhow::{Context, Result};
use artificer_image::{
    detect_format, open, palette, Artificer, Color, Overlay, OutputFormat, PaddingPolicy,
    PipelineConfig, PngCompression, Size, TintMode,
};
use clap::{Args, Parser, Subcommand};
use indicatif::{ParallelProgressIterator, ProgressBar, ProgressStyle};
use output::{format_size, swatch, Status};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "artificer")]
#[command(about = "Resize, pad and decorate images using their own colors")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the dominant and complementary colors of an image
    Colors {
        /// Path to image file
        path: PathBuf,
        /// Print a palette of N colors instead
        #[arg(long, value_name = "N")]
        palette: Option<usize>,
        /// Sample every Nth pixel
        #[arg(short, long, default_value_t = 1)]
        quality: u32,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run the pipeline on one image
    Process {
        /// Source image
        input: PathBuf,
        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        options: PipelineArgs,
    },
    /// Run the pipeline on every image in a directory
    Batch {
        /// Directory to scan recursively
        dir: PathBuf,
        /// Directory receiving the results
        #[arg(short, long)]
        output: PathBuf,
        #[command(flatten)]
        options: PipelineArgs,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Overrides applied on top of the configuration file.
#[derive(Args, Debug, Clone)]
struct PipelineArgs {
    /// Configuration file (TOML)
    #[arg(long, env = "ARTIFICER_CONFIG")]
    config: Option<PathBuf>,
    /// Canvas size, e.g. 800x800
    #[arg(long, value_name = "WxH")]
    size: Option<Size>,
    /// Padding color: dominant, complementary, #RRGGBB or r,g,b
    #[arg(long)]
    padding: Option<PaddingPolicy>,
    /// Overlay image composited on top of the canvas
    #[arg(long)]
    overlay: Option<PathBuf>,
    /// Tint color for the overlay
    #[arg(long)]
    overlay_color: Option<Color>,
    /// Keep the overlay's shading when tinting
    #[arg(long)]
    shaded: bool,
    /// Output format (defaults to the output file extension)
    #[arg(long)]
    format: Option<OutputFormat>,
    /// JPEG quality
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
    quality: Option<u8>,
    /// PNG compression: fast, default or best
    #[arg(long)]
    compression: Option<PngCompression>,
    /// Background used when flattening transparency
    #[arg(long)]
    background: Option<Color>,
    /// Sample every Nth pixel during color analysis
    #[arg(long)]
    sample_quality: Option<u32>,
}

impl PipelineArgs {
    /// Load the configuration file and layer the flags over it. `output` is
    /// consulted for the format when `--format` is absent.
    fn resolve(&self, output: Option<&Path>) -> Result<PipelineConfig> {
        let (mut config, source) = PipelineConfig::load(self.config.as_deref())?;
        if let Some(path) = source {
            info!(path = %path.display(), "Loaded configuration");
        }

        if let Some(size) = self.size {
            config.target_size = size;
        }
        if let Some(padding) = self.padding {
            config.padding = padding;
        }
        if let Some(color) = self.overlay_color {
            config.overlay_color = Some(color);
        }
        if self.shaded {
            config.tint_mode = TintMode::Shaded;
        }
        if let Some(quality) = self.sample_quality {
            config.sample_quality = quality;
        }
        if let Some(quality) = self.quality {
            config.output.quality = quality;
        }
        if let Some(compression) = self.compression {
            config.output.compression = compression;
        }
        if let Some(background) = self.background {
            config.output.background = background;
        }

        match (self.format, output) {
            (Some(format), _) => config.output.format = format,
            (None, Some(path)) => match OutputFormat::from_path(path) {
                Ok(format) => config.output.format = format,
                Err(e) => debug!(error = %e, "Keeping configured output format"),
            },
            (None, None) => {}
        }

        config.validate()?;
        Ok(config)
    }

    fn load_overlay(&self) -> Result<Option<Overlay>> {
        self.overlay
            .as_deref()
            .map(|path| {
                Overlay::open(path)
                    .with_context(|| format!("Failed to load overlay {}", path.display()))
            })
            .transpose()
    }
}

/// Result of one file in a batch run.
#[derive(Debug, Serialize)]
struct BatchEntry {
    input: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::init(cli.verbose) {
        eprintln!("{}", e);
    }

    let result = match cli.command {
        Commands::Colors {
            path,
            palette,
            quality,
            json,
        } => run_colors(&path, palette, quality, json),
        Commands::Process {
            input,
            output,
            options,
        } => run_process(&input, &output, &options),
        Commands::Batch {
            dir,
            output,
            options,
            json,
        } => run_batch(&dir, &output, &options, json),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            Status::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run_colors(path: &Path, count: Option<usize>, quality: u32, json: bool) -> Result<ExitCode> {
    let buffer = open(path).with_context(|| format!("Failed to open {}", path.display()))?;

    if let Some(count) = count {
        let swatches = palette(&buffer, count, quality)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&swatches)?);
        } else {
            for entry in &swatches {
                println!("{}  ({} px)", swatch(entry.color), entry.population);
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let artificer = Artificer::with_quality(buffer, quality)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&artificer.report())?);
    } else {
        let (width, height) = artificer.image().dimensions();
        println!("Dominant:      {}", swatch(artificer.dominant_color()));
        println!("Complementary: {}", swatch(artificer.complementary_color()));
        println!("Size:          {}x{}", width, height);
    }
    Ok(ExitCode::SUCCESS)
}

fn run_process(input: &Path, output: &Path, options: &PipelineArgs) -> Result<ExitCode> {
    let config = options.resolve(Some(output))?;
    let overlay = options.load_overlay()?;

    let bytes = process_file(input, &config, overlay.as_ref())?;
    write_output(output, &bytes)?;

    Status::success(&format!(
        "{} -> {} ({}, {})",
        input.display(),
        output.display(),
        config.target_size,
        format_size(bytes.len() as u64)
    ));
    Ok(ExitCode::SUCCESS)
}

fn run_batch(dir: &Path, out_dir: &Path, options: &PipelineArgs, json: bool) -> Result<ExitCode> {
    let config = options.resolve(None)?;
    let overlay = options.load_overlay()?;
    let extension = config.output.format.extension();

    let inputs: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| is_image(e.path()))
        .map(|e| e.into_path())
        .collect();

    if inputs.is_empty() {
        Status::warning(&format!("No images found in {}", dir.display()));
        return Ok(ExitCode::SUCCESS);
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create {}", out_dir.display()))?;
    info!(count = inputs.len(), format = %config.output.format, "Processing images");

    let pb = if json {
        ProgressBar::hidden()
    } else {
        ProgressBar::new(inputs.len() as u64)
    };
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let entries: Vec<BatchEntry> = inputs
        .par_iter()
        .progress_with(pb.clone())
        .map(|input| {
            let relative = input.strip_prefix(dir).unwrap_or(input);
            let target = out_dir.join(relative).with_extension(extension);

            let outcome = process_file(input, &config, overlay.as_ref())
                .and_then(|bytes| write_output(&target, &bytes).map(|()| bytes.len() as u64));

            match outcome {
                Ok(size) => BatchEntry {
                    input: input.clone(),
                    output: Some(target),
                    size_bytes: Some(size),
                    error: None,
                },
                Err(e) => {
                    warn!(path = %input.display(), error = %e, "Skipping image");
                    BatchEntry {
                        input: input.clone(),
                        output: None,
                        size_bytes: None,
                        error: Some(format!("{:#}", e)),
                    }
                }
            }
        })
        .collect();
    pb.finish_and_clear();

    let failed = entries.iter().filter(|e| e.error.is_some()).count();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in entries.iter().filter(|e| e.error.is_some()) {
            Status::error(&format!(
                "{}: {}",
                entry.input.display(),
                entry.error.as_deref().unwrap_or_default()
            ));
        }
        let written: u64 = entries.iter().filter_map(|e| e.size_bytes).sum();
        Status::success(&format!(
            "Processed {} of {} images into {} ({})",
            entries.len() - failed,
            entries.len(),
            out_dir.display(),
            format_size(written)
        ));
    }

    Ok(if failed > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn process_file(input: &Path, config: &PipelineConfig, overlay: Option<&Overlay>) -> Result<Vec<u8>> {
    let buffer = open(input).with_context(|| format!("Failed to open {}", input.display()))?;
    debug!(path = %input.display(), width = buffer.width(), height = buffer.height(), "Decoded");
    config
        .run(&buffer, overlay)
        .with_context(|| format!("Failed to process {}", input.display()))
}

fn write_output(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))
}

/// Sniff the header so that non-image files in a batch directory are skipped.
fn is_image(path: &Path) -> bool {
    use std::io::Read;

    let mut header = [0u8; 16];
    let read = std::fs::File::open(path).and_then(|mut f| f.read(&mut header));
    match read {
        Ok(n) => detect_format(&header[..n]).is_ok_and(|format| format.is_decodable()),
        Err(_) => false,
    }
}
