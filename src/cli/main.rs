//! Post-processing CLI tool
//!
//! Runs the pipeline on an image file with regions given on the command line,
//! the same way a vision tool would before handing its output to the agent.

use super::config::CliConfigBuilder;
use crate::{
    pipeline::PostProcessPipeline,
    registry::ProcessorRegistry,
    services::ImageIOService,
    tracing_config::init_cli_tracing,
    types::ToolImage,
};
use anyhow::{Context, Result};
use clap::Parser;
use image::GenericImageView;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Apply vision-tool post-processing to an image
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "vsp-postprocess")]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Image produced by the vision tool (the annotated view when --original is given)
    #[arg(value_name = "INPUT", required_unless_present = "list_backends")]
    pub input: Option<PathBuf>,

    /// Where to write the processed image (format from extension, PNG by default)
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<PathBuf>,

    /// Normalized region as x,y,w,h (repeatable)
    #[arg(long, value_name = "X,Y,W,H", allow_hyphen_values = true)]
    pub region: Vec<String>,

    /// JSON file holding a list of [x, y, w, h] regions
    #[arg(long, value_name = "FILE")]
    pub regions_json: Option<PathBuf>,

    /// Unannotated original; INPUT is then treated as the annotated view
    #[arg(long, value_name = "FILE")]
    pub original: Option<PathBuf>,

    /// Backend to use (see --list-backends)
    #[arg(short, long)]
    pub backend: Option<String>,

    /// Method of the selected backend (e.g. visual_mask, visual_edit, zoom_in)
    #[arg(short, long)]
    pub method: Option<String>,

    /// Tool name recorded in logs and snapshot file names
    #[arg(long, default_value = "cli")]
    pub tool_name: String,

    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Directory for "before" snapshots
    #[arg(long, value_name = "DIR")]
    pub working_dir: Option<PathBuf>,

    /// Do not save a snapshot before processing
    #[arg(long)]
    pub no_snapshot: bool,

    /// List registered backends and exit
    #[arg(long)]
    pub list_backends: bool,

    /// Enable verbose logging (-v: DEBUG, -vv: TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub fn main() -> Result<()> {
    let cli = Cli::parse();

    init_cli_tracing(cli.verbose).context("Failed to initialize tracing")?;

    let registry = ProcessorRegistry::with_defaults();

    if cli.list_backends {
        for name in registry.list() {
            println!("{}", name);
        }
        return Ok(());
    }

    CliConfigBuilder::validate_cli(&cli, &registry).context("Invalid CLI arguments")?;
    let config = CliConfigBuilder::from_cli(&cli).context("Failed to build configuration")?;
    let regions = CliConfigBuilder::collect_regions(&cli)?;

    let input = cli.input.as_ref().context("An input image is required")?;
    let output = cli.output.as_ref().context("An output path is required")?;

    let displayed = ImageIOService::load_image(input)
        .with_context(|| format!("Failed to load {}", input.display()))?;
    let image = match &cli.original {
        Some(path) => {
            let original = ImageIOService::load_image(path)
                .with_context(|| format!("Failed to load {}", path.display()))?;
            if original.dimensions() != displayed.dimensions() {
                warn!(
                    original = ?original.dimensions(),
                    annotated = ?displayed.dimensions(),
                    "Original and annotated images differ in size"
                );
            }
            ToolImage::annotated(original, displayed)
        },
        None => ToolImage::Plain(displayed),
    };

    info!(
        input = %input.display(),
        backend = config.active_backend().unwrap_or_default(),
        regions = regions.len(),
        "Starting post-processing"
    );

    let pipeline = PostProcessPipeline::new(Arc::new(config), Arc::new(registry));
    let before = image.dimensions();
    let processed = pipeline.apply_postprocess(image, &regions, &cli.tool_name);
    debug!(before = ?before, after = ?processed.dimensions(), "Pipeline finished");

    ImageIOService::save_image(processed.displayed(), output)
        .with_context(|| format!("Failed to save {}", output.display()))?;
    info!(output = %output.display(), "Saved processed image");

    Ok(())
}
