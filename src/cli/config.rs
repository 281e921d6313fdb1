//! Conversion of CLI arguments into pipeline configuration and regions

use crate::cli::main_impl::Cli;
use crate::{
    config::PostProcessConfig,
    registry::ProcessorRegistry,
    types::Region,
    utils::RegionValidator,
};
use anyhow::{Context, Result};
use serde_json::Value;

pub(crate) struct CliConfigBuilder;

impl CliConfigBuilder {
    /// Build the configuration: file or environment first, then CLI flags on top
    ///
    /// Post-processing is always enabled from the command line.
    pub(crate) fn from_cli(cli: &Cli) -> Result<PostProcessConfig> {
        let mut config = match &cli.config {
            Some(path) => {
                let mut config = PostProcessConfig::from_json_file(path)
                    .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
                config.apply_env_overrides_from(|key| std::env::var(key).ok());
                config
            },
            None => PostProcessConfig::from_env(),
        };

        config.enabled = true;
        if let Some(backend) = &cli.backend {
            config.backend = Some(backend.clone());
        }
        if cli.no_snapshot {
            config.save_before_image = false;
        }
        if let Some(dir) = &cli.working_dir {
            config.working_dir = Some(dir.clone());
        }
        if let Some(method) = &cli.method {
            let backend = config
                .active_backend()
                .map(str::to_string)
                .context("--method requires a backend")?;
            config.set_backend_option(&backend, "method", Value::String(method.clone()));
        }

        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Check flags that clap cannot check on its own
    pub(crate) fn validate_cli(cli: &Cli, registry: &ProcessorRegistry) -> Result<()> {
        if cli.output.is_none() {
            anyhow::bail!("An output path is required (-o/--output)");
        }
        if let Some(backend) = &cli.backend {
            if !registry.contains(backend) {
                anyhow::bail!(
                    "Unknown backend '{}', registered backends: {}",
                    backend,
                    registry.list().join(", ")
                );
            }
        }
        if let Some(dir) = &cli.working_dir {
            if !dir.is_dir() {
                anyhow::bail!("Working directory {} does not exist", dir.display());
            }
        }
        Ok(())
    }

    /// Gather regions from `--region` flags followed by `--regions-json`
    pub(crate) fn collect_regions(cli: &Cli) -> Result<Vec<Region>> {
        let mut regions = cli
            .region
            .iter()
            .map(|text| RegionValidator::parse(text))
            .collect::<crate::error::Result<Vec<Region>>>()
            .context("Invalid --region value")?;

        if let Some(path) = &cli.regions_json {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read regions from {}", path.display()))?;
            let from_file: Vec<Region> = serde_json::from_str(&content)
                .with_context(|| format!("Regions file {} is not a list of [x, y, w, h]", path.display()))?;
            regions.extend(from_file);
        }

        RegionValidator::validate_all(&regions).context("Region outside the unit square")?;
        Ok(regions)
    }
}
