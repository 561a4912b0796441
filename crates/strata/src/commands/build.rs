//! `strata build` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use strata_build::{BuildConfig, StaticSiteBuilder};
use strata_config::{CliSettings, Config};

use crate::error::CliError;
use crate::output::Output;
use crate::site::open_site;

/// Arguments for the build command.
#[derive(Args)]
pub(crate) struct BuildArgs {
    /// Output directory for the generated site.
    output: PathBuf,

    /// Path to configuration file (default: auto-discover strata.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site root directory (overrides config).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Maximum concurrent content jobs (overrides config).
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Enable verbose output (log every generated file).
    #[arg(short, long)]
    pub verbose: bool,
}

impl BuildArgs {
    /// Execute the build command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or any content job fails.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let cli_settings = CliSettings {
            root_dir: self.root,
            jobs: self.jobs,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.info(&format!(
            "Site root: {}",
            config.site_resolved.root_dir.display()
        ));
        output.info(&format!("Output: {}", self.output.display()));

        let vfs = Arc::new(open_site(&config)?);
        let builder = StaticSiteBuilder::new(
            vfs,
            BuildConfig {
                jobs: config.build.jobs,
            },
        );
        let written = builder.build("/", &self.output).await?;

        output.success(&format!(
            "Built {written} files into {}",
            self.output.display()
        ));
        Ok(())
    }
}
