//! Site resolver construction from configuration.

use std::sync::Arc;

use strata_config::Config;
use strata_render::{CommandBundler, ProcessLauncher, RenderPool};
use strata_vfs::{NamingPolicy, Vfs};

use crate::error::CliError;

/// Build the resolver for the configured site.
///
/// Starts the render pool, so this must run inside the tokio runtime.
pub(crate) fn open_site(config: &Config) -> Result<Vfs, CliError> {
    let launcher = match &config.render_resolved.worker_program {
        Some(program) => ProcessLauncher::strata(program),
        None => ProcessLauncher::current_exe()?,
    };
    let workers = config.render_resolved.workers;
    tracing::info!(workers, "Starting render workers");
    let pool = RenderPool::new(launcher, workers);
    let bundler = CommandBundler::new(config.bundle.command.clone());

    Ok(Vfs::new(
        config.site_resolved.root_dir.clone(),
        Arc::new(pool),
        Arc::new(bundler),
    )
    .with_policy(naming_policy(config)))
}

fn naming_policy(config: &Config) -> NamingPolicy {
    NamingPolicy {
        server_config_names: config.naming.server_config_names.clone(),
        ignored_dirs: config.naming.ignored_dirs.clone(),
        ignored_suffixes: config.naming.ignored_suffixes.clone(),
        ..NamingPolicy::default()
    }
}
