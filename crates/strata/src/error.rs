//! CLI error types.

use strata_build::BuildError;
use strata_config::ConfigError;
use strata_server::ServerError;

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("{0}")]
    Validation(String),
}
