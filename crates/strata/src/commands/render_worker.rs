//! `strata render-worker` command implementation.

use crate::error::CliError;

/// Serve one render request on stdin/stdout, then exit.
pub(crate) fn execute() -> Result<(), CliError> {
    strata_render::child::serve_stdio()?;
    Ok(())
}
