//! CLI command implementations.

pub(crate) mod build;
pub(crate) mod render_worker;
pub(crate) mod serve;

pub(crate) use build::BuildArgs;
pub(crate) use serve::ServeArgs;
