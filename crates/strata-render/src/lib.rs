//! Isolated content generation for strata.
//!
//! Templates are rendered in single-use worker processes so that no render
//! ever observes state left behind by another one. The parent side of that
//! arrangement is the [`RenderPool`]; the child side is [`child::serve_stdio`],
//! which the `strata` binary runs under the [`WORKER_SUBCOMMAND`] subcommand.
//!
//! # Architecture
//!
//! ```text
//! RenderPool ──acquire──► Worker ──stdin: RenderRequest──► strata render-worker
//!     ▲                     │                                    │
//!     │                     ◄──stdout: ready / result / error────┘
//!     └──release (discard + launch replacement)
//! ```
//!
//! Script bundling is delegated to an external bundler through
//! [`CommandBundler`].
//!
//! Both collaborators sit behind the [`Render`] and [`Bundle`] traits so the
//! resolver and its consumers can be exercised without spawning processes
//! (see `MockRenderer` and `MockBundler` behind the `mock` feature flag).

mod bundle;
pub mod child;
mod error;
#[cfg(feature = "mock")]
mod mock;
mod pool;
pub mod protocol;
pub mod template;
mod worker;

use std::path::Path;

use async_trait::async_trait;

pub use bundle::{BundleSpec, CommandBundler};
pub use error::{BundleError, RenderError};
#[cfg(feature = "mock")]
pub use mock::{MockBundler, MockRenderer};
pub use pool::RenderPool;
pub use worker::{Launch, ProcessLauncher, WORKER_SUBCOMMAND, Worker, WorkerId, WorkerState};

/// Renders a template file to text.
#[async_trait]
pub trait Render: Send + Sync {
    /// Render `template_path`, using `base_uri` to build site-relative links.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError`] if the template fails or the worker dies.
    async fn render(&self, template_path: &Path, base_uri: &str) -> Result<String, RenderError>;
}

/// Bundles script entry points into a single file.
#[async_trait]
pub trait Bundle: Send + Sync {
    /// Bundle the entry points described by `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`BundleError`] if the bundler cannot run or reports failure.
    async fn bundle(&self, spec: &BundleSpec) -> Result<Vec<u8>, BundleError>;
}
