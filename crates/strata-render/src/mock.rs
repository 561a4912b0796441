//! In-memory renderer and bundler for testing.
//!
//! Provides [`MockRenderer`] and [`MockBundler`] so code built on the
//! [`Render`] and [`Bundle`] traits can be tested without worker processes
//! or an installed bundler.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::bundle::BundleSpec;
use crate::error::{BundleError, RenderError};
use crate::{Bundle, Render};

/// Renderer that echoes its inputs.
///
/// A successful render of `/site/index.jinja.html` at `/blog/` returns
/// `rendered /site/index.jinja.html at /blog/`.
#[derive(Debug, Default)]
pub struct MockRenderer {
    delay: Option<Duration>,
    failure: Option<String>,
    calls: Mutex<Vec<(PathBuf, String)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockRenderer {
    /// Create a renderer that succeeds immediately.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep for `delay` inside every render.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail every render with `message`.
    #[must_use]
    pub fn with_failure(mut self, message: impl Into<String>) -> Self {
        self.failure = Some(message.into());
        self
    }

    /// Template paths and base URIs rendered so far, in call order.
    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// Highest number of renders that were in progress at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Render for MockRenderer {
    async fn render(&self, template_path: &Path, base_uri: &str) -> Result<String, RenderError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        self.calls
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((template_path.to_path_buf(), base_uri.to_owned()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match &self.failure {
            Some(message) => Err(RenderError::Failed(message.clone())),
            None => Ok(format!(
                "rendered {} at {base_uri}",
                template_path.display()
            )),
        }
    }
}

/// Bundler that joins its entry points.
///
/// A successful bundle of `a.js` and `b.js` returns `bundle a.js,b.js`.
#[derive(Debug, Default)]
pub struct MockBundler {
    failure: Option<String>,
    calls: AtomicUsize,
}

impl MockBundler {
    /// Create a bundler that always succeeds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every bundle, reporting `stderr`.
    #[must_use]
    pub fn with_failure(mut self, stderr: impl Into<String>) -> Self {
        self.failure = Some(stderr.into());
        self
    }

    /// Number of bundles requested so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Bundle for MockBundler {
    async fn bundle(&self, spec: &BundleSpec) -> Result<Vec<u8>, BundleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(stderr) = &self.failure {
            return Err(BundleError::Io(std::io::Error::other(stderr.clone())));
        }

        let entries: Vec<String> = spec
            .entry_points
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        Ok(format!("bundle {}", entries.join(",")).into_bytes())
    }
}
