//! Pool of pre-warmed, single-use render workers.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use regex::Regex;

use crate::Render;
use crate::error::RenderError;
use crate::protocol::RenderRequest;
use crate::worker::{Launch, Worker};

/// Placeholder script blocks left behind by templates.
static EMPTY_SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<script>\s*//\s*</script>").expect("valid regex"));

/// Keeps a fixed number of idle workers warm and hands each one out once.
///
/// Workers are never reused: [`RenderPool::release`] discards the worker it
/// is given and launches a replacement, so every render starts from a
/// pristine process.
pub struct RenderPool {
    launcher: Box<dyn Launch>,
    idle: Mutex<VecDeque<Worker>>,
    size: usize,
}

impl RenderPool {
    /// Default number of pre-warmed workers.
    pub const DEFAULT_SIZE: usize = 6;

    /// Create a pool and pre-warm `size` workers.
    ///
    /// Must be called inside a tokio runtime. Workers that fail to launch
    /// are logged and launched on demand later.
    pub fn new(launcher: impl Launch + 'static, size: usize) -> Self {
        let pool = Self {
            launcher: Box::new(launcher),
            idle: Mutex::new(VecDeque::with_capacity(size)),
            size,
        };
        for _ in 0..size {
            pool.replenish();
        }
        pool
    }

    /// Number of idle workers.
    pub fn idle_count(&self) -> usize {
        self.lock_idle().len()
    }

    /// Take an idle worker (or launch one) and wait for it to become ready.
    ///
    /// # Errors
    ///
    /// Fails if no worker can be launched or the worker dies before it is
    /// ready. A worker lost this way is replaced.
    pub async fn acquire(&self) -> Result<Worker, RenderError> {
        let idle = self.lock_idle().pop_front();
        let mut worker = match idle {
            Some(worker) => worker,
            None => self.launcher.launch()?,
        };

        // Launches a replacement unless disarmed, so a cancelled or failed
        // ready-wait never shrinks the pool.
        let mut replacement = Replacement {
            pool: self,
            armed: true,
        };
        if let Err(err) = worker.wait_ready().await {
            tracing::warn!(worker = %worker.id(), error = %err, "render worker failed to start");
            return Err(err);
        }
        replacement.armed = false;
        Ok(worker)
    }

    /// Discard a worker, whatever its state, and launch a replacement.
    pub fn release(&self, worker: Worker) {
        tracing::debug!(worker = %worker.id(), state = ?worker.state(), "discarding render worker");
        drop(worker);
        self.replenish();
    }

    /// Launch one worker if the idle set is below its target size.
    fn replenish(&self) {
        let mut idle = self.lock_idle();
        if idle.len() >= self.size {
            return;
        }
        match self.launcher.launch() {
            Ok(worker) => idle.push_back(worker),
            Err(err) => tracing::warn!(error = %err, "failed to launch replacement render worker"),
        }
    }

    fn lock_idle(&self) -> MutexGuard<'_, VecDeque<Worker>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Returns the leased worker to the pool when dropped, including when the
/// render future is cancelled mid-flight.
struct Lease<'a> {
    pool: &'a RenderPool,
    worker: Option<Worker>,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            self.pool.release(worker);
        }
    }
}

/// Replenishes the pool on drop while armed.
struct Replacement<'a> {
    pool: &'a RenderPool,
    armed: bool,
}

impl Drop for Replacement<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.pool.replenish();
        }
    }
}

#[async_trait]
impl Render for RenderPool {
    async fn render(&self, template_path: &Path, base_uri: &str) -> Result<String, RenderError> {
        let request = RenderRequest {
            template_path: template_path.to_path_buf(),
            base_uri: base_uri.to_owned(),
        };

        let mut lease = Lease {
            pool: self,
            worker: None,
        };
        let worker = lease.worker.insert(self.acquire().await?);
        let page = worker.render(&request).await?;

        Ok(strip_empty_scripts(&page))
    }
}

/// Remove empty `<script>//</script>` placeholders from rendered output.
fn strip_empty_scripts(page: &str) -> String {
    EMPTY_SCRIPT.replace_all(page, "").into_owned()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::worker::tests::{Behavior, FakeLauncher};

    #[tokio::test]
    async fn test_prewarms_idle_workers() {
        let pool = RenderPool::new(FakeLauncher::new(Behavior::Echo), 3);
        assert_eq!(pool.idle_count(), 3);
    }

    #[tokio::test]
    async fn test_release_restores_idle_count_and_never_reuses() {
        let pool = RenderPool::new(FakeLauncher::new(Behavior::Echo), 2);

        let first = pool.acquire().await.unwrap();
        let released_id = first.id();
        assert_eq!(pool.idle_count(), 1);

        pool.release(first);
        assert_eq!(pool.idle_count(), 2);

        let second = pool.acquire().await.unwrap();
        let third = pool.acquire().await.unwrap();
        assert_ne!(second.id(), released_id);
        assert_ne!(third.id(), released_id);
        assert_ne!(second.id(), third.id());

        pool.release(second);
        pool.release(third);
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_acquire_from_empty_pool_launches_on_demand() {
        let pool = RenderPool::new(FakeLauncher::new(Behavior::Echo), 1);

        let first = pool.acquire().await.unwrap();
        assert_eq!(pool.idle_count(), 0);
        let second = pool.acquire().await.unwrap();
        assert_ne!(first.id(), second.id());

        // Releasing both never grows the pool past its target size.
        pool.release(first);
        pool.release(second);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_acquirers_get_distinct_workers() {
        let pool = Arc::new(RenderPool::new(FakeLauncher::new(Behavior::Echo), 4));

        let (a, b) = tokio::join!(pool.acquire(), pool.acquire());
        let (a, b) = (a.unwrap(), b.unwrap());

        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn test_render_round_trip_replaces_worker() {
        let launcher = FakeLauncher::new(Behavior::Echo);
        let pool = RenderPool::new(launcher, 2);

        let page = pool
            .render(Path::new("/site/blog/index.jinja.html"), "/blog/")
            .await
            .unwrap();

        assert_eq!(page, "/site/blog/index.jinja.html@/blog/");
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_render_failure_still_replaces_worker() {
        let pool = RenderPool::new(FakeLauncher::new(Behavior::Fail), 2);

        let err = pool
            .render(Path::new("/site/index.jinja.html"), "/")
            .await
            .unwrap_err();

        assert!(matches!(err, RenderError::Failed(_)), "got {err:?}");
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_worker_exit_before_ready_is_replaced() {
        let pool = RenderPool::new(FakeLauncher::new(Behavior::ExitBeforeReady), 2);

        let err = pool.acquire().await.unwrap_err();

        assert!(matches!(err, RenderError::WorkerExited { .. }), "got {err:?}");
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_launcher_counts_prewarm_and_replacements() {
        let launcher = Arc::new(FakeLauncher::new(Behavior::Echo));
        let pool = RenderPool::new(SharedLauncher(Arc::clone(&launcher)), 2);
        assert_eq!(launcher.launched.load(Ordering::SeqCst), 2);

        pool.render(Path::new("/t.jinja.html"), "/").await.unwrap();

        assert_eq!(launcher.launched.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancelled_ready_wait_is_replaced() {
        let launcher = FakeLauncher::new(Behavior::Echo).starting_with(Behavior::Stall, 1);
        let pool = RenderPool::new(launcher, 2);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(50),
            pool.render(Path::new("/site/index.jinja.html"), "/"),
        )
        .await;
        assert!(cancelled.is_err(), "render should still be waiting for ready");
        assert_eq!(pool.idle_count(), 2);

        let page = pool
            .render(Path::new("/site/index.jinja.html"), "/")
            .await
            .unwrap();
        assert_eq!(page, "/site/index.jinja.html@/");
        assert_eq!(pool.idle_count(), 2);
    }

    struct SharedLauncher(Arc<FakeLauncher>);

    impl Launch for SharedLauncher {
        fn launch(&self) -> Result<Worker, RenderError> {
            self.0.launch()
        }
    }

    #[test]
    fn test_strip_empty_scripts() {
        let page = "<head><script> // </script><script>//</script></head><script>run()</script>";
        assert_eq!(
            strip_empty_scripts(page),
            "<head></head><script>run()</script>"
        );
    }
}
