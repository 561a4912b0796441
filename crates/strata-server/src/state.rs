//! Application state.

use std::sync::Arc;

use strata_vfs::Vfs;

/// State shared across all request handlers.
pub(crate) struct AppState {
    /// Site resolver.
    pub(crate) vfs: Arc<Vfs>,
}
