//! Error types for resolution and content generation.

use std::fmt::Write as _;
use std::path::PathBuf;

use strata_render::{BundleError, RenderError};

/// Error returned while resolving a directory listing.
#[derive(Debug, thiserror::Error)]
pub enum VfsError {
    /// Directory URI lacks a leading or trailing slash, or has a `.`/`..` segment.
    #[error("malformed directory URI: {0}")]
    MalformedUri(String),

    /// Two entries that cannot coexist were declared under one name.
    #[error("conflicting entries for `{name}` in {uri}")]
    HardConflict {
        /// Directory being resolved.
        uri: String,
        /// Name both entries claim.
        name: String,
    },

    /// A route module exists but could not be loaded.
    #[error("failed to load route module {}", path.display())]
    RouteModule {
        /// Module file.
        path: PathBuf,
        /// Why loading failed.
        #[source]
        source: RouteModuleError,
    },

    /// Filesystem error while listing a directory.
    #[error("failed to read {}", path.display())]
    Io {
        /// Path that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Why a route module failed to load.
#[derive(Debug, thiserror::Error)]
pub enum RouteModuleError {
    /// The file exists but could not be read.
    #[error("read failed")]
    Read(#[from] std::io::Error),

    /// The file is not a valid route table.
    #[error("invalid route table")]
    Parse(#[from] toml::de::Error),
}

/// Error returned while producing an entry's content.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    /// The entry has no content (a directory).
    #[error("entry has no content")]
    NotContent,

    /// Several entries claim the same index slot.
    #[error("conflicting index entries: {}", join_paths(.0))]
    IndexConflict(Vec<PathBuf>),

    /// Reading a static file failed.
    #[error("failed to read {}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The renderer failed.
    #[error(transparent)]
    Render(#[from] RenderError),

    /// The bundler failed.
    #[error(transparent)]
    Bundle(#[from] BundleError),
}

fn join_paths(paths: &[PathBuf]) -> String {
    let mut joined = String::new();
    for (i, path) in paths.iter().enumerate() {
        if i > 0 {
            joined.push_str(", ");
        }
        let _ = write!(joined, "{}", path.display());
    }
    joined
}
