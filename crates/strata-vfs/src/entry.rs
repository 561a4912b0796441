//! Resolved entries of a directory listing.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_render::{Bundle, BundleSpec, Render};

use crate::error::ContentError;

const HTML: &str = "text/html";
const JAVASCRIPT: &str = "application/javascript";

/// One name in a [`Listing`](crate::Listing).
#[derive(Clone, Debug)]
pub enum Entry {
    /// Subtree reachable by appending `name/` to the listing's URI.
    Directory(Directory),
    /// File served byte for byte.
    Static(StaticFile),
    /// Template rendered by an isolated worker.
    Rendered(RenderedFile),
    /// Scripts combined by the bundler.
    Bundled(BundledFile),
    /// File copied by builds but never served over HTTP.
    Protected(StaticFile),
    /// Two or more entries claimed the directory's index slot.
    Conflict(Conflict),
}

/// A subdirectory, resolved lazily through [`Vfs::list`](crate::Vfs::list).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directory {
    /// Directory URI of the subtree.
    pub uri: String,
}

/// A file on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StaticFile {
    /// Location of the file.
    pub path: PathBuf,
}

/// A template plus the URI its output is served at.
#[derive(Clone)]
pub struct RenderedFile {
    /// Template file.
    pub path: PathBuf,
    /// Logical URI used for site-relative links.
    pub base_uri: String,
    renderer: Arc<dyn Render>,
}

impl RenderedFile {
    /// Create a rendered file backed by `renderer`.
    pub fn new(path: PathBuf, base_uri: String, renderer: Arc<dyn Render>) -> Self {
        Self {
            path,
            base_uri,
            renderer,
        }
    }
}

impl fmt::Debug for RenderedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderedFile")
            .field("path", &self.path)
            .field("base_uri", &self.base_uri)
            .finish_non_exhaustive()
    }
}

/// A bundling job.
#[derive(Clone)]
pub struct BundledFile {
    /// Entry points and bundler options.
    pub spec: BundleSpec,
    bundler: Arc<dyn Bundle>,
}

impl BundledFile {
    /// Create a bundled file backed by `bundler`.
    pub fn new(spec: BundleSpec, bundler: Arc<dyn Bundle>) -> Self {
        Self { spec, bundler }
    }
}

impl fmt::Debug for BundledFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundledFile")
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// Entries that collided on the index slot, in insertion order.
#[derive(Clone, Debug)]
pub struct Conflict {
    entries: Vec<Entry>,
}

impl Conflict {
    pub(crate) fn new(first: Entry, second: Entry) -> Self {
        let mut conflict = Self {
            entries: Vec::new(),
        };
        conflict.push(first);
        conflict.push(second);
        conflict
    }

    /// Add another contender. Nested conflicts are flattened.
    pub(crate) fn push(&mut self, entry: Entry) {
        match entry {
            Entry::Conflict(other) => self.entries.extend(other.entries),
            entry => self.entries.push(entry),
        }
    }

    /// The colliding entries.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Source files of every colliding entry.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .flat_map(|entry| entry.source_paths().into_iter().map(Path::to_path_buf))
            .collect()
    }
}

impl Entry {
    /// Whether the entry is a subdirectory.
    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Short variant name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Directory(_) => "directory",
            Self::Static(_) => "static",
            Self::Rendered(_) => "rendered",
            Self::Bundled(_) => "bundled",
            Self::Protected(_) => "protected",
            Self::Conflict(_) => "conflict",
        }
    }

    /// Files this entry is produced from.
    pub fn source_paths(&self) -> Vec<&Path> {
        match self {
            Self::Static(file) | Self::Protected(file) => vec![file.path.as_path()],
            Self::Rendered(file) => vec![file.path.as_path()],
            Self::Bundled(file) => file.spec.entry_points.iter().map(PathBuf::as_path).collect(),
            Self::Conflict(conflict) => conflict
                .entries
                .iter()
                .flat_map(Entry::source_paths)
                .collect(),
            Self::Directory(_) => Vec::new(),
        }
    }

    /// Content type of the produced bytes, if the entry has content.
    pub fn content_type(&self) -> Option<String> {
        match self {
            Self::Static(file) | Self::Protected(file) => Some(
                mime_guess::from_path(&file.path)
                    .first_or_octet_stream()
                    .to_string(),
            ),
            Self::Rendered(_) => Some(HTML.to_owned()),
            Self::Bundled(_) => Some(JAVASCRIPT.to_owned()),
            Self::Directory(_) | Self::Conflict(_) => None,
        }
    }

    /// Produce the entry's bytes.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::NotContent`] for directories,
    /// [`ContentError::IndexConflict`] for conflicts, and the underlying
    /// failure for reads, renders, and bundles.
    pub async fn content(&self) -> Result<Vec<u8>, ContentError> {
        match self {
            Self::Static(file) | Self::Protected(file) => {
                tokio::fs::read(&file.path)
                    .await
                    .map_err(|source| ContentError::Io {
                        path: file.path.clone(),
                        source,
                    })
            }
            Self::Rendered(file) => {
                let html = file.renderer.render(&file.path, &file.base_uri).await?;
                Ok(html.into_bytes())
            }
            Self::Bundled(file) => Ok(file.bundler.bundle(&file.spec).await?),
            Self::Directory(_) => Err(ContentError::NotContent),
            Self::Conflict(conflict) => Err(ContentError::IndexConflict(conflict.paths())),
        }
    }
}
