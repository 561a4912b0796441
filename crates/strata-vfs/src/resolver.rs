//! Directory listing resolution.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use strata_render::{Bundle, BundleSpec, Render};

use crate::entry::{BundledFile, Directory, Entry, RenderedFile, StaticFile};
use crate::error::VfsError;
use crate::listing::{INDEX_NAME, Listing};
use crate::policy::{FileRole, NamingPolicy};
use crate::routes::{RouteDescriptor, RouteModule, resolve_route_path};
use crate::uri::{self, uri_ancestry, validate_directory_uri};

/// Resolves directory URIs of one site into listings.
///
/// Cheap to share behind an [`Arc`]; every call to [`Vfs::list`] reads the
/// filesystem again.
#[derive(Clone)]
pub struct Vfs {
    root: PathBuf,
    policy: NamingPolicy,
    renderer: Arc<dyn Render>,
    bundler: Arc<dyn Bundle>,
}

impl std::fmt::Debug for Vfs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vfs")
            .field("root", &self.root)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl Vfs {
    /// Create a resolver for the site rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, renderer: Arc<dyn Render>, bundler: Arc<dyn Bundle>) -> Self {
        Self {
            root: root.into(),
            policy: NamingPolicy::default(),
            renderer,
            bundler,
        }
    }

    /// Replace the naming policy.
    #[must_use]
    pub fn with_policy(mut self, policy: NamingPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Site root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Naming policy in use.
    pub fn policy(&self) -> &NamingPolicy {
        &self.policy
    }

    /// Resolve the listing for directory URI `uri`.
    ///
    /// A URI with any hidden segment resolves to an empty listing, however
    /// deep that segment is.
    ///
    /// # Errors
    ///
    /// Returns [`VfsError::MalformedUri`] for malformed URIs,
    /// [`VfsError::HardConflict`] for colliding entries, and I/O or route
    /// module failures as they occur.
    pub async fn list(&self, uri: &str) -> Result<Listing, VfsError> {
        validate_directory_uri(uri)?;

        let mut listing = Listing::new(uri);
        if uri::segments(uri).any(|segment| self.policy.is_hidden_dir(segment)) {
            tracing::debug!(uri, "Hidden directory, empty listing");
            return Ok(listing);
        }

        self.add_filesystem_entries(uri, &mut listing).await?;
        self.add_routed_entries(uri, &mut listing).await?;
        Ok(listing)
    }

    fn directory_path(&self, uri: &str) -> PathBuf {
        uri::segments(uri).fold(self.root.clone(), |path, segment| path.join(segment))
    }

    async fn add_filesystem_entries(&self, uri: &str, listing: &mut Listing) -> Result<(), VfsError> {
        let dir = self.directory_path(uri);
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(read_dir) => read_dir,
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                return Ok(());
            }
            Err(source) => return Err(VfsError::Io { path: dir, source }),
        };

        let mut children = Vec::new();
        while let Some(child) = read_dir.next_entry().await.map_err(|source| VfsError::Io {
            path: dir.clone(),
            source,
        })? {
            match child.file_name().into_string() {
                Ok(name) => children.push((name, child.path())),
                Err(name) => tracing::warn!(?name, "Skipping non-UTF-8 file name"),
            }
        }
        children.sort();

        for (name, path) in children {
            // Follows symlinks.
            let metadata = tokio::fs::metadata(&path)
                .await
                .map_err(|source| VfsError::Io {
                    path: path.clone(),
                    source,
                })?;

            if metadata.is_dir() {
                if !self.policy.is_hidden_dir(&name) {
                    let entry = Entry::Directory(Directory {
                        uri: format!("{uri}{name}/"),
                    });
                    listing.insert(name, entry)?;
                }
                continue;
            }

            match self.policy.classify_file(&name) {
                FileRole::Index => {
                    listing.insert(INDEX_NAME.to_owned(), Entry::Static(StaticFile { path }))?;
                }
                FileRole::IndexTemplate => {
                    let entry = self.rendered(path, uri.to_owned());
                    listing.insert(INDEX_NAME.to_owned(), entry)?;
                }
                FileRole::ServerConfig => {
                    listing.insert(name, Entry::Protected(StaticFile { path }))?;
                }
                FileRole::Static => listing.insert(name, Entry::Static(StaticFile { path }))?,
                FileRole::RouteModule | FileRole::Ignored => {}
            }
        }
        Ok(())
    }

    async fn add_routed_entries(&self, uri: &str, listing: &mut Listing) -> Result<(), VfsError> {
        for ancestor in uri_ancestry(uri) {
            let module_dir = self.directory_path(&ancestor);
            let module_path = module_dir.join(&self.policy.route_module);
            let Some(module) = RouteModule::load(&module_path).await? else {
                continue;
            };

            for (target, descriptor) in module.routes {
                let Some(remainder) = target.strip_prefix(uri) else {
                    continue;
                };

                let (name, deep) = match remainder.split_once('/') {
                    Some((first, _)) => (first, true),
                    None => (remainder, false),
                };
                // An empty leaf is the routed index; an empty directory is not.
                if matches!(name, "." | "..") || (deep && name.is_empty()) {
                    tracing::warn!(
                        route = %target,
                        module = %module_path.display(),
                        "Skipping route with an empty or dot segment"
                    );
                    continue;
                }

                if deep {
                    if self.policy.is_hidden_dir(name) {
                        continue;
                    }
                    let entry = Entry::Directory(Directory {
                        uri: format!("{uri}{name}/"),
                    });
                    listing.insert(name.to_owned(), entry)?;
                    continue;
                }

                let entry = self.routed(&module_dir, &target, descriptor);
                listing.insert(name.to_owned(), entry)?;
            }
        }
        Ok(())
    }

    fn routed(&self, module_dir: &Path, target: &str, descriptor: RouteDescriptor) -> Entry {
        let resolve = |path: &Path| resolve_route_path(&self.root, module_dir, path);
        match descriptor {
            RouteDescriptor::Render { path } => self.rendered(resolve(&path), target.to_owned()),
            RouteDescriptor::Bundle {
                entry_points,
                options,
            } => Entry::Bundled(BundledFile::new(
                BundleSpec {
                    entry_points: entry_points.iter().map(|p| resolve(p)).collect(),
                    options,
                },
                Arc::clone(&self.bundler),
            )),
            RouteDescriptor::Static { path } => Entry::Static(StaticFile {
                path: resolve(&path),
            }),
        }
    }

    fn rendered(&self, path: PathBuf, base_uri: String) -> Entry {
        Entry::Rendered(RenderedFile::new(path, base_uri, Arc::clone(&self.renderer)))
    }
}
