//! Virtual filesystem for strata sites.
//!
//! Resolves a directory URI into a [`Listing`] by merging two sources:
//!
//! - the real directory under the site root, classified by [`NamingPolicy`]
//! - routes declared in `routes.toml` modules of the directory and every
//!   ancestor up to the root
//!
//! Every listing is built fresh on each call to [`Vfs::list`]; nothing is
//! cached between resolutions.
//!
//! # Conflicts
//!
//! Two directories under the same name coalesce. A second entry for the
//! directory's own index (the empty name) turns that slot into an
//! [`Entry::Conflict`], which only fails when it is accessed. Any other
//! collision fails resolution with [`VfsError::HardConflict`].

mod entry;
mod error;
mod listing;
mod policy;
mod resolver;
mod routes;
pub mod uri;

pub use entry::{BundledFile, Conflict, Directory, Entry, RenderedFile, StaticFile};
pub use error::{ContentError, RouteModuleError, VfsError};
pub use listing::{INDEX_NAME, Listing};
pub use policy::{FileRole, NamingPolicy};
pub use resolver::Vfs;
pub use routes::{RouteDescriptor, RouteModule};
pub use uri::uri_ancestry;
