//! Per-directory route modules.
//!
//! A route module is a TOML table mapping absolute target URIs to route
//! descriptors:
//!
//! ```toml
//! [routes."/blog/index.html"]
//! type = "render"
//! path = "templates/blog.jinja.html"
//!
//! [routes."/js/app.js"]
//! type = "bundle"
//! entry_points = ["/src/app.ts"]
//! options = { minify = true }
//! ```
//!
//! Relative paths resolve against the module's own directory, paths starting
//! with `/` against the site root.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{RouteModuleError, VfsError};

/// Parsed route module.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RouteModule {
    /// Target URI to descriptor.
    #[serde(default)]
    pub routes: BTreeMap<String, RouteDescriptor>,
}

/// How a declared route produces its content.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RouteDescriptor {
    /// Render a template; its base URI is the route's target URI.
    Render {
        /// Template file.
        path: PathBuf,
    },
    /// Bundle script entry points.
    Bundle {
        /// Entry points, in order.
        entry_points: Vec<PathBuf>,
        /// Bundler options.
        #[serde(default)]
        options: BTreeMap<String, Value>,
    },
    /// Serve an existing file.
    Static {
        /// Served file.
        path: PathBuf,
    },
}

impl RouteModule {
    /// Load the module at `path`.
    ///
    /// Returns `Ok(None)` if there is no module there.
    pub(crate) async fn load(path: &Path) -> Result<Option<Self>, VfsError> {
        let text = match tokio::fs::read_to_string(path).await {
            Ok(text) => text,
            Err(e) if matches!(e.kind(), io::ErrorKind::NotFound | io::ErrorKind::NotADirectory) => {
                return Ok(None);
            }
            Err(e) => return Err(route_module_error(path, e.into())),
        };

        let module = toml::from_str(&text).map_err(|e| route_module_error(path, e.into()))?;
        Ok(Some(module))
    }
}

fn route_module_error(path: &Path, source: RouteModuleError) -> VfsError {
    VfsError::RouteModule {
        path: path.to_path_buf(),
        source,
    }
}

/// Resolve a path from a route descriptor.
pub(crate) fn resolve_route_path(site_root: &Path, module_dir: &Path, path: &Path) -> PathBuf {
    match path.strip_prefix("/") {
        Ok(site_relative) => site_root.join(site_relative),
        Err(_) => module_dir.join(path),
    }
}
