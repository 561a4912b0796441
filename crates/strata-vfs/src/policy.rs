//! File naming conventions.

/// How a file found on disk contributes to a listing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileRole {
    /// Static index, stored under the empty name.
    Index,
    /// Index template, rendered and stored under the empty name.
    IndexTemplate,
    /// Route module, read for declared routes.
    RouteModule,
    /// Server configuration, copied by builds but never served.
    ServerConfig,
    /// Served byte for byte under its own name.
    Static,
    /// Not part of the site.
    Ignored,
}

/// Naming rules used to classify directory contents.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamingPolicy {
    /// Static index file name.
    pub index_file: String,
    /// Index template file name.
    pub index_template: String,
    /// Suffix marking template sources, which are never served raw.
    pub template_suffix: String,
    /// Per-directory route module file name.
    pub route_module: String,
    /// File names treated as server configuration.
    pub server_config_names: Vec<String>,
    /// Directory names hidden along with everything under them.
    pub ignored_dirs: Vec<String>,
    /// File suffixes never served.
    pub ignored_suffixes: Vec<String>,
}

impl Default for NamingPolicy {
    fn default() -> Self {
        Self {
            index_file: "index.html".to_owned(),
            index_template: "index.jinja.html".to_owned(),
            template_suffix: ".jinja.html".to_owned(),
            route_module: "routes.toml".to_owned(),
            server_config_names: vec![".htaccess".to_owned()],
            ignored_dirs: vec!["node_modules".to_owned()],
            ignored_suffixes: vec![".md".to_owned()],
        }
    }
}

impl NamingPolicy {
    /// Whether a directory name (or URI segment) hides its whole subtree.
    pub fn is_hidden_dir(&self, name: &str) -> bool {
        name.starts_with('.') || self.ignored_dirs.iter().any(|d| d == name)
    }

    /// Classify a regular file by name.
    ///
    /// Server configuration names are checked before the dotfile rule, so
    /// `.htaccess` is kept as a protected file.
    pub fn classify_file(&self, name: &str) -> FileRole {
        if name == self.index_file {
            FileRole::Index
        } else if name == self.index_template {
            FileRole::IndexTemplate
        } else if name == self.route_module {
            FileRole::RouteModule
        } else if self.server_config_names.iter().any(|n| n == name) {
            FileRole::ServerConfig
        } else if name.ends_with(&self.template_suffix)
            || name.starts_with('.')
            || !name.contains('.')
            || self.ignored_suffixes.iter().any(|s| name.ends_with(s.as_str()))
        {
            FileRole::Ignored
        } else {
            FileRole::Static
        }
    }
}
