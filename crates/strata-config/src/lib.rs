//! Configuration management for strata.
//!
//! Parses `strata.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `server.host`
//! - `bundle.command`

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override server host.
    pub host: Option<String>,
    /// Override server port.
    pub port: Option<u16>,
    /// Override site root directory.
    pub root_dir: Option<PathBuf>,
    /// Override build concurrency.
    pub jobs: Option<usize>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "strata.toml";

/// Default number of pre-warmed render workers.
const DEFAULT_WORKERS: usize = 6;

/// Default number of concurrent content-generation jobs during a build.
const DEFAULT_JOBS: usize = 8;

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerConfig,
    /// Site configuration (paths are relative strings from TOML).
    site: SiteConfigRaw,
    /// Render worker configuration (paths are relative strings from TOML).
    render: RenderConfigRaw,
    /// Build configuration.
    pub build: BuildConfig,
    /// Bundler configuration.
    pub bundle: BundleConfig,
    /// File naming policy.
    pub naming: NamingConfig,

    /// Resolved site configuration (set after loading).
    #[serde(skip)]
    pub site_resolved: SiteConfig,
    /// Resolved render configuration (set after loading).
    #[serde(skip)]
    pub render_resolved: RenderConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Server configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_owned(),
            port: 80,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct SiteConfigRaw {
    root_dir: Option<String>,
}

/// Resolved site configuration with absolute paths.
#[derive(Debug, Default)]
pub struct SiteConfig {
    /// Directory the site tree is resolved from.
    pub root_dir: PathBuf,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct RenderConfigRaw {
    workers: Option<usize>,
    worker_program: Option<String>,
}

/// Resolved render worker configuration.
#[derive(Debug)]
pub struct RenderConfig {
    /// Number of idle workers kept pre-warmed.
    pub workers: usize,
    /// Worker executable (`None` means the running executable).
    pub worker_program: Option<PathBuf>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            worker_program: None,
        }
    }
}

/// Build configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Maximum number of concurrent content-generation jobs.
    pub jobs: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { jobs: DEFAULT_JOBS }
    }
}

/// Bundler configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Bundler executable.
    pub command: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            command: "esbuild".to_owned(),
        }
    }
}

/// File naming policy applied while listing directories.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// File names copied by builds but never served (e.g. `.htaccess`).
    pub server_config_names: Vec<String>,
    /// Directory names that hide their whole subtree.
    pub ignored_dirs: Vec<String>,
    /// File suffixes never served.
    pub ignored_suffixes: Vec<String>,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            server_config_names: vec![".htaccess".to_owned()],
            ignored_dirs: vec!["node_modules".to_owned()],
            ignored_suffixes: vec![".md".to_owned()],
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`server.host`").
        field: String,
        /// Error message (e.g., "${`STRATA_HOST`} not set").
        message: String,
    },
}

/// Require a string field to be non-empty.
fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

/// Require a count field to be positive.
fn require_positive(value: usize, field: &str) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation(format!(
            "{field} must be greater than 0"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `strata.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(host) = &settings.host {
            self.server.host.clone_from(host);
        }
        if let Some(port) = settings.port {
            self.server.port = port;
        }
        if let Some(root_dir) = &settings.root_dir {
            self.site_resolved.root_dir.clone_from(root_dir);
        }
        if let Some(jobs) = settings.jobs {
            self.build.jobs = jobs;
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            server: ServerConfig::default(),
            site: SiteConfigRaw::default(),
            render: RenderConfigRaw::default(),
            build: BuildConfig::default(),
            bundle: BundleConfig::default(),
            naming: NamingConfig::default(),
            site_resolved: SiteConfig {
                root_dir: base.join("public"),
            },
            render_resolved: RenderConfig::default(),
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after CLI overrides.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_non_empty(&self.server.host, "server.host")?;
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "server.port cannot be 0".to_owned(),
            ));
        }
        require_positive(self.render_resolved.workers, "render.workers")?;
        require_positive(self.build.jobs, "build.jobs")?;
        require_non_empty(&self.bundle.command, "bundle.command")?;
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.server.host = expand::expand_env(&self.server.host, "server.host")?;
        self.bundle.command = expand::expand_env(&self.bundle.command, "bundle.command")?;
        Ok(())
    }

    /// Resolve relative paths to absolute paths based on config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.site_resolved = SiteConfig {
            root_dir: config_dir.join(self.site.root_dir.as_deref().unwrap_or("public")),
        };
        self.render_resolved = RenderConfig {
            workers: self.render.workers.unwrap_or(DEFAULT_WORKERS),
            worker_program: self
                .render
                .worker_program
                .as_deref()
                .map(|program| config_dir.join(program)),
        };
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 80);
        assert_eq!(config.site_resolved.root_dir, PathBuf::from("/test/public"));
        assert_eq!(config.render_resolved.workers, 6);
        assert!(config.render_resolved.worker_program.is_none());
        assert_eq!(config.build.jobs, 8);
        assert_eq!(config.bundle.command, "esbuild");
        assert_eq!(config.naming.server_config_names, vec![".htaccess"]);
        assert_eq!(config.naming.ignored_dirs, vec!["node_modules"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.server.port, 80);
        assert_eq!(config.build.jobs, 8);
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 8080

[site]
root_dir = "www"

[render]
workers = 2
worker_program = "bin/strata"

[build]
jobs = 3

[bundle]
command = "/opt/esbuild"

[naming]
server_config_names = [".htaccess", "secret.conf"]
ignored_dirs = ["node_modules", "vendor"]
ignored_suffixes = [".md", ".bak"]
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.site_resolved.root_dir, PathBuf::from("/project/www"));
        assert_eq!(config.render_resolved.workers, 2);
        assert_eq!(
            config.render_resolved.worker_program,
            Some(PathBuf::from("/project/bin/strata"))
        );
        assert_eq!(config.build.jobs, 3);
        assert_eq!(config.bundle.command, "/opt/esbuild");
        assert_eq!(
            config.naming.server_config_names,
            vec![".htaccess", "secret.conf"]
        );
        assert_eq!(config.naming.ignored_suffixes, vec![".md", ".bak"]);
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let overrides = CliSettings {
            port: Some(9000),
            root_dir: Some(PathBuf::from("/srv/site")),
            jobs: Some(2),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0"); // Unchanged
        assert_eq!(config.site_resolved.root_dir, PathBuf::from("/srv/site"));
        assert_eq!(config.build.jobs, 2);
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 80);
        assert_eq!(config.site_resolved.root_dir, PathBuf::from("/test/public"));
    }

    #[test]
    fn test_validate_server_port_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.server.port = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_validate_jobs_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.build.jobs = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains("build.jobs"));
    }

    #[test]
    fn test_validate_workers_zero() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.render_resolved.workers = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("render.workers"));
    }

    #[test]
    fn test_validate_empty_bundle_command() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.bundle.command = String::new();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("bundle.command"));
    }

    #[test]
    fn test_load_explicit_missing_path() {
        let err = Config::load(Some(Path::new("/nonexistent/strata.toml")), None).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_from_file_resolves_relative_to_config_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("strata.toml");
        std::fs::write(&path, "[site]\nroot_dir = \"site\"\n").unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.site_resolved.root_dir, temp_dir.path().join("site"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("strata.toml");
        std::fs::write(&path, "[build]\njobs = 0\n").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_load_rejects_malformed_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("strata.toml");
        std::fs::write(&path, "[server\nport = ").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
