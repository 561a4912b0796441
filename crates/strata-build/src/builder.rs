//! Static site builder.
//!
//! Walks the virtual tree from a root URI and writes every leaf to disk.
//! Directory traversal fans out without limit; content generation (reads,
//! renders, bundles) holds a permit from a shared semaphore.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use strata_vfs::{ContentError, Entry, Vfs, VfsError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// File name written for a directory's index entry.
pub const INDEX_OUTPUT_NAME: &str = "index.html";

/// Configuration for static site building.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BuildConfig {
    /// Maximum number of content jobs running at once.
    pub jobs: usize,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { jobs: 8 }
    }
}

/// Error returned by the static site builder.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A directory listing could not be resolved.
    #[error(transparent)]
    Vfs(#[from] VfsError),
    /// A directory has more than one index entry.
    #[error("conflicting index entries in {uri}")]
    IndexConflict {
        /// Directory URI holding the conflict.
        uri: String,
        /// Conflict details.
        #[source]
        source: ContentError,
    },
    /// Content for an output file could not be produced.
    #[error("failed to generate {}", path.display())]
    Content {
        /// Output file path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: ContentError,
    },
    /// An output file or directory could not be written.
    #[error("failed to write {}", path.display())]
    Io {
        /// Output path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// A generation task panicked or was aborted.
    #[error("build task failed")]
    Task(#[from] tokio::task::JoinError),
    /// The job limiter was closed before a task could start.
    #[error("build cancelled")]
    Cancelled,
}

type BuildFuture = Pin<Box<dyn Future<Output = Result<usize, BuildError>> + Send>>;

/// Builds a static site from a [`Vfs`].
#[derive(Debug)]
pub struct StaticSiteBuilder {
    vfs: Arc<Vfs>,
    limiter: Arc<Semaphore>,
}

impl StaticSiteBuilder {
    /// Create a builder. A `jobs` limit of zero is treated as one.
    #[must_use]
    pub fn new(vfs: Arc<Vfs>, config: BuildConfig) -> Self {
        Self {
            vfs,
            limiter: Arc::new(Semaphore::new(config.jobs.max(1))),
        }
    }

    /// Write the tree under `root_uri` into `output`.
    ///
    /// Returns the number of files written. The first failure aborts every
    /// job still running; output written so far is left in place.
    pub async fn build(&self, root_uri: &str, output: &Path) -> Result<usize, BuildError> {
        build_dir(
            Arc::clone(&self.vfs),
            Arc::clone(&self.limiter),
            root_uri.to_owned(),
            output.to_path_buf(),
        )
        .await
    }
}

fn build_dir(vfs: Arc<Vfs>, limiter: Arc<Semaphore>, uri: String, out: PathBuf) -> BuildFuture {
    Box::pin(async move {
        let listing = vfs.list(&uri).await?;
        tokio::fs::create_dir_all(&out)
            .await
            .map_err(|source| BuildError::Io {
                path: out.clone(),
                source,
            })?;

        // Dropping the set on early return aborts the remaining jobs.
        let mut jobs = JoinSet::new();
        for (name, entry) in listing {
            match entry {
                Entry::Directory(dir) => {
                    jobs.spawn(build_dir(
                        Arc::clone(&vfs),
                        Arc::clone(&limiter),
                        dir.uri,
                        out.join(&name),
                    ));
                }
                Entry::Conflict(conflict) => {
                    return Err(BuildError::IndexConflict {
                        uri,
                        source: ContentError::IndexConflict(conflict.paths()),
                    });
                }
                entry => {
                    let file_name = if name.is_empty() {
                        INDEX_OUTPUT_NAME
                    } else {
                        name.as_str()
                    };
                    let target = out.join(file_name);
                    jobs.spawn(generate(entry, target, Arc::clone(&limiter)));
                }
            }
        }

        let mut written = 0;
        while let Some(joined) = jobs.join_next().await {
            written += joined??;
        }
        Ok(written)
    })
}

async fn generate(entry: Entry, target: PathBuf, limiter: Arc<Semaphore>) -> Result<usize, BuildError> {
    let Ok(_permit) = limiter.acquire().await else {
        return Err(BuildError::Cancelled);
    };

    tracing::info!(path = %target.display(), kind = entry.kind(), "generating");
    let content = entry
        .content()
        .await
        .map_err(|source| BuildError::Content {
            path: target.clone(),
            source,
        })?;
    tokio::fs::write(&target, content)
        .await
        .map_err(|source| BuildError::Io {
            path: target,
            source,
        })?;
    Ok(1)
}

#[cfg(test)]
mod tests {
    use std::fmt::Write as _;
    use std::fs;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use strata_render::{MockBundler, MockRenderer};
    use strata_vfs::NamingPolicy;
    use tempfile::TempDir;

    use super::*;

    fn site(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (path, content) in files {
            let path = dir.path().join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, content).unwrap();
        }
        dir
    }

    fn builder(site: &TempDir, renderer: Arc<MockRenderer>, jobs: usize) -> StaticSiteBuilder {
        let vfs = Vfs::new(site.path(), renderer, Arc::new(MockBundler::new()));
        StaticSiteBuilder::new(Arc::new(vfs), BuildConfig { jobs })
    }

    fn read(path: &Path) -> String {
        fs::read_to_string(path).unwrap()
    }

    #[tokio::test]
    async fn test_build_mirrors_tree() {
        let site = site(&[
            ("index.html", "<h1>home</h1>"),
            ("css/site.css", "body {}"),
            (".htaccess", "Deny from all"),
            ("README.md", "not copied"),
            ("blog/index.jinja.html", "{{ current_uri }}"),
            (
                "routes.toml",
                r#"
[routes."/js/app.js"]
type = "bundle"
entry_points = ["app.js"]
"#,
            ),
        ]);
        let out = tempfile::tempdir().unwrap();
        let out_dir = out.path().join("dist");

        let written = builder(&site, Arc::new(MockRenderer::new()), 8)
            .build("/", &out_dir)
            .await
            .unwrap();

        assert_eq!(written, 5);
        assert_eq!(read(&out_dir.join("index.html")), "<h1>home</h1>");
        assert_eq!(read(&out_dir.join("css/site.css")), "body {}");
        assert_eq!(read(&out_dir.join(".htaccess")), "Deny from all");
        assert_eq!(
            read(&out_dir.join("blog/index.html")),
            format!(
                "rendered {} at /blog/",
                site.path().join("blog/index.jinja.html").display()
            )
        );
        assert_eq!(
            read(&out_dir.join("js/app.js")),
            format!("bundle {}", site.path().join("app.js").display())
        );
        assert!(!out_dir.join("README.md").exists());
        assert!(!out_dir.join("routes.toml").exists());
    }

    #[tokio::test]
    async fn test_build_copies_protected_server_config() {
        let site = site(&[("secret.conf", "password=hunter2")]);
        let vfs = Vfs::new(
            site.path(),
            Arc::new(MockRenderer::new()),
            Arc::new(MockBundler::new()),
        )
        .with_policy(NamingPolicy {
            server_config_names: vec!["secret.conf".to_owned()],
            ..NamingPolicy::default()
        });
        let out = tempfile::tempdir().unwrap();

        StaticSiteBuilder::new(Arc::new(vfs), BuildConfig::default())
            .build("/", out.path())
            .await
            .unwrap();

        assert_eq!(read(&out.path().join("secret.conf")), "password=hunter2");
    }

    #[tokio::test]
    async fn test_build_limits_concurrent_content_jobs() {
        let mut routes = String::new();
        for i in 0..10 {
            writeln!(
                routes,
                "[routes.\"/pages/page{i}.html\"]\ntype = \"render\"\npath = \"page.jinja.html\"\n"
            )
            .unwrap();
        }
        let site = site(&[("routes.toml", &routes)]);
        let renderer = Arc::new(MockRenderer::new().with_delay(Duration::from_millis(20)));
        let out = tempfile::tempdir().unwrap();

        let written = builder(&site, Arc::clone(&renderer), 2)
            .build("/", out.path())
            .await
            .unwrap();

        assert_eq!(written, 10);
        assert_eq!(renderer.calls().len(), 10);
        assert_eq!(renderer.max_in_flight(), 2);
    }

    #[tokio::test]
    async fn test_build_fails_on_index_conflict() {
        let site = site(&[("a/index.html", "static"), ("a/index.jinja.html", "template")]);
        let out = tempfile::tempdir().unwrap();

        let err = builder(&site, Arc::new(MockRenderer::new()), 8)
            .build("/", out.path())
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::IndexConflict { ref uri, .. } if uri == "/a/"));
    }

    #[tokio::test]
    async fn test_build_fails_on_render_failure() {
        let site = site(&[("index.jinja.html", "{{")]);
        let out = tempfile::tempdir().unwrap();

        let err = builder(&site, Arc::new(MockRenderer::new().with_failure("boom")), 8)
            .build("/", out.path())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            BuildError::Content { ref path, .. } if path == &out.path().join("index.html")
        ));
    }

    #[tokio::test]
    async fn test_build_fails_on_hard_conflict() {
        let site = site(&[
            ("robots.txt", "x"),
            (
                "routes.toml",
                "[routes.\"/robots.txt\"]\ntype = \"static\"\npath = \"other.txt\"\n",
            ),
        ]);
        let out = tempfile::tempdir().unwrap();

        let err = builder(&site, Arc::new(MockRenderer::new()), 8)
            .build("/", out.path())
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Vfs(VfsError::HardConflict { .. })));
    }

    #[tokio::test]
    async fn test_build_rejects_malformed_root() {
        let site = site(&[]);
        let out = tempfile::tempdir().unwrap();

        let err = builder(&site, Arc::new(MockRenderer::new()), 8)
            .build("/a/../", out.path())
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::Vfs(VfsError::MalformedUri(_))));
    }
}
