//! External bundler invocation.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::Bundle;
use crate::error::BundleError;

/// What to bundle: entry points plus bundler options.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BundleSpec {
    /// Script entry points, in order.
    pub entry_points: Vec<PathBuf>,
    /// Options forwarded to the bundler as command-line flags.
    pub options: BTreeMap<String, Value>,
}

/// Runs an esbuild-compatible command line bundler.
///
/// The bundler is invoked as
/// `<command> <entry>... --bundle --outfile=<tmp> [--option...]` and the
/// output file is read back once it exits successfully.
#[derive(Debug, Clone)]
pub struct CommandBundler {
    command: String,
}

impl CommandBundler {
    /// Create a bundler that runs `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// The bundler command.
    pub fn command(&self) -> &str {
        &self.command
    }
}

#[async_trait]
impl Bundle for CommandBundler {
    async fn bundle(&self, spec: &BundleSpec) -> Result<Vec<u8>, BundleError> {
        let scratch = tempfile::tempdir()?;
        let outfile = scratch.path().join("bundle.js");

        tracing::debug!(
            command = %self.command,
            entry_points = spec.entry_points.len(),
            "Running bundler"
        );

        let output = Command::new(&self.command)
            .args(bundle_args(spec, &outfile))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| BundleError::Spawn {
                command: self.command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BundleError::Failed {
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
            });
        }

        Ok(tokio::fs::read(&outfile).await?)
    }
}

/// Command-line arguments for one bundler run.
///
/// Options map to flags: `true` becomes `--name`, `false` and `null` are
/// omitted, arrays repeat as `--name:item`, anything else is `--name=value`.
pub(crate) fn bundle_args(spec: &BundleSpec, outfile: &Path) -> Vec<OsString> {
    let mut args: Vec<OsString> = spec
        .entry_points
        .iter()
        .map(|entry| entry.clone().into_os_string())
        .collect();
    args.push("--bundle".into());

    let mut outfile_arg = OsString::from("--outfile=");
    outfile_arg.push(outfile);
    args.push(outfile_arg);

    for (name, value) in &spec.options {
        match value {
            Value::Bool(true) => args.push(format!("--{name}").into()),
            Value::Bool(false) | Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    args.push(format!("--{name}:{}", scalar(item)).into());
                }
            }
            other => args.push(format!("--{name}={}", scalar(other)).into()),
        }
    }
    args
}

fn scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    fn args(spec: &BundleSpec) -> Vec<String> {
        bundle_args(spec, Path::new("/tmp/out/bundle.js"))
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_bundle_args_without_options() {
        let spec = BundleSpec {
            entry_points: vec![PathBuf::from("/site/app.js")],
            options: BTreeMap::new(),
        };

        assert_eq!(
            args(&spec),
            vec!["/site/app.js", "--bundle", "--outfile=/tmp/out/bundle.js"]
        );
    }

    #[test]
    fn test_bundle_args_map_options_to_flags() {
        let spec = BundleSpec {
            entry_points: vec![PathBuf::from("a.js"), PathBuf::from("b.js")],
            options: BTreeMap::from([
                ("minify".to_owned(), json!(true)),
                ("sourcemap".to_owned(), json!(false)),
                ("splitting".to_owned(), Value::Null),
                ("target".to_owned(), json!("es2020")),
                ("log-limit".to_owned(), json!(5)),
                ("external".to_owned(), json!(["react", "react-dom"])),
            ]),
        };

        assert_eq!(
            args(&spec),
            vec![
                "a.js",
                "b.js",
                "--bundle",
                "--outfile=/tmp/out/bundle.js",
                "--external:react",
                "--external:react-dom",
                "--log-limit=5",
                "--minify",
                "--target=es2020",
            ]
        );
    }

    #[tokio::test]
    async fn test_bundle_reports_missing_command() {
        let bundler = CommandBundler::new("strata-test-no-such-bundler");

        let err = bundler.bundle(&BundleSpec::default()).await.unwrap_err();

        assert!(
            matches!(&err, BundleError::Spawn { command, .. } if command == "strata-test-no-such-bundler")
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_bundle_reports_nonzero_exit() {
        let bundler = CommandBundler::new("false");

        let err = bundler.bundle(&BundleSpec::default()).await.unwrap_err();

        assert!(matches!(err, BundleError::Failed { .. }));
    }
}
