//! `strata serve` command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use strata_config::{CliSettings, Config};
use strata_server::{Server, ServerConfig};

use crate::error::CliError;
use crate::output::Output;
use crate::site::open_site;

/// Arguments for the serve command.
#[derive(Args)]
pub(crate) struct ServeArgs {
    /// `[PORT]` or `[HOST] [PORT]` to listen on (overrides config).
    #[arg(value_name = "ADDRESS")]
    address: Vec<String>,

    /// Path to configuration file (default: auto-discover strata.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Site root directory (overrides config).
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Enable verbose output (log every request).
    #[arg(short, long)]
    pub verbose: bool,
}

impl ServeArgs {
    /// Execute the serve command.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid, configuration fails, or
    /// the server fails to start.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();

        let (host, port) = parse_address(&self.address)?;
        let cli_settings = CliSettings {
            host,
            port,
            root_dir: self.root,
            ..CliSettings::default()
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;

        output.info(&format!(
            "Site root: {}",
            config.site_resolved.root_dir.display()
        ));

        let vfs = Arc::new(open_site(&config)?);
        let server_config = ServerConfig {
            host: config.server.host.clone(),
            port: config.server.port,
        };
        let server = Server::bind(&server_config, vfs).await?;
        output.highlight(&format!("Server running {}", server.url()?));

        server.run().await?;
        Ok(())
    }
}

/// Parse `[PORT]` or `[HOST] [PORT]`.
fn parse_address(args: &[String]) -> Result<(Option<String>, Option<u16>), CliError> {
    match args {
        [] => Ok((None, None)),
        [port] => Ok((None, Some(parse_port(port)?))),
        [host, port] => Ok((Some(host.clone()), Some(parse_port(port)?))),
        _ => Err(CliError::Validation(format!(
            "expected at most 2 arguments ([HOST] [PORT]), got {}",
            args.len()
        ))),
    }
}

fn parse_port(value: &str) -> Result<u16, CliError> {
    match value.parse::<u16>() {
        Ok(port) if port != 0 => Ok(port),
        _ => Err(CliError::Validation(format!("invalid port: {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_owned()).collect()
    }

    #[test]
    fn test_parse_address_defaults() {
        assert_eq!(parse_address(&[]).unwrap(), (None, None));
    }

    #[test]
    fn test_parse_address_port_only() {
        assert_eq!(parse_address(&args(&["8080"])).unwrap(), (None, Some(8080)));
    }

    #[test]
    fn test_parse_address_host_and_port() {
        assert_eq!(
            parse_address(&args(&["::1", "3000"])).unwrap(),
            (Some("::1".to_owned()), Some(3000))
        );
    }

    #[test]
    fn test_parse_address_rejects_bad_port() {
        for port in ["http", "0", "70000", "-1"] {
            let err = parse_address(&args(&[port])).unwrap_err();
            assert!(matches!(err, CliError::Validation(_)), "{port}");
        }
    }

    #[test]
    fn test_parse_address_rejects_extra_arguments() {
        let err = parse_address(&args(&["a", "1", "b"])).unwrap_err();
        assert!(matches!(err, CliError::Validation(ref m) if m.contains("got 3")));
    }
}
