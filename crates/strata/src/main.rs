//! strata CLI - virtual site tree server and static builder.
//!
//! Provides commands for:
//! - `serve`: Serve the site over HTTP
//! - `build`: Write the site as static files
//! - `render-worker` (hidden): Render one template for a parent process

mod commands;
mod error;
mod output;
mod site;

use std::error::Error;
use std::future::Future;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{BuildArgs, ServeArgs};
use error::CliError;
use output::Output;

/// strata - virtual site tree server and static builder.
#[derive(Parser)]
#[command(name = "strata", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the site over HTTP.
    Serve(ServeArgs),
    /// Build the site into a directory of static files.
    Build(BuildArgs),
    /// Render one template requested over stdin (used internally).
    #[command(name = "render-worker", hide = true)]
    RenderWorker,
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Serve(args) => args.verbose,
        Commands::Build(args) => args.verbose,
        Commands::RenderWorker => false,
    };

    // --verbose enables INFO level, otherwise use RUST_LOG.
    // Logs go to stderr: a render worker's stdout carries the protocol.
    let filter = if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Serve(args) => block_on(args.execute()),
        Commands::Build(args) => block_on(args.execute()),
        Commands::RenderWorker => commands::render_worker::execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {}", error_chain(&err)));
        std::process::exit(1);
    }
}

/// Run `future` on a single-threaded runtime.
fn block_on(future: impl Future<Output = Result<(), CliError>>) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(future)
}

/// Walk the error source chain and join all messages.
fn error_chain(err: &dyn Error) -> String {
    let mut msgs = vec![err.to_string()];
    let mut source = err.source();
    while let Some(s) = source {
        msgs.push(s.to_string());
        source = s.source();
    }
    msgs.join(": ")
}
