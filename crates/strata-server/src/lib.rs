//! HTTP server for strata sites.
//!
//! Every request resolves exactly one name through the [`Vfs`]: the path is
//! split at its last `/` into a directory URI and a leaf name, the directory
//! is listed, and the leaf entry decides the response.
//!
//! | Entry | Response |
//! |---|---|
//! | missing, directory | 404 |
//! | protected file | 403 |
//! | index conflict | 409 |
//! | anything else | 200, generated content |
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use strata_server::{Server, ServerConfig};
//!
//! let server = Server::bind(&ServerConfig::default(), Arc::new(vfs)).await?;
//! println!("{}", server.url()?);
//! server.run().await?;
//! ```

mod app;
mod error;
mod handler;
mod middleware;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use strata_vfs::Vfs;
use tokio::net::TcpListener;

pub use error::ServerError;
use state::AppState;

/// Server configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
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

/// A bound server, ready to accept connections.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
    router: Router,
}

impl Server {
    /// Bind the listening socket.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be resolved or bound.
    pub async fn bind(config: &ServerConfig, vfs: Arc<Vfs>) -> Result<Self, ServerError> {
        let listener = TcpListener::bind((config.host.as_str(), config.port))
            .await
            .map_err(|source| ServerError::Bind {
                address: format!("{}:{}", config.host, config.port),
                source,
            })?;

        let state = Arc::new(AppState { vfs });
        Ok(Self {
            listener,
            router: app::create_router(state),
        })
    }

    /// Address the server is listening on.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Base URL of the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket address cannot be read.
    pub fn url(&self) -> Result<String, ServerError> {
        Ok(url_from_socket_addr(self.local_addr()?))
    }

    /// Serve requests until Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails while running.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!(address = %self.local_addr()?, "Server running");
        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
        Ok(())
    }
}

/// Format a socket address as an `http://` URL, bracketing IPv6 hosts.
pub fn url_from_socket_addr(addr: SocketAddr) -> String {
    match addr {
        SocketAddr::V4(v4) => format!("http://{}:{}/", v4.ip(), v4.port()),
        SocketAddr::V6(v6) => format!("http://[{}]:{}/", v6.ip(), v6.port()),
    }
}

/// Wait for shutdown signal (Ctrl-C).
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received, stopping server...");
}
