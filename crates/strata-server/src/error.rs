//! Error types for the HTTP server.

/// Server error type.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind {address}")]
    Bind {
        /// Requested `host:port`.
        address: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}
