//! Error types for rendering and bundling.

use std::process::ExitStatus;

use crate::worker::WorkerId;

/// Error returned by a render operation.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The worker process could not be started.
    #[error("failed to launch render worker")]
    Spawn(#[source] std::io::Error),

    /// The worker exited or disconnected before producing a result.
    #[error("render worker {id} exited without returning a response")]
    WorkerExited {
        /// Worker that went away.
        id: WorkerId,
    },

    /// The worker sent something the protocol does not allow at this point.
    #[error("render worker {id} protocol error: {message}")]
    Protocol {
        /// Worker that misbehaved.
        id: WorkerId,
        /// What went wrong.
        message: String,
    },

    /// The worker reported a rendering failure.
    #[error("render failed: {0}")]
    Failed(String),

    /// I/O error while talking to the worker.
    #[error("render worker I/O error")]
    Io(#[from] std::io::Error),
}

/// Error returned by a bundle operation.
#[derive(Debug, thiserror::Error)]
pub enum BundleError {
    /// The bundler executable could not be started.
    #[error("failed to run bundler `{command}`")]
    Spawn {
        /// Bundler command.
        command: String,
        /// Underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The bundler ran but exited unsuccessfully.
    #[error("bundler exited with {status}: {stderr}")]
    Failed {
        /// Exit status.
        status: ExitStatus,
        /// Captured standard error.
        stderr: String,
    },

    /// I/O error handling bundler output.
    #[error("bundle I/O error")]
    Io(#[from] std::io::Error),
}
