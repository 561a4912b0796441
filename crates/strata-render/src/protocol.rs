//! Render worker wire protocol.
//!
//! Messages are JSON objects, one per line, exchanged over the worker's
//! standard input (requests) and standard output (replies). A worker sends
//! `ready` once at startup, receives exactly one [`RenderRequest`], and
//! answers with exactly one `result` or `error`.

use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Parent to worker: render one template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Template file to render.
    #[serde(rename = "templatePath")]
    pub template_path: PathBuf,
    /// Logical URI the rendered output will be served at.
    #[serde(rename = "baseURI")]
    pub base_uri: String,
}

/// Worker to parent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum WorkerMessage {
    /// The worker finished starting up and accepts a request.
    Ready,
    /// Rendered output.
    Result {
        /// Rendered text.
        result: String,
    },
    /// Rendering failed.
    Error {
        /// Failure description.
        error: String,
    },
}

/// Encode a message as a single newline-terminated line.
pub fn encode<T: Serialize>(message: &T) -> serde_json::Result<String> {
    let mut line = serde_json::to_string(message)?;
    line.push('\n');
    Ok(line)
}

/// Decode a message from one line (trailing newline allowed).
pub fn decode<T: DeserializeOwned>(line: &str) -> serde_json::Result<T> {
    serde_json::from_str(line.trim_end())
}
