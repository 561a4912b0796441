//! Worker side of the render protocol.
//!
//! Runs inside `strata render-worker`: announce readiness, read one request,
//! render it, reply, exit.

use std::io::{self, BufRead, Write};

use crate::protocol::{self, RenderRequest, WorkerMessage};
use crate::template;

/// Serve one render request over standard input and output.
///
/// A closed stdin (or stdout) means the parent no longer cares about this
/// worker, so it is not treated as an error.
///
/// # Errors
///
/// Returns any other I/O error on the protocol streams.
pub fn serve_stdio() -> io::Result<()> {
    match serve(io::stdin().lock(), io::stdout().lock()) {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        other => other,
    }
}

/// Serve one render request from `input`, replying on `output`.
///
/// # Errors
///
/// Returns I/O errors from either stream.
pub fn serve(mut input: impl BufRead, mut output: impl Write) -> io::Result<()> {
    send(&mut output, &WorkerMessage::Ready)?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(());
    }

    let reply = match protocol::decode::<RenderRequest>(&line) {
        Ok(request) => match template::render_template(&request.template_path, &request.base_uri) {
            Ok(result) => WorkerMessage::Result { result },
            Err(e) => WorkerMessage::Error {
                error: e.to_string(),
            },
        },
        Err(e) => WorkerMessage::Error {
            error: format!("malformed render request: {e}"),
        },
    };
    send(&mut output, &reply)
}

fn send(output: &mut impl Write, message: &WorkerMessage) -> io::Result<()> {
    let line = protocol::encode(message).map_err(io::Error::other)?;
    output.write_all(line.as_bytes())?;
    output.flush()
}
