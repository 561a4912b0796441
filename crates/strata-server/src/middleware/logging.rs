//! Request logging middleware.
//!
//! Logs one line per request once the response is ready: method, URI,
//! status, and elapsed milliseconds. The level follows the status class.

use std::time::Instant;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;

pub(crate) async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
    if response.status().is_server_error() {
        tracing::error!(%method, %uri, status, elapsed_ms, "request");
    } else if response.status().is_client_error() {
        tracing::warn!(%method, %uri, status, elapsed_ms, "request");
    } else {
        tracing::info!(%method, %uri, status, elapsed_ms, "request");
    }
    response
}
