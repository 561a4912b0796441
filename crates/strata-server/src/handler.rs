//! Site request handler.

use std::error::Error;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::{Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use strata_vfs::{Entry, VfsError, uri};

use crate::state::AppState;

/// Serve one path of the site.
pub(crate) async fn serve_path(
    State(state): State<Arc<AppState>>,
    method: Method,
    request_uri: Uri,
) -> Response {
    let include_body = match method {
        Method::GET => true,
        Method::HEAD => false,
        _ => return StatusCode::METHOD_NOT_ALLOWED.into_response(),
    };

    // Decode URL-encoded characters (e.g., %20 → space). The query is not
    // part of `path()`.
    let Ok(path) = urlencoding::decode(request_uri.path()) else {
        return StatusCode::BAD_REQUEST.into_response();
    };
    let Some((dir_uri, name)) = uri::split_path(&path) else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    let listing = match state.vfs.list(dir_uri).await {
        Ok(listing) => listing,
        Err(VfsError::MalformedUri(_)) => return StatusCode::NOT_FOUND.into_response(),
        Err(e) => return internal_error(&e),
    };

    let entry = match listing.get(name) {
        None | Some(Entry::Directory(_)) => return StatusCode::NOT_FOUND.into_response(),
        Some(Entry::Protected(_)) => return StatusCode::FORBIDDEN.into_response(),
        Some(Entry::Conflict(_)) => return StatusCode::CONFLICT.into_response(),
        Some(entry @ (Entry::Static(_) | Entry::Rendered(_) | Entry::Bundled(_))) => entry,
    };

    let Some(content_type) = entry.content_type() else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let body = if include_body {
        match entry.content().await {
            Ok(content) => Body::from(content),
            Err(e) => return internal_error(&e),
        }
    } else {
        Body::empty()
    };

    ([(header::CONTENT_TYPE, content_type)], body).into_response()
}

fn internal_error(err: &dyn Error) -> Response {
    let message = error_chain(err);
    tracing::error!(error = %message, "Request failed");
    (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
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
