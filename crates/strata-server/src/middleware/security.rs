//! Security headers middleware.

use axum::http::HeaderValue;
use axum::http::header::X_CONTENT_TYPE_OPTIONS;
use tower_http::set_header::SetResponseHeaderLayer;

/// Create layer that adds `X-Content-Type-Options: nosniff`.
///
/// Static files are served with a guessed content type; browsers must not
/// second-guess it.
pub(crate) fn content_type_options_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::overriding(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"))
}
