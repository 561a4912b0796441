//! Router construction.

use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;

use crate::handler;
use crate::middleware::{logging, security};
use crate::state::AppState;

/// Create the application router.
///
/// Every path goes through the fallback handler; the site tree is resolved
/// per request rather than registered as routes.
pub(crate) fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .fallback(handler::serve_path)
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(logging::log_request))
                .layer(security::content_type_options_layer()),
        )
        .with_state(state)
}
