//! Router helpers attaching request logging and panic recovery to routes.

pub mod logging_middleware;

use std::any::Any;

use axum::{middleware, response::Response, Router};
use tower_http::catch_panic::CatchPanicLayer;

use crate::errors::{internal_error_response, ApiError};

pub use logging_middleware::log_request;

/// Wrap every route of `router` with the request logging middleware.
///
/// Panics inside handlers are turned into `500 Internal Server Error`
/// responses before the middleware sees them, so they are logged too.
/// Routes added after this call are not wrapped.
pub fn with_request_logging<S>(router: Router<S>) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router
        .route_layer(CatchPanicLayer::custom(handle_panic))
        .route_layer(middleware::from_fn(log_request))
}

/// Fallback answering unknown routes with a `NotFound` error payload.
pub async fn not_found() -> ApiError {
    ApiError::not_found("Not Found")
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    internal_error_response(message)
}
