//! HTTP Request Logging Middleware
//!
//! Logs one access line per request with the client address, request
//! fields, status and elapsed time. Error payloads come from the
//! [`ErrorReport`] attached to error responses.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use http_body_util::BodyExt;
use tracing::warn;

use crate::errors::ErrorReport;
use crate::logging::AccessLog;

/// Logging middleware for route handlers.
///
/// Buffers the request body so it can be logged, runs the handler and emits
/// the access line. The response passes through unchanged. A body that
/// fails to read is answered with a bare 500 and still logged.
pub async fn log_request(request: Request, next: Next) -> Result<Response, StatusCode> {
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let uri = request.uri().clone();
    let log = AccessLog::new(
        request.method().as_str(),
        uri.path(),
        uri.query().unwrap_or_default(),
    )
    .with_client(client);

    let (parts, body) = request.into_parts();
    let body_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            log.emit(
                StatusCode::INTERNAL_SERVER_ERROR,
                Some(&ErrorReport::internal(e.to_string())),
            );
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };
    let log = log.with_body(&body_bytes);

    // Reconstruct request with body
    let request = Request::from_parts(parts, Body::from(body_bytes));

    let response = next.run(request).await;

    let report = response.extensions().get::<ErrorReport>();
    let status = report.map(|r| r.status).unwrap_or_else(|| response.status());
    log.emit(status, report);

    Ok(response)
}
