//! # Mozi API Library
//!
//! Helpers for axum services:
//!
//! - `errors` - `ApiError` payloads and `HandlerError` for unexpected failures
//! - `logging` - the structured access log line
//! - `server` - request logging middleware and router helpers
//! - `demo` - example routes used by `mozi-demo`

pub mod demo;
pub mod errors;
pub mod logging;
pub mod server;

pub use errors::{ApiError, ErrorKind, ErrorReport, HandlerError};
pub use logging::{AccessLog, API_LOG_TARGET};
pub use server::{log_request, not_found, with_request_logging};
