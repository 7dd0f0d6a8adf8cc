//! Error payloads returned by API handlers.
//!
//! Every error response carries an [`ErrorReport`] extension so the request
//! logging middleware can log the error payload next to the status.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mozi_core::AppEnv;
use serde_json::{json, Value};

/// Category of an [`ApiError`], carrying the domain error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Code 100, 400 Bad Request
    Generic,
    /// Code 101, 404 Not Found
    NotFound,
    /// Code 90, 422 Unprocessable Entity
    Validation,
    /// Code 102, 422 Unprocessable Entity. Malformed request input.
    RequestValidation,
    Custom { code: i64, status: StatusCode },
}

impl ErrorKind {
    pub fn code(&self) -> i64 {
        match self {
            Self::Generic => 100,
            Self::NotFound => 101,
            Self::Validation => 90,
            Self::RequestValidation => 102,
            Self::Custom { code, .. } => *code,
        }
    }

    pub fn default_status(&self) -> StatusCode {
        match self {
            Self::Generic => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Validation | Self::RequestValidation => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Custom { status, .. } => *status,
        }
    }
}

/// Application-level error answered as `{"error_code", "detail"}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    kind: ErrorKind,
    status: StatusCode,
    detail: Option<String>,
}

impl ApiError {
    pub fn new(kind: ErrorKind, detail: Option<String>) -> Self {
        Self {
            kind,
            status: kind.default_status(),
            detail,
        }
    }

    pub fn generic(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic, Some(detail.into()))
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, Some(detail.into()))
    }

    pub fn validation(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, Some(detail.into()))
    }

    pub fn request_validation(detail: impl Into<String>) -> Self {
        Self::new(ErrorKind::RequestValidation, Some(detail.into()))
    }

    pub fn custom(code: i64, status: StatusCode, detail: Option<String>) -> Self {
        Self::new(ErrorKind::Custom { code, status }, detail)
    }

    /// Override the kind's default status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn error_code(&self) -> i64 {
        self.kind.code()
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Response body: `{"error_code": <int>, "detail": <string|null>}`.
    pub fn payload(&self) -> Value {
        json!({
            "error_code": self.error_code(),
            "detail": self.detail,
        })
    }

    pub fn report(&self) -> ErrorReport {
        ErrorReport {
            status: self.status,
            error_code: Some(self.error_code()),
            detail: self.detail.clone(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{} (error_code={})", detail, self.error_code()),
            None => write!(f, "{} (error_code={})", self.status, self.error_code()),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let report = self.report();
        let mut response = (self.status, Json(self.payload())).into_response();
        response.extensions_mut().insert(report);
        response
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::request_validation(format!("Invalid body: {};", rejection.body_text()))
    }
}

/// What went wrong while handling a request, attached to the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorReport {
    pub status: StatusCode,
    pub error_code: Option<i64>,
    pub detail: Option<String>,
}

impl ErrorReport {
    /// An uncaught failure answered with 500.
    pub fn internal(detail: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            error_code: None,
            detail: Some(detail.into()),
        }
    }
}

/// Error type for handlers that can fail in unexpected ways.
///
/// Internal errors are answered with `500 Internal Server Error: {message}`
/// as plain text. Outside production the full error chain is included.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for HandlerError {
    fn into_response(self) -> Response {
        match self {
            Self::Api(error) => error.into_response(),
            Self::Internal(error) => {
                let message = if AppEnv::current().is_debug() {
                    format!("{:#}", error)
                } else {
                    error.to_string()
                };
                internal_error_response(message)
            }
        }
    }
}

/// `500 text/plain "Internal Server Error: {message}"` with its report.
pub fn internal_error_response(message: String) -> Response {
    let body = format!("Internal Server Error: {}", message);
    let mut response = (StatusCode::INTERNAL_SERVER_ERROR, body).into_response();
    response
        .extensions_mut()
        .insert(ErrorReport::internal(message));
    response
}
