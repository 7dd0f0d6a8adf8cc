//! Demo routes served by the `mozi-demo` binary.

use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::{ApiError, HandlerError};
use crate::server::{not_found, with_request_logging};

#[derive(Debug, Deserialize, Serialize)]
pub struct Greeting {
    pub name: String,
}

async fn hello() -> Json<Value> {
    Json(json!({ "message": "Hello Demo." }))
}

async fn error() -> Result<Json<Value>, ApiError> {
    Err(ApiError::generic("this is a test error."))
}

async fn missing() -> Result<Json<Value>, ApiError> {
    Err(ApiError::not_found("user not found"))
}

async fn greet(payload: Result<Json<Greeting>, JsonRejection>) -> Result<Json<Value>, ApiError> {
    let Json(greeting) = payload?;
    if greeting.name.trim().is_empty() {
        return Err(ApiError::validation("name must not be empty"));
    }
    Ok(Json(json!({ "message": format!("Hello {}.", greeting.name) })))
}

async fn broken() -> Result<Json<Value>, HandlerError> {
    Err(anyhow::anyhow!("database is down").into())
}

async fn panics() -> Json<Value> {
    panic!("handler panicked")
}

/// `/demo/*` routes, each wrapped with request logging.
pub fn router() -> Router {
    let demo = Router::new()
        .route("/demo/hello", get(hello))
        .route("/demo/error", get(error))
        .route("/demo/missing", get(missing))
        .route("/demo/greet", post(greet))
        .route("/demo/broken", get(broken))
        .route("/demo/panic", get(panics));

    with_request_logging(demo).fallback(not_found)
}
