//! Access log line - one structured JSON line per request.

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::StatusCode;
use serde_json::{Map, Value};
use tracing::{error, info};

use crate::errors::ErrorReport;

/// Tracing target of access log lines (`{app}_api` for the default app name).
pub const API_LOG_TARGET: &str = "mozi_api";

/// Status codes below 400 are logged at INFO, the rest at ERROR.
pub fn is_http_success(status: StatusCode) -> bool {
    status.as_u16() < 400
}

/// Request body as compact JSON, or `{}` if it is not valid JSON.
pub fn format_body(bytes: &[u8]) -> String {
    serde_json::from_slice::<Value>(bytes)
        .ok()
        .and_then(|json| serde_json::to_string(&json).ok())
        .unwrap_or_else(|| "{}".to_string())
}

/// Fields of one access log line, collected while the request is handled.
#[derive(Debug, Clone)]
pub struct AccessLog {
    pub client: Option<SocketAddr>,
    pub path: String,
    pub method: String,
    pub query: String,
    pub body: String,
    pub started_at: Instant,
}

impl AccessLog {
    pub fn new(method: &str, path: &str, query: &str) -> Self {
        Self {
            client: None,
            path: path.to_string(),
            method: method.to_string(),
            query: query.to_string(),
            body: "{}".to_string(),
            started_at: Instant::now(),
        }
    }

    pub fn with_client(mut self, client: Option<SocketAddr>) -> Self {
        self.client = client;
        self
    }

    pub fn with_body(mut self, bytes: &[u8]) -> Self {
        self.body = format_body(bytes);
        self
    }

    /// Milliseconds since the request started, rounded to 2 decimals.
    pub fn elapsed_ms(&self) -> f64 {
        let ms = self.started_at.elapsed().as_secs_f64() * 1000.0;
        (ms * 100.0).round() / 100.0
    }

    /// The line as an ordered JSON object:
    /// `h, p, u, m, q, b, [error_code], [detail], c, t`.
    pub fn to_value(&self, status: StatusCode, report: Option<&ErrorReport>, elapsed_ms: f64) -> Value {
        let mut line = Map::new();
        line.insert(
            "h".into(),
            self.client
                .map(|addr| Value::from(addr.ip().to_string()))
                .unwrap_or(Value::Null),
        );
        line.insert(
            "p".into(),
            self.client
                .map(|addr| Value::from(addr.port()))
                .unwrap_or(Value::Null),
        );
        line.insert("u".into(), Value::from(self.path.as_str()));
        line.insert("m".into(), Value::from(self.method.as_str()));
        line.insert("q".into(), Value::from(self.query.as_str()));
        line.insert("b".into(), Value::from(self.body.as_str()));

        if let Some(report) = report {
            if let Some(code) = report.error_code {
                line.insert("error_code".into(), Value::from(code));
            }
            line.insert("detail".into(), Value::from(report.detail.clone()));
        }

        line.insert("c".into(), Value::from(status.as_u16()));
        line.insert("t".into(), Value::from(elapsed_ms));
        Value::Object(line)
    }

    /// Emit the line: INFO below 400, ERROR otherwise.
    pub fn emit(&self, status: StatusCode, report: Option<&ErrorReport>) {
        let line = self.to_value(status, report, self.elapsed_ms()).to_string();
        if is_http_success(status) {
            info!(target: API_LOG_TARGET, "{}", line);
        } else {
            error!(target: API_LOG_TARGET, "{}", line);
        }
    }
}
