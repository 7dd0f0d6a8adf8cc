//! Request logging and error payload tests against the demo router

use std::net::SocketAddr;

use axum::body::{Body, Bytes};
use axum::extract::ConnectInfo;
use axum::http::{header, Method, Request, StatusCode};
use axum::response::Response;
use http_body_util::{BodyExt, Full, Limited};
use mozi_api::{demo, API_LOG_TARGET};
use mozi_core::{Formatter, HandlerKind, LogRouter, LoggerConfig, LoggerItem};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tempfile::TempDir;
use tests::logs::{CapturedEvent, LogCapture};
use tower::ServiceExt;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;

fn client() -> SocketAddr {
    "127.0.0.1:5000".parse().unwrap()
}

fn get(uri: &str) -> Request<Body> {
    let mut request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    request.extensions_mut().insert(ConnectInfo(client()));
    request
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    let mut request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    request.extensions_mut().insert(ConnectInfo(client()));
    request
}

async fn send(request: Request<Body>) -> (StatusCode, String, Vec<CapturedEvent>) {
    let capture = LogCapture::new();
    let subscriber = tracing_subscriber::registry().with(capture.layer());
    let _guard = tracing::subscriber::set_default(subscriber);

    let response: Response = demo::router().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();

    (
        status,
        String::from_utf8(bytes.to_vec()).unwrap(),
        capture.for_target(API_LOG_TARGET),
    )
}

/// The single access line of a request.
fn access_line(events: &[CapturedEvent]) -> (Level, Value) {
    assert_eq!(events.len(), 1, "expected one access line, got {:?}", events);
    let line: Value = serde_json::from_str(&events[0].message).unwrap();
    (events[0].level, line)
}

#[tokio::test]
async fn test_success_is_logged_at_info() {
    let (status, body, events) = send(get("/demo/hello?page=2&size=10")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({ "message": "Hello Demo." }));

    assert_eq!(events.len(), 1);
    assert!(events[0]
        .message
        .starts_with(r#"{"h":"127.0.0.1","p":5000,"u":"/demo/hello","m":"GET","q":"page=2&size=10","b":"{}","c":200,"t":"#));

    let (level, line) = access_line(&events);
    assert_eq!(level, Level::INFO);
    assert!(line["t"].as_f64().unwrap() >= 0.0);
    assert!(line.get("error_code").is_none());
    assert!(line.get("detail").is_none());
}

#[tokio::test]
async fn test_api_error_is_logged_with_payload() {
    let (status, body, events) = send(get("/demo/error")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({ "error_code": 100, "detail": "this is a test error." })
    );

    let (level, line) = access_line(&events);
    assert_eq!(level, Level::ERROR);
    assert_eq!(line["u"], "/demo/error");
    assert_eq!(line["error_code"], 100);
    assert_eq!(line["detail"], "this is a test error.");
    assert_eq!(line["c"], 400);
    assert!(events[0]
        .message
        .contains(r#""b":"{}","error_code":100,"detail":"this is a test error.","c":400"#));
}

#[tokio::test]
async fn test_not_found_error() {
    let (status, body, events) = send(get("/demo/missing")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({ "error_code": 101, "detail": "user not found" })
    );
    let (_, line) = access_line(&events);
    assert_eq!(line["c"], 404);
}

#[tokio::test]
async fn test_request_body_is_logged() {
    let (status, body, events) = send(post_json("/demo/greet", r#"{ "name": "foo" }"#)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(serde_json::from_str::<Value>(&body).unwrap(), json!({ "message": "Hello foo." }));

    let (level, line) = access_line(&events);
    assert_eq!(level, Level::INFO);
    assert_eq!(line["m"], "POST");
    assert_eq!(line["b"], r#"{"name":"foo"}"#);
}

#[tokio::test]
async fn test_validation_error() {
    let (status, body, events) = send(post_json("/demo/greet", r#"{"name": " "}"#)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({ "error_code": 90, "detail": "name must not be empty" })
    );
    let (_, line) = access_line(&events);
    assert_eq!(line["error_code"], 90);
    assert_eq!(line["c"], 422);
}

#[tokio::test]
async fn test_malformed_body_is_request_validation_error() {
    let (status, body, events) = send(post_json("/demo/greet", "not json")).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let payload: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(payload["error_code"], 102);
    assert!(payload["detail"].as_str().unwrap().starts_with("Invalid body: "));

    let (level, line) = access_line(&events);
    assert_eq!(level, Level::ERROR);
    assert_eq!(line["b"], "{}");
    assert_eq!(line["error_code"], 102);
    assert_eq!(line["detail"], payload["detail"]);
}

#[tokio::test]
async fn test_internal_error_is_plain_text() {
    let (status, body, events) = send(get("/demo/broken")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Internal Server Error: database is down");

    let (level, line) = access_line(&events);
    assert_eq!(level, Level::ERROR);
    assert_eq!(line["c"], 500);
    assert_eq!(line["detail"], "database is down");
    assert!(line.get("error_code").is_none());
}

#[tokio::test]
async fn test_panic_is_answered_and_logged() {
    let (status, body, events) = send(get("/demo/panic")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, "Internal Server Error: handler panicked");

    let (_, line) = access_line(&events);
    assert_eq!(line["c"], 500);
    assert_eq!(line["detail"], "handler panicked");
}

#[tokio::test]
async fn test_unreadable_body_is_logged() {
    let body = Limited::new(Full::new(Bytes::from(r#"{"name": "foo"}"#)), 4);
    let mut request = Request::builder()
        .method(Method::POST)
        .uri("/demo/greet")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::new(body))
        .unwrap();
    request.extensions_mut().insert(ConnectInfo(client()));

    let (status, body, events) = send(request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.is_empty());

    let (level, line) = access_line(&events);
    assert_eq!(level, Level::ERROR);
    assert_eq!(line["u"], "/demo/greet");
    assert_eq!(line["m"], "POST");
    assert_eq!(line["c"], 500);
    assert!(line.get("error_code").is_none());
    assert!(line["detail"]
        .as_str()
        .unwrap()
        .contains("length limit exceeded"));
}

#[tokio::test]
async fn test_unknown_route_is_not_logged() {
    let (status, body, events) = send(get("/nowhere")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        serde_json::from_str::<Value>(&body).unwrap(),
        json!({ "error_code": 101, "detail": "Not Found" })
    );
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_client_address_is_optional() {
    let request = Request::builder()
        .uri("/demo/hello")
        .body(Body::empty())
        .unwrap();
    let (status, _, events) = send(request).await;

    assert_eq!(status, StatusCode::OK);
    let (_, line) = access_line(&events);
    assert_eq!(line["h"], Value::Null);
    assert_eq!(line["p"], Value::Null);
}

#[tokio::test]
async fn test_access_lines_routed_to_log_files() {
    let temp = TempDir::new().unwrap();
    let item = LoggerItem::builder(API_LOG_TARGET)
        .handlers([HandlerKind::File, HandlerKind::Error])
        .formatter("raw")
        .log_path(temp.path())
        .build();
    let config = LoggerConfig::new(vec![Formatter::new("raw", "%(message)s")], vec![item.clone()])
        .unwrap();

    let router = LogRouter::new();
    router.apply(&config).unwrap();

    {
        let subscriber = tracing_subscriber::registry().with(router.layer());
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = demo::router();
        for uri in ["/demo/hello", "/demo/error"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            response.into_body().collect().await.unwrap();
        }
    }

    let lines: Vec<Value> = std::fs::read_to_string(item.log_file().unwrap())
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["u"], "/demo/hello");
    assert_eq!(lines[0]["c"], 200);
    assert_eq!(lines[1]["u"], "/demo/error");
    assert_eq!(lines[1]["error_code"], 100);

    let errors = std::fs::read_to_string(item.error_file().unwrap()).unwrap();
    let errors: Vec<&str> = errors.lines().collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains(r#""u":"/demo/error""#));
}
