//! `LoggerLoader::load` when another global subscriber owns the process
//!
//! Runs in its own test binary: the global subscriber can be set once per
//! process.

use mozi_core::{LogRouter, LoggerLoader};
use tempfile::TempDir;
use tests::logs::LogCapture;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[test]
fn test_load_warns_when_subscriber_exists() {
    let capture = LogCapture::new();
    tracing_subscriber::registry().with(capture.layer()).init();

    let temp = TempDir::new().unwrap();
    let file = temp.path().join("logging.yml");
    std::fs::write(
        &file,
        format!(
            "logging:\n  log_path: {}\n  loggers:\n    billing:\n      handlers: [file]\n",
            temp.path().display()
        ),
    )
    .unwrap();

    LoggerLoader::new(vec![file]).load().unwrap();
    assert!(LogRouter::global().is_active());
    assert!(!LogRouter::is_global_installed());

    let warned = capture.events().iter().any(|e| {
        e.level == Level::WARN && e.message.contains("Another global subscriber is installed")
    });
    assert!(warned, "expected a warning, got {:?}", capture.events());

    tracing::info!(target: "billing", "goes to the existing subscriber");

    let routed = std::fs::read_to_string(temp.path().join("billing.log")).unwrap_or_default();
    assert_eq!(routed, "");
    assert!(capture
        .for_target("billing")
        .iter()
        .any(|e| e.message == "goes to the existing subscriber"));
}
