//! Process-wide logging installed by `LoggerLoader::load`
//!
//! Runs in its own test binary: the global subscriber can be set once per
//! process.

use std::path::{Path, PathBuf};

use mozi_core::{LogRouter, LoggerLoader};
use pretty_assertions::assert_eq;
use tempfile::TempDir;

fn write_config(dir: &Path, name: &str, level: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(
        &path,
        format!(
            r#"
logging:
  log_path: {logs}
  formatters:
    plain:
      format: "%(levelname)s %(message)s"
  loggers:
    billing:
      level: {level}
      handlers: [file]
      formatter: plain
"#,
            logs = dir.display(),
            level = level,
        ),
    )
    .unwrap();
    path
}

#[test]
fn test_load_installs_global_logging() {
    let temp = TempDir::new().unwrap();
    let log_file = temp.path().join("billing.log");

    let config = LoggerLoader::new(vec![write_config(temp.path(), "info.yml", "INFO")])
        .load()
        .unwrap();
    assert_eq!(config.loggers().len(), 1);
    assert!(LogRouter::is_global_installed());
    assert_eq!(LogRouter::global().logger_names(), vec!["billing"]);

    tracing::info!(target: "billing", "hello global");
    tracing::debug!(target: "billing", "too verbose");
    tracing::info!(target: "shipping", "not configured");

    assert_eq!(std::fs::read_to_string(&log_file).unwrap(), "INFO hello global\n");

    // Loading again replaces the active configuration
    LoggerLoader::new(vec![write_config(temp.path(), "debug.yml", "DEBUG")])
        .load()
        .unwrap();
    assert!(LogRouter::is_global_installed());

    tracing::debug!(target: "billing", "now visible");

    assert_eq!(
        std::fs::read_to_string(&log_file).unwrap(),
        "INFO hello global\nDEBUG now visible\n"
    );
}
