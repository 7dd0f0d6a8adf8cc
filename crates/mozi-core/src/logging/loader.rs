use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use tracing::{info, warn};

use super::{Formatter, LogRouter, LoggerConfig, LoggerItem, LoggerOverrides};
use crate::error::{CoreError, Result};
use crate::utils::load_config;

/// Top-level key holding the logging section in config files.
pub const LOGGING_KEY: &str = "logging";

#[derive(Debug, Default, Deserialize)]
struct LoggingSection {
    log_path: Option<PathBuf>,
    formatters: Option<Mapping>,
    loggers: Option<Mapping>,
}

#[derive(Debug, Deserialize)]
struct FormatterEntry {
    format: String,
}

/// Builds a [`LoggerConfig`] from the `logging` section of config files.
///
/// ```yaml
/// logging:
///   log_path: data/logs
///   formatters:
///     simple:
///       format: "%(message)s"
///   loggers:
///     app:
///       level: DEBUG
///       handlers: [console, rotate, error]
///     worker:
/// ```
#[derive(Debug, Clone, Default)]
pub struct LoggerLoader {
    files: Vec<PathBuf>,
    log_path: Option<PathBuf>,
}

impl LoggerLoader {
    pub fn new(files: Vec<PathBuf>) -> Self {
        Self {
            files,
            log_path: None,
        }
    }

    /// Fallback log directory for loggers and sections that set none.
    pub fn with_log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(log_path.into());
        self
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Merge the files and build the logger configuration.
    pub fn build(&self) -> Result<LoggerConfig> {
        let section = load_config(&self.files, Some(LOGGING_KEY))?;
        let source = self.files.last().cloned().unwrap_or_default();

        let section: LoggingSection = serde_yaml::from_value(Value::Mapping(section))
            .map_err(|e| CoreError::InvalidConfig {
                path: source.clone(),
                detail: format!("`{}` section: {}", LOGGING_KEY, e),
            })?;

        let loggers = match section.loggers {
            Some(loggers) if !loggers.is_empty() => loggers,
            _ => return Err(CoreError::NoLoggingConfig),
        };

        let formatters = match section.formatters {
            Some(formatters) => parse_formatters(formatters, &source)?,
            None => Vec::new(),
        };

        let fallback = section.log_path.as_deref().or(self.log_path.as_deref());
        let items = loggers
            .into_iter()
            .map(|(name, value)| parse_logger(name, value, fallback, &source))
            .collect::<Result<Vec<_>>>()?;

        LoggerConfig::new(formatters, items)
    }

    /// Build the configuration, apply it to the global router and install
    /// the router as the global subscriber if nothing else is installed.
    ///
    /// When a different global subscriber is already installed the
    /// configuration is applied but receives no events; a warning is sent
    /// to that subscriber.
    pub fn load(&self) -> Result<LoggerConfig> {
        let config = self.build()?;
        LogRouter::global().apply(&config)?;
        if LogRouter::install_global() {
            info!(loggers = config.loggers().len(), "Logging router installed");
        } else if !LogRouter::is_global_installed() {
            warn!(
                loggers = config.loggers().len(),
                "Another global subscriber is installed; logging configuration is inactive"
            );
        }
        Ok(config)
    }
}

fn parse_formatters(formatters: Mapping, source: &Path) -> Result<Vec<Formatter>> {
    formatters
        .into_iter()
        .map(|(name, value)| {
            let name = key_name(name, source)?;
            let entry: FormatterEntry =
                serde_yaml::from_value(value).map_err(|e| CoreError::InvalidConfig {
                    path: source.to_path_buf(),
                    detail: format!("formatter `{}`: {}", name, e),
                })?;
            Ok(Formatter::new(name, entry.format))
        })
        .collect()
}

fn parse_logger(
    name: Value,
    value: Value,
    fallback_log_path: Option<&Path>,
    source: &Path,
) -> Result<LoggerItem> {
    let name = key_name(name, source)?;
    let overrides: Option<LoggerOverrides> =
        serde_yaml::from_value(value).map_err(|e| CoreError::InvalidLogger {
            name: name.clone(),
            detail: e.to_string(),
        })?;

    Ok(LoggerItem::load(name, overrides.as_ref(), fallback_log_path))
}

fn key_name(key: Value, source: &Path) -> Result<String> {
    match key {
        Value::String(name) => Ok(name),
        other => Err(CoreError::InvalidConfig {
            path: source.to_path_buf(),
            detail: format!("expected a string name, found {:?}", other),
        }),
    }
}
