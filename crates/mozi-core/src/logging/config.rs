use serde_json::{json, Map, Value};

use super::{Formatter, HandlerSpec, LoggerItem, CONFIG_VERSION};
use crate::error::{CoreError, Result};

/// Formatters plus loggers, the input of [`LogRouter::apply`].
///
/// [`LogRouter::apply`]: super::LogRouter::apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfig {
    formatters: Vec<Formatter>,
    loggers: Vec<LoggerItem>,
}

impl LoggerConfig {
    /// Fails with [`CoreError::NoLoggers`] when `loggers` is empty. An empty
    /// formatter list becomes the default formatter.
    pub fn new(formatters: Vec<Formatter>, loggers: Vec<LoggerItem>) -> Result<Self> {
        if loggers.is_empty() {
            return Err(CoreError::NoLoggers);
        }

        let formatters = if formatters.is_empty() {
            vec![Formatter::default()]
        } else {
            formatters
        };

        Ok(Self {
            formatters,
            loggers,
        })
    }

    pub fn formatters(&self) -> &[Formatter] {
        &self.formatters
    }

    pub fn loggers(&self) -> &[LoggerItem] {
        &self.loggers
    }

    pub fn formatter(&self, name: &str) -> Option<&Formatter> {
        self.formatters.iter().find(|f| f.name == name)
    }

    /// Union of every logger's handlers, in logger order. The first
    /// occurrence of a key wins.
    pub fn handlers(&self) -> Result<Vec<(String, HandlerSpec)>> {
        let mut handlers: Vec<(String, HandlerSpec)> = Vec::new();
        for logger in &self.loggers {
            for (key, spec) in logger.handler_specs()? {
                if !handlers.iter().any(|(existing, _)| *existing == key) {
                    handlers.push((key, spec));
                }
            }
        }
        Ok(handlers)
    }

    /// The configuration dictionary:
    /// `{"version", "formatters", "handlers", "loggers"}`.
    pub fn to_value(&self) -> Result<Value> {
        let formatters: Map<String, Value> = self
            .formatters
            .iter()
            .map(|f| (f.name.clone(), f.to_value()))
            .collect();

        let handlers: Map<String, Value> = self
            .handlers()?
            .into_iter()
            .map(|(key, spec)| (key, spec.to_value()))
            .collect();

        let loggers: Map<String, Value> = self
            .loggers
            .iter()
            .map(|l| (l.name().to_string(), l.logger_entry().to_value()))
            .collect();

        Ok(json!({
            "version": CONFIG_VERSION,
            "formatters": formatters,
            "handlers": handlers,
            "loggers": loggers,
        }))
    }
}
