use std::path::PathBuf;

/// Errors raised by the core utilities and the logging configuration.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to read config file {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid config in {path}: {detail}")]
    InvalidConfig { path: PathBuf, detail: String },

    #[error("Param directory is empty.")]
    EmptyDirectory,

    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    #[error("Failed to create directory {path}: {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to resolve current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Timestamp out of range: {0}")]
    InvalidTimestamp(i64),

    #[error("Invalid datetime '{value}': {source}")]
    InvalidDatetime {
        value: String,
        #[source]
        source: chrono::ParseError,
    },

    #[error("No logger configuration found")]
    NoLoggers,

    #[error("No logging configuration found")]
    NoLoggingConfig,

    #[error("Invalid logger '{name}': {detail}")]
    InvalidLogger { name: String, detail: String },

    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    #[error("Unknown handler kind: {0}")]
    UnknownHandler(String),

    #[error("Failed to open log file {path}: {source}")]
    LogSink {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file appender in {path}: {source}")]
    LogAppender {
        path: PathBuf,
        #[source]
        source: tracing_appender::rolling::InitError,
    },
}

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
