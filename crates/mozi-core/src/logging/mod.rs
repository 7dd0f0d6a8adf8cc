//! Declarative Logging Configuration
//!
//! Builds a logging configuration dictionary from YAML files and drives the
//! process-wide `tracing` output from it:
//! - `LoggerItem` - one named logger and its handlers (console/file/rotate/error)
//! - `LoggerConfig` - formatters plus loggers, rendered as a config dictionary
//! - `LoggerLoader` - reads the `logging` section of merged config files
//! - `LogRouter` - holds the active configuration and routes tracing events

mod config;
mod formatter;
mod item;
mod level;
mod loader;
mod router;
mod writer;

pub use config::LoggerConfig;
pub use formatter::{Formatter, LogRecord, Pattern};
pub use item::{
    HandlerKind, HandlerSpec, LoggerEntry, LoggerItem, LoggerItemBuilder, LoggerOverrides,
    RotateConfig,
};
pub use level::LogLevel;
pub use loader::{LoggerLoader, LOGGING_KEY};
pub use router::{LogRouter, RouterLayer};
pub use writer::RotatingFileWriter;

/// Base directory for log files when none is configured.
pub const DEFAULT_LOG_DIR: &str = "/tmp/logs";

/// Default maximum size of a rotating log file (100MB).
pub const MAX_FILE_SIZE: u64 = 104_857_600;

/// Default number of rotated backups kept.
pub const DEFAULT_BACKUP_COUNT: u32 = 5;

/// Name of the formatter used when none is declared.
pub const DEFAULT_FORMATTER: &str = "default";

/// Format of the default formatter.
pub const DEFAULT_FORMAT: &str = "%(asctime)s - %(name)s - %(levelname)s - %(message)s";

/// Version marker of the configuration dictionary.
pub const CONFIG_VERSION: u32 = 1;
