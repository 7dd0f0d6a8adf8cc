//! # Mozi Core Library
//!
//! Shared building blocks for Mozi services.
//!
//! ## Modules
//!
//! - `env` - Application environment mode and settings
//! - `error` - Core error type
//! - `logging` - Declarative logging configuration and the tracing router
//! - `utils` - Short ids, directory handling, YAML config merging, timestamps
//!   and request signatures

pub mod env;
pub mod error;
pub mod logging;
pub mod utils;

// Re-export commonly used types
pub use env::{AppEnv, Settings};
pub use error::{CoreError, Result};
pub use logging::{
    Formatter, HandlerKind, LogLevel, LogRouter, LoggerConfig, LoggerItem, LoggerLoader,
    LoggerOverrides, RotateConfig,
};
pub use utils::{deep_update, ensure_dir, load_config, normalize_path, short_id};
