use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{json, Value};

use super::{LogLevel, DEFAULT_BACKUP_COUNT, DEFAULT_FORMATTER, DEFAULT_LOG_DIR, MAX_FILE_SIZE};
use crate::error::{CoreError, Result};
use crate::utils::{absolute_path, ensure_dir, short_id};

/// Length of the id used to namespace handler keys.
const LOGGER_ID_LEN: usize = 10;

/// Output attached to a logger.
///
/// Declaration order is the iteration order of handler maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerKind {
    /// Standard output
    Console,
    /// Plain append-only file
    File,
    /// Size-rotated file
    Rotate,
    /// Size-rotated file receiving ERROR and above
    Error,
}

impl HandlerKind {
    pub const ALL: [HandlerKind; 4] = [Self::Console, Self::File, Self::Rotate, Self::Error];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Console => "console",
            Self::File => "file",
            Self::Rotate => "rotate",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == s)
    }

    /// Whether `s` names a handler kind.
    pub fn contains(s: &str) -> bool {
        Self::parse(s).is_some()
    }
}

impl std::fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HandlerKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| CoreError::UnknownHandler(s.to_string()))
    }
}

/// Size-based rotation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RotateConfig {
    pub max_bytes: u64,
    pub backup_count: u32,
}

impl Default for RotateConfig {
    fn default() -> Self {
        Self {
            max_bytes: MAX_FILE_SIZE,
            backup_count: DEFAULT_BACKUP_COUNT,
        }
    }
}

/// A handler entry of the configuration dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerSpec {
    Stream {
        level: LogLevel,
        formatter: String,
    },
    File {
        level: LogLevel,
        formatter: String,
        filename: PathBuf,
    },
    RotatingFile {
        level: LogLevel,
        formatter: String,
        filename: PathBuf,
        max_bytes: u64,
        backup_count: u32,
    },
}

impl HandlerSpec {
    pub fn class(&self) -> &'static str {
        match self {
            Self::Stream { .. } => "StreamHandler",
            Self::File { .. } => "FileHandler",
            Self::RotatingFile { .. } => "RotatingFileHandler",
        }
    }

    pub fn level(&self) -> LogLevel {
        match self {
            Self::Stream { level, .. } | Self::File { level, .. } | Self::RotatingFile { level, .. } => {
                *level
            }
        }
    }

    pub fn formatter(&self) -> &str {
        match self {
            Self::Stream { formatter, .. }
            | Self::File { formatter, .. }
            | Self::RotatingFile { formatter, .. } => formatter,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Stream { level, formatter } => json!({
                "class": self.class(),
                "level": level.as_str(),
                "formatter": formatter,
                "stream": "stdout",
            }),
            Self::File {
                level,
                formatter,
                filename,
            } => json!({
                "class": self.class(),
                "level": level.as_str(),
                "formatter": formatter,
                "filename": filename.to_string_lossy(),
            }),
            Self::RotatingFile {
                level,
                formatter,
                filename,
                max_bytes,
                backup_count,
            } => json!({
                "class": self.class(),
                "level": level.as_str(),
                "formatter": formatter,
                "filename": filename.to_string_lossy(),
                "maxBytes": max_bytes,
                "backupCount": backup_count,
            }),
        }
    }
}

/// A logger entry of the configuration dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerEntry {
    pub level: LogLevel,
    pub handlers: Vec<String>,
    pub propagate: bool,
}

impl LoggerEntry {
    pub fn to_value(&self) -> Value {
        json!({
            "level": self.level.as_str(),
            "handlers": self.handlers,
            "propagate": self.propagate,
        })
    }
}

/// Per-logger overrides as written in the config files.
///
/// Every field is optional; absent fields keep the [`LoggerItem`] defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggerOverrides {
    pub level: Option<LogLevel>,
    pub handlers: Option<Vec<HandlerKind>>,
    pub propagate: Option<bool>,
    pub formatter: Option<String>,
    pub log_path: Option<PathBuf>,
    #[serde(alias = "rotate_cnf")]
    pub rotate: Option<RotateConfig>,
}

/// One named logger and the handlers derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerItem {
    name: String,
    level: LogLevel,
    handlers: BTreeSet<HandlerKind>,
    propagate: bool,
    formatter: String,
    log_path: PathBuf,
    rotate: RotateConfig,
    id: String,
}

impl LoggerItem {
    /// A logger with default settings: INFO, console only, no propagation.
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder(name).build()
    }

    pub fn builder(name: impl Into<String>) -> LoggerItemBuilder {
        LoggerItemBuilder::new(name)
    }

    /// Build an item from config overrides.
    ///
    /// A `log_path` in the overrides wins over `fallback_log_path`, which
    /// wins over [`DEFAULT_LOG_DIR`].
    pub fn load(
        name: impl Into<String>,
        overrides: Option<&LoggerOverrides>,
        fallback_log_path: Option<&Path>,
    ) -> Self {
        let mut builder = Self::builder(name);
        let defaults = LoggerOverrides::default();
        let overrides = overrides.unwrap_or(&defaults);

        if let Some(level) = overrides.level {
            builder = builder.level(level);
        }
        if let Some(handlers) = &overrides.handlers {
            builder = builder.handlers(handlers.iter().copied());
        }
        if let Some(propagate) = overrides.propagate {
            builder = builder.propagate(propagate);
        }
        if let Some(formatter) = &overrides.formatter {
            builder = builder.formatter(formatter.clone());
        }
        if let Some(rotate) = overrides.rotate {
            builder = builder.rotate(rotate);
        }
        if let Some(log_path) = overrides.log_path.as_deref().or(fallback_log_path) {
            builder = builder.log_path(log_path);
        }

        builder.build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Handler kinds, in declaration order.
    pub fn handlers(&self) -> &BTreeSet<HandlerKind> {
        &self.handlers
    }

    pub fn propagate(&self) -> bool {
        self.propagate
    }

    pub fn formatter(&self) -> &str {
        &self.formatter
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    pub fn rotate(&self) -> RotateConfig {
        self.rotate
    }

    /// Stable id derived from the logger name.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Key of a handler in the configuration dictionary: `{kind}-{id}`.
    pub fn handler_key(&self, kind: HandlerKind) -> String {
        format!("{}-{}", kind.as_str(), self.id)
    }

    /// Absolute log file path: dots in the name become directories.
    ///
    /// Creates the containing directory.
    pub fn log_file(&self) -> Result<PathBuf> {
        let mut path = self.log_path.clone();
        let parts: Vec<&str> = self.name.split('.').collect();
        if let Some((last, dirs)) = parts.split_last() {
            for dir in dirs {
                path.push(dir);
            }
            path.push(format!("{}.log", last));
        }

        let path = absolute_path(&path)?;
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        Ok(path)
    }

    /// The log file with `.log` replaced by `_error.log`.
    pub fn error_file(&self) -> Result<PathBuf> {
        let log_file = self.log_file()?;
        let file_name = log_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let stem = file_name.strip_suffix(".log").unwrap_or(&file_name);
        Ok(log_file.with_file_name(format!("{}_error.log", stem)))
    }

    /// Handler specification for one kind.
    pub fn handler_spec(&self, kind: HandlerKind) -> Result<HandlerSpec> {
        let spec = match kind {
            HandlerKind::Console => HandlerSpec::Stream {
                level: LogLevel::Info,
                formatter: self.formatter.clone(),
            },
            HandlerKind::File => HandlerSpec::File {
                level: self.level,
                formatter: self.formatter.clone(),
                filename: self.log_file()?,
            },
            HandlerKind::Rotate => HandlerSpec::RotatingFile {
                level: self.level,
                formatter: self.formatter.clone(),
                filename: self.log_file()?,
                max_bytes: self.rotate.max_bytes,
                backup_count: self.rotate.backup_count,
            },
            HandlerKind::Error => HandlerSpec::RotatingFile {
                level: LogLevel::Error,
                formatter: self.formatter.clone(),
                filename: self.error_file()?,
                max_bytes: self.rotate.max_bytes,
                backup_count: self.rotate.backup_count,
            },
        };
        Ok(spec)
    }

    /// All handler specifications keyed by `{kind}-{id}`, in kind order.
    pub fn handler_specs(&self) -> Result<Vec<(String, HandlerSpec)>> {
        self.handlers
            .iter()
            .map(|kind| Ok((self.handler_key(*kind), self.handler_spec(*kind)?)))
            .collect()
    }

    pub fn logger_entry(&self) -> LoggerEntry {
        LoggerEntry {
            level: self.level,
            handlers: self
                .handlers
                .iter()
                .map(|kind| self.handler_key(*kind))
                .collect(),
            propagate: self.propagate,
        }
    }
}

/// Builder for [`LoggerItem`].
#[derive(Debug, Clone)]
pub struct LoggerItemBuilder {
    name: String,
    level: LogLevel,
    handlers: BTreeSet<HandlerKind>,
    propagate: bool,
    formatter: String,
    log_path: PathBuf,
    rotate: RotateConfig,
}

impl LoggerItemBuilder {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            level: LogLevel::default(),
            handlers: BTreeSet::new(),
            propagate: false,
            formatter: DEFAULT_FORMATTER.to_string(),
            log_path: PathBuf::from(DEFAULT_LOG_DIR),
            rotate: RotateConfig::default(),
        }
    }

    pub fn level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    pub fn handler(mut self, kind: HandlerKind) -> Self {
        self.handlers.insert(kind);
        self
    }

    pub fn handlers(mut self, kinds: impl IntoIterator<Item = HandlerKind>) -> Self {
        self.handlers.extend(kinds);
        self
    }

    pub fn propagate(mut self, propagate: bool) -> Self {
        self.propagate = propagate;
        self
    }

    pub fn formatter(mut self, formatter: impl Into<String>) -> Self {
        self.formatter = formatter.into();
        self
    }

    pub fn log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = log_path.into();
        self
    }

    pub fn rotate(mut self, rotate: RotateConfig) -> Self {
        self.rotate = rotate;
        self
    }

    pub fn build(self) -> LoggerItem {
        let mut handlers = self.handlers;
        if handlers.is_empty() {
            handlers.insert(HandlerKind::Console);
        }

        LoggerItem {
            id: short_id(&self.name, LOGGER_ID_LEN),
            name: self.name,
            level: self.level,
            handlers,
            propagate: self.propagate,
            formatter: self.formatter,
            log_path: self.log_path,
            rotate: self.rotate,
        }
    }
}
