//! Routes tracing events to the handlers of the active [`LoggerConfig`].

use std::collections::HashMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use chrono::Local;
use parking_lot::{Mutex, RwLock};
use tracing::field::{Field, Visit};
use tracing::{info, Event, Subscriber};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use super::{HandlerSpec, LogLevel, LogRecord, LoggerConfig, Pattern, RotatingFileWriter};
use crate::error::{CoreError, Result};

static GLOBAL_INSTALLED: AtomicBool = AtomicBool::new(false);

/// Holder of the active logging configuration.
///
/// Cloning shares the same configuration. [`LogRouter::apply`] swaps the
/// whole configuration; layers created earlier see the new one.
#[derive(Debug, Clone, Default)]
pub struct LogRouter {
    active: Arc<RwLock<Option<Arc<ActiveLogging>>>>,
}

impl LogRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide router used by [`LoggerLoader::load`].
    ///
    /// [`LoggerLoader::load`]: super::LoggerLoader::load
    pub fn global() -> &'static LogRouter {
        static GLOBAL: OnceLock<LogRouter> = OnceLock::new();
        GLOBAL.get_or_init(LogRouter::new)
    }

    /// Install a registry with the global router layer as the global default
    /// subscriber. Returns false if a global subscriber already exists.
    pub fn install_global() -> bool {
        let installed = tracing_subscriber::registry()
            .with(Self::global().layer())
            .try_init()
            .is_ok();
        if installed {
            GLOBAL_INSTALLED.store(true, Ordering::Release);
        }
        installed
    }

    /// Whether the global router layer is the global default subscriber.
    pub fn is_global_installed() -> bool {
        GLOBAL_INSTALLED.load(Ordering::Acquire)
    }

    /// Open every handler sink of `config` and make it the active
    /// configuration. On error the previous configuration stays active.
    pub fn apply(&self, config: &LoggerConfig) -> Result<()> {
        let active = ActiveLogging::build(config)?;
        let loggers = active.loggers.len();
        let handlers = active.sinks.len();

        *self.active.write() = Some(Arc::new(active));

        info!(target: "mozi.logging", loggers, handlers, "Logging configuration applied");
        Ok(())
    }

    /// Drop the active configuration; events are discarded afterwards.
    pub fn clear(&self) {
        *self.active.write() = None;
    }

    pub fn is_active(&self) -> bool {
        self.active.read().is_some()
    }

    /// Names of the configured loggers, in configuration order.
    pub fn logger_names(&self) -> Vec<String> {
        self.active
            .read()
            .as_ref()
            .map(|a| a.loggers.iter().map(|l| l.name.clone()).collect())
            .unwrap_or_default()
    }

    pub fn layer(&self) -> RouterLayer {
        RouterLayer {
            router: self.clone(),
        }
    }

    fn snapshot(&self) -> Option<Arc<ActiveLogging>> {
        self.active.read().clone()
    }
}

/// `tracing_subscriber` layer writing events through a [`LogRouter`].
#[derive(Debug, Clone)]
pub struct RouterLayer {
    router: LogRouter,
}

impl<S: Subscriber> Layer<S> for RouterLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let Some(active) = self.router.snapshot() else {
            return;
        };

        let metadata = event.metadata();
        let name = metadata.target().replace("::", ".");
        let Some(first) = active.resolve(&name) else {
            return;
        };
        if !active.loggers[first].level.admits(metadata.level()) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let record = LogRecord {
            time: Local::now(),
            name,
            level: LogLevel::from_tracing(metadata.level()),
            message: visitor.finish(),
            module: metadata.module_path(),
            file: metadata.file(),
            line: metadata.line(),
            thread_name: std::thread::current()
                .name()
                .unwrap_or("unnamed")
                .to_string(),
        };

        let mut current = Some(first);
        while let Some(index) = current {
            let logger = &active.loggers[index];
            for handler in &logger.handlers {
                let sink = &active.sinks[*handler];
                if sink.level.admits(metadata.level()) {
                    sink.emit(&record);
                }
            }
            current = if logger.propagate { logger.parent } else { None };
        }
    }
}

#[derive(Debug)]
struct ActiveLogging {
    loggers: Vec<RoutedLogger>,
    sinks: Vec<HandlerSink>,
}

#[derive(Debug)]
struct RoutedLogger {
    name: String,
    level: LogLevel,
    handlers: Vec<usize>,
    propagate: bool,
    parent: Option<usize>,
}

impl ActiveLogging {
    fn build(config: &LoggerConfig) -> Result<Self> {
        let patterns: HashMap<&str, Pattern> = config
            .formatters()
            .iter()
            .map(|f| (f.name.as_str(), f.compile()))
            .collect();

        let mut sinks: Vec<HandlerSink> = Vec::new();
        let mut sink_index: HashMap<String, usize> = HashMap::new();
        let mut loggers = Vec::with_capacity(config.loggers().len());

        for item in config.loggers() {
            let mut handlers = Vec::new();
            for (key, spec) in item.handler_specs()? {
                if let Some(index) = sink_index.get(&key) {
                    handlers.push(*index);
                    continue;
                }

                let pattern = patterns.get(spec.formatter()).cloned().ok_or_else(|| {
                    CoreError::InvalidLogger {
                        name: item.name().to_string(),
                        detail: format!("unknown formatter `{}`", spec.formatter()),
                    }
                })?;

                sinks.push(HandlerSink::open(&spec, pattern)?);
                sink_index.insert(key, sinks.len() - 1);
                handlers.push(sinks.len() - 1);
            }

            loggers.push(RoutedLogger {
                name: item.name().to_string(),
                level: item.level(),
                handlers,
                propagate: item.propagate(),
                parent: None,
            });
        }

        let parents: Vec<Option<usize>> = loggers
            .iter()
            .map(|logger| closest_ancestor(&loggers, &logger.name))
            .collect();
        for (logger, parent) in loggers.iter_mut().zip(parents) {
            logger.parent = parent;
        }

        Ok(Self { loggers, sinks })
    }

    /// Most specific logger whose name equals `name` or is a dotted prefix
    /// of it.
    fn resolve(&self, name: &str) -> Option<usize> {
        self.loggers
            .iter()
            .enumerate()
            .filter(|(_, logger)| is_same_or_descendant(name, &logger.name))
            .max_by_key(|(_, logger)| logger.name.len())
            .map(|(index, _)| index)
    }
}

fn closest_ancestor(loggers: &[RoutedLogger], name: &str) -> Option<usize> {
    loggers
        .iter()
        .enumerate()
        .filter(|(_, logger)| logger.name != name && is_same_or_descendant(name, &logger.name))
        .max_by_key(|(_, logger)| logger.name.len())
        .map(|(index, _)| index)
}

fn is_same_or_descendant(name: &str, ancestor: &str) -> bool {
    match name.strip_prefix(ancestor) {
        Some("") => true,
        Some(rest) => rest.starts_with('.'),
        None => false,
    }
}

#[derive(Debug)]
struct HandlerSink {
    level: LogLevel,
    pattern: Pattern,
    target: SinkTarget,
}

#[derive(Debug)]
enum SinkTarget {
    Stdout,
    File(RollingFileAppender),
    Rotating(Mutex<RotatingFileWriter>),
}

impl HandlerSink {
    fn open(spec: &HandlerSpec, pattern: Pattern) -> Result<Self> {
        let target = match spec {
            HandlerSpec::Stream { .. } => SinkTarget::Stdout,
            HandlerSpec::File { filename, .. } => SinkTarget::File(open_file_appender(filename)?),
            HandlerSpec::RotatingFile {
                filename,
                max_bytes,
                backup_count,
                ..
            } => {
                let writer = RotatingFileWriter::open(filename, *max_bytes, *backup_count)
                    .map_err(|source| CoreError::LogSink {
                        path: filename.clone(),
                        source,
                    })?;
                SinkTarget::Rotating(Mutex::new(writer))
            }
        };

        Ok(Self {
            level: spec.level(),
            pattern,
            target,
        })
    }

    fn emit(&self, record: &LogRecord) {
        let mut line = self.pattern.render(record);
        line.push('\n');

        let result = match &self.target {
            SinkTarget::Stdout => std::io::stdout().lock().write_all(line.as_bytes()),
            SinkTarget::File(appender) => appender.make_writer().write_all(line.as_bytes()),
            SinkTarget::Rotating(writer) => writer.lock().write_record(line.as_bytes()),
        };

        if let Err(e) = result {
            eprintln!("Failed to write log record for {}: {}", record.name, e);
        }
    }
}

/// Plain append-only file appender writing to exactly `filename`.
fn open_file_appender(filename: &Path) -> Result<RollingFileAppender> {
    let directory = filename.parent().unwrap_or_else(|| Path::new("."));
    let file_name = filename
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = file_name.strip_suffix(".log").unwrap_or(&file_name);

    RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(directory)
        .map_err(|source| CoreError::LogAppender {
            path: filename.to_path_buf(),
            source,
        })
}

/// Collects the `message` field and appends other fields as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(mut self) -> String {
        self.message.push_str(&self.fields);
        self.message
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
