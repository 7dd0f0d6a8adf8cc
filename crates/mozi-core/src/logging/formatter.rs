use chrono::{DateTime, Local};
use serde_json::{json, Value};

use super::{LogLevel, DEFAULT_FORMAT, DEFAULT_FORMATTER};

/// A named format string, e.g. `default` ->
/// `%(asctime)s - %(name)s - %(levelname)s - %(message)s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Formatter {
    pub name: String,
    pub format: String,
}

impl Formatter {
    pub fn new(name: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            format: format.into(),
        }
    }

    /// Entry of the `formatters` map: `{"format": ...}`.
    pub fn to_value(&self) -> Value {
        json!({ "format": self.format })
    }

    pub fn compile(&self) -> Pattern {
        Pattern::compile(&self.format)
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Self::new(DEFAULT_FORMATTER, DEFAULT_FORMAT)
    }
}

/// One log event, captured for formatting.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub time: DateTime<Local>,
    /// Logger name (event target with `::` replaced by `.`)
    pub name: String,
    pub level: LogLevel,
    pub message: String,
    pub module: Option<&'static str>,
    pub file: Option<&'static str>,
    pub line: Option<u32>,
    pub thread_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordField {
    AscTime,
    Name,
    LevelName,
    LevelNo,
    Message,
    Module,
    FileName,
    LineNo,
    Process,
    ThreadName,
}

impl RecordField {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "asctime" => Some(Self::AscTime),
            "name" => Some(Self::Name),
            "levelname" => Some(Self::LevelName),
            "levelno" => Some(Self::LevelNo),
            "message" => Some(Self::Message),
            "module" => Some(Self::Module),
            "filename" => Some(Self::FileName),
            "lineno" => Some(Self::LineNo),
            "process" => Some(Self::Process),
            "threadName" => Some(Self::ThreadName),
            _ => None,
        }
    }

    fn render(&self, record: &LogRecord) -> String {
        match self {
            Self::AscTime => record.time.format("%Y-%m-%d %H:%M:%S,%3f").to_string(),
            Self::Name => record.name.clone(),
            Self::LevelName => record.level.as_str().to_string(),
            Self::LevelNo => record.level.number().to_string(),
            Self::Message => record.message.clone(),
            Self::Module => record.module.unwrap_or_default().to_string(),
            Self::FileName => record
                .file
                .map(|f| {
                    std::path::Path::new(f)
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| f.to_string())
                })
                .unwrap_or_default(),
            Self::LineNo => record.line.map(|l| l.to_string()).unwrap_or_default(),
            Self::Process => std::process::id().to_string(),
            Self::ThreadName => record.thread_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field {
        field: RecordField,
        left_align: bool,
        width: Option<usize>,
    },
}

/// A compiled `%(name)s` style format string.
///
/// Supports an optional `-` flag and width (`%(levelname)-8s`). Unknown
/// placeholders are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    segments: Vec<Segment>,
}

impl Pattern {
    pub fn compile(format: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = format;

        while let Some(pos) = rest.find('%') {
            literal.push_str(&rest[..pos]);
            rest = &rest[pos..];

            if let Some(after) = rest.strip_prefix("%%") {
                literal.push('%');
                rest = after;
                continue;
            }

            match parse_placeholder(rest) {
                Some((segment, consumed)) => {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(segment);
                    rest = &rest[consumed..];
                }
                None => {
                    literal.push('%');
                    rest = &rest[1..];
                }
            }
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Self { segments }
    }

    pub fn render(&self, record: &LogRecord) -> String {
        let mut out = String::with_capacity(64 + record.message.len());
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field {
                    field,
                    left_align,
                    width,
                } => {
                    let value = field.render(record);
                    match (width, left_align) {
                        (Some(w), true) => out.push_str(&format!("{:<w$}", value, w = *w)),
                        (Some(w), false) => out.push_str(&format!("{:>w$}", value, w = *w)),
                        (None, _) => out.push_str(&value),
                    }
                }
            }
        }
        out
    }
}

/// Parse `%(name)[-][width]conv` at the start of `s`, returning the segment
/// and the number of bytes consumed.
fn parse_placeholder(s: &str) -> Option<(Segment, usize)> {
    let inner = s.strip_prefix("%(")?;
    let close = inner.find(')')?;
    let field = RecordField::from_name(&inner[..close])?;

    let mut spec = &inner[close + 1..];
    let left_align = spec.starts_with('-');
    if left_align {
        spec = &spec[1..];
    }

    let digits = spec.chars().take_while(|c| c.is_ascii_digit()).count();
    let width = if digits > 0 {
        spec[..digits].parse().ok()
    } else {
        None
    };
    spec = &spec[digits..];

    let conversion = spec
        .chars()
        .next()
        .filter(|c| matches!(c, 's' | 'd' | 'i' | 'r' | 'f'))?;

    let consumed = 2 + close + 1 + usize::from(left_align) + digits + conversion.len_utf8();
    Some((
        Segment::Field {
            field,
            left_align,
            width,
        },
        consumed,
    ))
}
