//! Record declaration: table, field registry and validated assignment.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::Row;

use crate::error::ValidationError;

/// Columns every record carries. Always immutable once set.
pub const BASE_FIELDS: [&str; 3] = ["id", "created_at", "updated_at"];

/// Surrogate key and timestamps shared by all records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BaseFields {
    pub id: Option<i64>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl BaseFields {
    /// Read `id`, `created_at` and `updated_at` by column name.
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            created_at: timestamp_column(row, "created_at")?,
            updated_at: timestamp_column(row, "updated_at")?,
        })
    }
}

/// A typed database record with an explicit field registry.
///
/// Implementors declare their own columns in [`Record::FIELDS`] and map them
/// in [`Record::column_value`] / [`Record::assign_column`]. All mutation
/// goes through [`Record::set`], which enforces immutability.
pub trait Record: Default + Sized {
    /// Name used in error messages.
    const NAME: &'static str;
    const TABLE: &'static str;
    /// Own columns, excluding [`BASE_FIELDS`].
    const FIELDS: &'static [&'static str];
    /// Own columns that can be set only while null.
    const IMMUTABLE_FIELDS: &'static [&'static str] = &[];
    /// Column definitions for the own fields, e.g. `name TEXT NOT NULL UNIQUE`.
    const SCHEMA: &'static str;

    fn base(&self) -> &BaseFields;

    fn base_mut(&mut self) -> &mut BaseFields;

    /// Value of an own column; `None` if `field` is not declared.
    fn column_value(&self, field: &str) -> Option<Value>;

    /// Store an own column. Called by [`Record::set`] after validation.
    fn assign_column(&mut self, field: &str, value: Value) -> Result<(), ValidationError>;

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Derive defaults before the record is written.
    fn before_upsert(&mut self) {}

    fn field_names() -> Vec<&'static str> {
        BASE_FIELDS.iter().chain(Self::FIELDS).copied().collect()
    }

    fn has_field(field: &str) -> bool {
        BASE_FIELDS.contains(&field) || Self::FIELDS.contains(&field)
    }

    fn is_immutable(field: &str) -> bool {
        BASE_FIELDS.contains(&field) || Self::IMMUTABLE_FIELDS.contains(&field)
    }

    fn id(&self) -> Option<i64> {
        self.base().id
    }

    fn value(&self, field: &str) -> Option<Value> {
        let base = self.base();
        match field {
            "id" => Some(base.id.map(Value::Integer).unwrap_or(Value::Null)),
            "created_at" => Some(timestamp_value(base.created_at.as_ref())),
            "updated_at" => Some(timestamp_value(base.updated_at.as_ref())),
            _ => self.column_value(field),
        }
    }

    /// Assign `field`, failing if it is undeclared or immutable and already
    /// set.
    fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<(), ValidationError> {
        if !Self::has_field(field) {
            return Err(ValidationError::UnknownField {
                record: Self::NAME,
                field: field.to_string(),
            });
        }

        if Self::is_immutable(field) && !matches!(self.value(field), None | Some(Value::Null)) {
            return Err(ValidationError::Immutable {
                field: field.to_string(),
            });
        }

        let value = value.into();
        match field {
            "id" => self.base_mut().id = integer(field, value)?,
            "created_at" => self.base_mut().created_at = timestamp(field, value)?,
            "updated_at" => self.base_mut().updated_at = timestamp(field, value)?,
            _ => self.assign_column(field, value)?,
        }
        Ok(())
    }
}

/// Timestamps are stored as RFC 3339 text with microseconds.
pub fn timestamp_to_sql(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse RFC 3339 or SQLite's `datetime('now')` format.
pub fn timestamp_from_sql(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.and_utc())
}

fn timestamp_value(ts: Option<&DateTime<Utc>>) -> Value {
    ts.map(|ts| Value::Text(timestamp_to_sql(ts)))
        .unwrap_or(Value::Null)
}

fn timestamp_column(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    raw.map(|s| {
        timestamp_from_sql(&s).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                Type::Text,
                format!("invalid timestamp `{}` in {}", s, column).into(),
            )
        })
    })
    .transpose()
}

fn invalid(field: &str, expected: &str, value: &Value) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        detail: format!("expected {}, got {:?}", expected, value.data_type()),
    }
}

/// Nullable text column.
pub fn text(field: &str, value: Value) -> Result<Option<String>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::Text(s) => Ok(Some(s)),
        other => Err(invalid(field, "text", &other)),
    }
}

/// Nullable integer column.
pub fn integer(field: &str, value: Value) -> Result<Option<i64>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(i)),
        other => Err(invalid(field, "integer", &other)),
    }
}

/// Non-null boolean column, stored as 0/1.
pub fn boolean(field: &str, value: Value) -> Result<bool, ValidationError> {
    match value {
        Value::Integer(i) => Ok(i != 0),
        other => Err(invalid(field, "boolean", &other)),
    }
}

/// Nullable timestamp column given as RFC 3339 text.
pub fn timestamp(field: &str, value: Value) -> Result<Option<DateTime<Utc>>, ValidationError> {
    match value {
        Value::Null => Ok(None),
        Value::Text(s) => timestamp_from_sql(&s)
            .map(Some)
            .ok_or_else(|| ValidationError::InvalidValue {
                field: field.to_string(),
                detail: format!("invalid timestamp `{}`", s),
            }),
        other => Err(invalid(field, "timestamp", &other)),
    }
}
