use rusqlite::types::Value;

use crate::error::ValidationError;
use crate::record::Record;

/// Default page size of [`Crud::gets`](crate::Crud::gets).
pub const DEFAULT_LIMIT: u64 = 20;

/// Comparison operator of a [`Condition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Op {
    fn as_sql(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

/// `field op value`, checked against the record's fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: String,
    pub op: Op,
    pub value: Value,
}

/// Filters, ordering and pagination for `count`, `get` and `gets`.
///
/// Equality filters on undeclared fields are ignored; conditions and the
/// order key must name declared fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    filters: Vec<(String, Value)>,
    conditions: Vec<Condition>,
    order_by: Option<String>,
    start: u64,
    limit: u64,
}

impl Default for Query {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            conditions: Vec::new(),
            order_by: None,
            start: 0,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equality filter. `NULL` matches with `IS NULL`.
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    pub fn condition(mut self, field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    /// Order by `field`, or by `field` descending with a leading `-`.
    pub fn order_by(mut self, key: impl Into<String>) -> Self {
        self.order_by = Some(key.into());
        self
    }

    pub fn start(mut self, start: u64) -> Self {
        self.start = start;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(&self) -> u64 {
        self.start
    }

    pub fn page_size(&self) -> u64 {
        self.limit
    }

    /// Human readable filters, used in error messages.
    pub fn describe(&self) -> String {
        let mut parts: Vec<String> = self
            .filters
            .iter()
            .map(|(field, value)| format!("{}={}", field, display_value(value)))
            .collect();
        parts.extend(self.conditions.iter().map(|c| {
            format!("{} {} {}", c.field, c.op.as_sql(), display_value(&c.value))
        }));
        format!("{{{}}}", parts.join(", "))
    }

    /// `WHERE ...` clause (empty when unfiltered) and its parameters.
    pub(crate) fn where_clause<R: Record>(&self) -> Result<(String, Vec<Value>), ValidationError> {
        let mut clauses = Vec::new();
        let mut params = Vec::new();

        for (field, value) in &self.filters {
            if !R::has_field(field) {
                continue;
            }
            if *value == Value::Null {
                clauses.push(format!("{} IS NULL", field));
            } else {
                clauses.push(format!("{} = ?", field));
                params.push(value.clone());
            }
        }

        for condition in &self.conditions {
            check_field::<R>(&condition.field)?;
            match (condition.op, &condition.value) {
                (Op::Eq, Value::Null) => clauses.push(format!("{} IS NULL", condition.field)),
                (Op::Ne, Value::Null) => clauses.push(format!("{} IS NOT NULL", condition.field)),
                (op, value) => {
                    clauses.push(format!("{} {} ?", condition.field, op.as_sql()));
                    params.push(value.clone());
                }
            }
        }

        if clauses.is_empty() {
            Ok((String::new(), params))
        } else {
            Ok((format!(" WHERE {}", clauses.join(" AND ")), params))
        }
    }

    /// `ORDER BY ...` clause, empty without an order key.
    pub(crate) fn order_clause<R: Record>(&self) -> Result<String, ValidationError> {
        let Some(key) = self.order_by.as_deref() else {
            return Ok(String::new());
        };
        let (field, direction) = match key.strip_prefix('-') {
            Some(field) => (field, "DESC"),
            None => (key, "ASC"),
        };
        check_field::<R>(field)?;
        Ok(format!(" ORDER BY {} {}", field, direction))
    }
}

pub(crate) fn check_field<R: Record>(field: &str) -> Result<(), ValidationError> {
    if R::has_field(field) {
        Ok(())
    } else {
        Err(ValidationError::UnknownField {
            record: R::NAME,
            field: field.to_string(),
        })
    }
}

fn display_value(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Real(f) => f.to_string(),
        Value::Text(s) => format!("'{}'", s),
        Value::Blob(b) => format!("<{} bytes>", b.len()),
    }
}
