/// A field assignment or lookup that breaks the record's declaration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{record} has no `{field}` attribute.")]
    UnknownField { record: &'static str, field: String },

    #[error("{field} is immutable and cannot be modified")]
    Immutable { field: String },

    #[error("Invalid value for `{field}`: {detail}")]
    InvalidValue { field: String, detail: String },
}

/// Errors returned by CRUD operations.
///
/// SQLite errors are passed through unchanged after the transaction has been
/// rolled back.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error("Multiple records found for {record} with {filters}")]
    MultipleRecords { record: &'static str, filters: String },
}

pub type Result<T> = std::result::Result<T, StorageError>;
