//! Generic create/read/update/delete over [`Record`] types.

use rusqlite::types::Value;
use rusqlite::{params_from_iter, OptionalExtension};
use tracing::debug;

use crate::error::{Result, StorageError, ValidationError};
use crate::query::{check_field, Query};
use crate::record::Record;
use crate::session::Session;

/// CRUD operations, available on every [`Record`].
///
/// Mutations run inside the session's transaction and commit it. On failure
/// the transaction is rolled back and the error returned unchanged.
pub trait Crud: Record {
    /// Fail unless the record declares `field`.
    fn checkf(field: &str) -> std::result::Result<(), ValidationError> {
        check_field::<Self>(field)
    }

    /// Insert the record, or update it when its id already exists, then
    /// reload it so `self` reflects the stored row.
    ///
    /// Sets `created_at` when unset and refreshes `updated_at` from the
    /// session clock.
    fn upsert(&mut self, session: &mut Session<'_>) -> Result<()> {
        self.before_upsert();
        if self.base().created_at.is_none() {
            self.base_mut().created_at = Some(session.now());
        }
        self.base_mut().updated_at = Some(session.now());

        match write_row(self, session) {
            Ok(id) => {
                let stored = Self::get_by_id(session, id)?
                    .ok_or(StorageError::Sqlite(rusqlite::Error::QueryReturnedNoRows))?;
                *self = stored;
                Ok(())
            }
            Err(e) => {
                rollback(session);
                Err(e)
            }
        }
    }

    /// Assign each field through [`Record::set`], then upsert.
    fn update(&mut self, session: &mut Session<'_>, fields: &[(&str, Value)]) -> Result<()> {
        for (field, value) in fields {
            self.set(field, value.clone())?;
        }
        self.upsert(session)
    }

    /// Create a record from `fields` and upsert it.
    fn create(session: &mut Session<'_>, fields: &[(&str, Value)]) -> Result<Self> {
        let mut record = Self::default();
        record.update(session, fields)?;
        Ok(record)
    }

    /// Delete the stored row. A record without id is left alone.
    fn delete(self, session: &mut Session<'_>) -> Result<()> {
        let Some(id) = self.id() else {
            return Ok(());
        };

        let sql = format!("DELETE FROM {} WHERE id = ?1", Self::TABLE);
        let result = (|| -> Result<()> {
            session.begin()?;
            debug!(target: "mozi.sql", sql = %sql, id, "Executing statement");
            session.connection().execute(&sql, [id])?;
            session.commit()?;
            Ok(())
        })();

        if result.is_err() {
            rollback(session);
        }
        result
    }

    fn get_by_id(session: &Session<'_>, id: i64) -> Result<Option<Self>> {
        let sql = format!("{} WHERE id = ?1", select_sql::<Self>());
        debug!(target: "mozi.sql", sql = %sql, id, "Executing statement");
        let record = session
            .connection()
            .query_row(&sql, [id], |row| Self::from_row(row))
            .optional()?;
        Ok(record)
    }

    /// Look up by id holding the database write lock until the session
    /// commits or rolls back.
    ///
    /// Without an open transaction an IMMEDIATE one is started. Inside an
    /// open deferred transaction the lock is taken with a no-op write to the
    /// row, so other writers wait for the enclosing transaction to end.
    fn get_for_update(session: &mut Session<'_>, id: i64) -> Result<Option<Self>> {
        if !session.in_transaction() {
            session.begin_immediate()?;
        } else if !session.holds_write_lock() {
            let sql = format!("UPDATE {} SET id = id WHERE id = ?1", Self::TABLE);
            debug!(target: "mozi.sql", sql = %sql, id, "Executing statement");
            session.connection().execute(&sql, [id])?;
            session.mark_write_locked();
        }
        Self::get_by_id(session, id)
    }

    /// Records with the given ids, ordered by id. Empty input runs no query.
    fn gets_by_ids(session: &Session<'_>, ids: &[i64]) -> Result<Vec<Self>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!(
            "{} WHERE id IN ({}) ORDER BY id",
            select_sql::<Self>(),
            placeholders
        );
        query_records(session, &sql, ids.iter().map(|id| Value::Integer(*id)).collect())
    }

    /// The single record matching `query`, or `None`.
    fn get(session: &Session<'_>, query: &Query) -> Result<Option<Self>> {
        let (where_sql, params) = query.where_clause::<Self>()?;
        let sql = format!("{}{} LIMIT 2", select_sql::<Self>(), where_sql);
        let mut records = query_records(session, &sql, params)?;

        if records.len() > 1 {
            return Err(StorageError::MultipleRecords {
                record: Self::NAME,
                filters: query.describe(),
            });
        }
        Ok(records.pop())
    }

    fn count(session: &Session<'_>, query: &Query) -> Result<u64> {
        let (where_sql, params) = query.where_clause::<Self>()?;
        let sql = format!("SELECT COUNT(id) FROM {}{}", Self::TABLE, where_sql);
        debug!(target: "mozi.sql", sql = %sql, "Executing statement");

        let count: i64 = session
            .connection()
            .query_row(&sql, params_from_iter(params), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    /// Total matching rows, ignoring pagination, and the requested page.
    fn gets(session: &Session<'_>, query: &Query) -> Result<(u64, Vec<Self>)> {
        let total = Self::count(session, query)?;

        let (where_sql, mut params) = query.where_clause::<Self>()?;
        let order_sql = query.order_clause::<Self>()?;
        let sql = format!(
            "{}{}{} LIMIT ? OFFSET ?",
            select_sql::<Self>(),
            where_sql,
            order_sql
        );
        params.push(Value::Integer(clamp(query.page_size())));
        params.push(Value::Integer(clamp(query.offset())));

        Ok((total, query_records(session, &sql, params)?))
    }
}

impl<R: Record> Crud for R {}

fn select_sql<R: Record>() -> String {
    format!("SELECT {} FROM {}", R::field_names().join(", "), R::TABLE)
}

fn query_records<R: Record>(session: &Session<'_>, sql: &str, params: Vec<Value>) -> Result<Vec<R>> {
    debug!(target: "mozi.sql", sql = %sql, "Executing statement");
    let mut stmt = session.connection().prepare(sql)?;
    let records = stmt
        .query_map(params_from_iter(params), |row| R::from_row(row))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// `INSERT ... ON CONFLICT(id) DO UPDATE` inside the session transaction.
/// Returns the row id.
fn write_row<R: Record>(record: &R, session: &mut Session<'_>) -> Result<i64> {
    let columns = R::field_names();
    let values: Vec<Value> = columns
        .iter()
        .map(|field| record.value(field).unwrap_or(Value::Null))
        .collect();

    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let assignments: Vec<String> = columns
        .iter()
        .filter(|field| !matches!(**field, "id" | "created_at"))
        .map(|field| format!("{} = excluded.{}", field, field))
        .collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({}) ON CONFLICT(id) DO UPDATE SET {}",
        R::TABLE,
        columns.join(", "),
        placeholders.join(", "),
        assignments.join(", ")
    );

    session.begin()?;
    debug!(
        target: "mozi.sql",
        sql = %sql,
        updated_at = ?record.base().updated_at,
        "Executing statement"
    );
    let conn = session.connection();
    conn.execute(&sql, params_from_iter(values))?;
    let id = record.id().unwrap_or_else(|| conn.last_insert_rowid());
    session.commit()?;
    Ok(id)
}

fn rollback(session: &mut Session<'_>) {
    if let Err(e) = session.rollback() {
        tracing::warn!("Rollback failed: {}", e);
    }
}

fn clamp(n: u64) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
