//! Database manager for SQLite storage.
//!
//! Tables are created per record type from [`Record::SCHEMA`]; every table
//! gets the base columns `id`, `created_at` and `updated_at`.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::Path;
use tracing::{debug, info};

use crate::record::Record;
use crate::session::Session;

/// SQLite database wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a database at the given path.
    ///
    /// If the database doesn't exist, it will be created.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create database directory: {:?}", parent))?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database at {:?}", path))?;

        conn.pragma_update(None, "foreign_keys", "ON")?;

        // WAL lets readers proceed while a session holds the write lock
        conn.pragma_update(None, "journal_mode", "WAL")?;

        debug!("Opened database at {:?}", path);

        Ok(Self { conn })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        debug!("Opened in-memory database");

        Ok(Self { conn })
    }

    /// Create the table of `R` if it does not exist.
    pub fn create_table<R: Record>(&self) -> Result<()> {
        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT,
                updated_at TEXT,
                {}
            )",
            R::TABLE,
            R::SCHEMA
        );
        self.conn
            .execute_batch(&sql)
            .with_context(|| format!("Failed to create table {}", R::TABLE))?;

        info!("Created table {}", R::TABLE);
        Ok(())
    }

    /// Drop the table of `R` if it exists.
    pub fn drop_table<R: Record>(&self) -> Result<()> {
        self.conn
            .execute_batch(&format!("DROP TABLE IF EXISTS {}", R::TABLE))
            .with_context(|| format!("Failed to drop table {}", R::TABLE))?;

        info!("Dropped table {}", R::TABLE);
        Ok(())
    }

    /// Get a reference to the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Start a session over this database's connection.
    pub fn session(&self) -> Session<'_> {
        Session::new(&self.conn)
    }
}
