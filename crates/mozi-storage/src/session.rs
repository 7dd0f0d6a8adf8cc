use chrono::{DateTime, Utc};
use rusqlite::Connection;
use tracing::{debug, warn};

/// Source of the timestamps written by `upsert`.
pub type Clock<'c> = Box<dyn FnMut() -> DateTime<Utc> + 'c>;

/// A unit of work over a borrowed connection.
///
/// Tracks whether a transaction is open. Mutations begin one on demand and
/// commit it; an open transaction is rolled back when the session is dropped.
pub struct Session<'c> {
    conn: &'c Connection,
    in_transaction: bool,
    write_locked: bool,
    clock: Clock<'c>,
}

impl<'c> Session<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            in_transaction: false,
            write_locked: false,
            clock: Box::new(Utc::now),
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: impl FnMut() -> DateTime<Utc> + 'c) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn connection(&self) -> &'c Connection {
        self.conn
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    /// Whether the open transaction holds the database write lock.
    pub fn holds_write_lock(&self) -> bool {
        self.in_transaction && self.write_locked
    }

    /// Record that a statement of the open transaction took the write lock.
    pub(crate) fn mark_write_locked(&mut self) {
        if self.in_transaction {
            self.write_locked = true;
        }
    }

    pub fn now(&mut self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Begin a deferred transaction unless one is open.
    pub fn begin(&mut self) -> rusqlite::Result<()> {
        self.start("BEGIN", false)
    }

    /// Begin a transaction holding the database write lock unless one is
    /// open. Other writers wait until this session commits or rolls back.
    ///
    /// An already open deferred transaction is left as is; see
    /// [`Session::holds_write_lock`].
    pub fn begin_immediate(&mut self) -> rusqlite::Result<()> {
        self.start("BEGIN IMMEDIATE", true)
    }

    fn start(&mut self, statement: &str, write_locked: bool) -> rusqlite::Result<()> {
        if self.in_transaction {
            return Ok(());
        }
        debug!(target: "mozi.sql", "{}", statement);
        self.conn.execute_batch(statement)?;
        self.in_transaction = true;
        self.write_locked = write_locked;
        Ok(())
    }

    pub fn commit(&mut self) -> rusqlite::Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        debug!(target: "mozi.sql", "COMMIT");
        self.conn.execute_batch("COMMIT")?;
        self.in_transaction = false;
        self.write_locked = false;
        Ok(())
    }

    pub fn rollback(&mut self) -> rusqlite::Result<()> {
        if !self.in_transaction {
            return Ok(());
        }
        self.in_transaction = false;
        self.write_locked = false;
        warn!(target: "mozi.sql", "ROLLBACK");
        self.conn.execute_batch("ROLLBACK")
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.rollback() {
            warn!("Failed to roll back open transaction: {}", e);
        }
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("in_transaction", &self.in_transaction)
            .field("write_locked", &self.write_locked)
            .finish_non_exhaustive()
    }
}
