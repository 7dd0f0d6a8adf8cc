//! Mozi Storage Layer
//!
//! Typed SQLite records with generic CRUD operations.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    Application                       │
//! ├──────────────────────────────────────────────────────┤
//! │          Crud (blanket over every Record)            │
//! │   upsert / update / delete / get / gets / count      │
//! ├──────────────────────────────────────────────────────┤
//! │     Record (field registry, immutable fields)        │
//! ├──────────────────────────────────────────────────────┤
//! │        Session (transaction + timestamp clock)       │
//! ├──────────────────────────────────────────────────────┤
//! │                   Database                           │
//! │                   (SQLite)                           │
//! └──────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use mozi_storage::{Crud, Database, Query};
//!
//! let db = Database::open(&path)?;
//! db.create_table::<User>()?;
//!
//! let mut session = db.session();
//! let user = User::create(&mut session, &[("name", "foo".to_string().into())])?;
//! let (total, page) = User::gets(&session, &Query::new().order_by("-name"))?;
//! ```

mod crud;
mod database;
pub mod error;
mod query;
pub mod record;
mod session;

pub use crud::Crud;
pub use database::Database;
pub use error::{Result, StorageError, ValidationError};
pub use query::{Condition, Op, Query, DEFAULT_LIMIT};
pub use record::{BaseFields, Record, BASE_FIELDS};
pub use rusqlite::types::Value;
pub use session::{Clock, Session};
