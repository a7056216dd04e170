//! SQLite-backed relational store.
//!
//! # Responsibility
//! - Run mapper statements on one shared `rusqlite::Connection`.
//! - Classify unique/primary-key violations apart from other backend errors.
//!
//! # Invariants
//! - Every call holds the connection lock for its full duration.
//! - Query results are fully stepped before the lock is released.

use super::{RelationalStore, RowSet, Statement, StoreError, StoreResult, StoreRow, StoreValue};
use crate::db::{open_db, open_db_in_memory, open_db_with_options, DbOptions, DbResult};
use log::trace;
use rusqlite::ffi;
use rusqlite::types::{ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Relational store over a single SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wraps an already bootstrapped connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Opens (and migrates) a database file with default options.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        open_db(path).map(Self::new)
    }

    /// Opens (and migrates) a database file with explicit options.
    pub fn open_with_options(path: impl AsRef<Path>, options: &DbOptions) -> DbResult<Self> {
        open_db_with_options(path, options).map(Self::new)
    }

    /// Opens (and migrates) a private in-memory database.
    pub fn open_in_memory() -> DbResult<Self> {
        open_db_in_memory().map(Self::new)
    }

    /// Gives direct access to the connection, e.g. for fixtures in tests.
    pub fn with_connection<R>(&self, f: impl FnOnce(&Connection) -> R) -> R {
        f(&self.lock())
    }

    pub fn into_inner(self) -> Connection {
        self.conn.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        // A panic mid-statement leaves the connection itself usable.
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl RelationalStore for SqliteStore {
    fn prepare(&self, sql: &str) -> StoreResult<Statement> {
        let conn = self.lock();
        let stmt = conn.prepare_cached(sql).map_err(classify)?;
        Ok(Statement::new(sql, stmt.parameter_count()))
    }

    fn execute(&self, statement: &Statement) -> StoreResult<usize> {
        let values = statement.bound_values()?;
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(statement.sql()).map_err(classify)?;
        let changed = stmt.execute(params_from_iter(values)).map_err(classify)?;
        trace!("event=store_execute module=store status=ok changed={changed}");
        Ok(changed)
    }

    fn execute_query(&self, statement: &Statement) -> StoreResult<RowSet> {
        let values = statement.bound_values()?;
        let conn = self.lock();
        let mut stmt = conn.prepare_cached(statement.sql()).map_err(classify)?;
        let columns: Arc<[String]> = stmt
            .column_names()
            .into_iter()
            .map(String::from)
            .collect();
        let column_count = columns.len();

        let mut rows = stmt.query(params_from_iter(values)).map_err(classify)?;
        let mut fetched = Vec::new();
        while let Some(row) = rows.next().map_err(classify)? {
            let mut values = Vec::with_capacity(column_count);
            for index in 0..column_count {
                values.push(read_value(
                    index + 1,
                    row.get_ref(index).map_err(classify)?,
                )?);
            }
            fetched.push(StoreRow::new(Arc::clone(&columns), values));
        }

        trace!(
            "event=store_query module=store status=ok rows={}",
            fetched.len()
        );
        Ok(RowSet::new(fetched))
    }
}

impl ToSql for StoreValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            Self::Null => ValueRef::Null,
            Self::Integer(value) => ValueRef::Integer(*value),
            Self::Real(value) => ValueRef::Real(*value),
            Self::Text(value) => ValueRef::Text(value.as_bytes()),
            Self::Blob(value) => ValueRef::Blob(value.as_slice()),
        };
        Ok(ToSqlOutput::Borrowed(value))
    }
}

/// `position` is the 1-based column position reported on decode failures.
fn read_value(position: usize, value: ValueRef<'_>) -> StoreResult<StoreValue> {
    Ok(match value {
        ValueRef::Null => StoreValue::Null,
        ValueRef::Integer(value) => StoreValue::Integer(value),
        ValueRef::Real(value) => StoreValue::Real(value),
        ValueRef::Text(bytes) => StoreValue::Text(
            std::str::from_utf8(bytes)
                .map_err(|_| StoreError::ColumnEncoding { position })?
                .to_string(),
        ),
        ValueRef::Blob(bytes) => StoreValue::Blob(bytes.to_vec()),
    })
}

fn classify(err: rusqlite::Error) -> StoreError {
    match err.sqlite_error() {
        Some(failure)
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                || failure.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE =>
        {
            StoreError::UniqueViolation(err.to_string())
        }
        _ => StoreError::Sqlite(err),
    }
}
