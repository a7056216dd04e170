//! Bookstore schema migrations.
//!
//! # Responsibility
//! - Bring a fresh or older database up to the `book` schema this crate maps.
//! - Refuse databases written by a newer build.
//!
//! # Invariants
//! - Versions start at 1 and increase by one per entry.
//! - `PRAGMA user_version` always equals the last applied version.
//! - All pending steps commit together or not at all.

use crate::db::{DbError, DbResult};
use log::debug;
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "books",
    sql: include_str!("0001_books.sql"),
}];

/// Returns the latest migration version known by this binary.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Upgrades `conn` to `latest_version()`.
///
/// # Errors
/// - `UnsupportedSchemaVersion` when the file is stamped past what this
///   build knows; nothing is written in that case.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    let stamped = schema_version(conn)?;
    let latest = latest_version();
    if stamped > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: stamped,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Migration> = MIGRATIONS
        .iter()
        .filter(|migration| migration.version > stamped)
        .collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for migration in &pending {
        debug!(
            "event=db_migrate module=db status=apply version={} name={}",
            migration.version, migration.name
        );
        tx.execute_batch(migration.sql)?;
        tx.pragma_update(None, "user_version", migration.version)?;
    }
    tx.commit()?;

    debug!(
        "event=db_migrate module=db status=ok from_version={stamped} to_version={latest} applied={}",
        pending.len()
    );
    Ok(())
}

fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
