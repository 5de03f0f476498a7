//! `SQLite` database backend implementations.
//!
//! This module provides `SQLite`-backed implementations of the directory
//! traits. Enable the `sqlx_sqlite` feature to use them.

pub mod migrations;
mod organizations;
mod users;

pub use organizations::SqliteOrganizationDirectory;
pub use users::SqliteUserStore;

use sqlx::SqlitePool;

use crate::DirectoryError;

/// Creates all `SQLite` store instances from a connection pool.
pub fn create_stores(pool: SqlitePool) -> (SqliteOrganizationDirectory, SqliteUserStore) {
    (
        SqliteOrganizationDirectory::new(pool.clone()),
        SqliteUserStore::new(pool),
    )
}

/// Classifies a driver error, logging it at the storage boundary.
///
/// Pool exhaustion/closure and transport failures become
/// [`DirectoryError::StorageUnavailable`] so callers can retry; everything
/// else is a plain database error.
pub(crate) fn storage_error(operation: &str, e: &sqlx::Error) -> DirectoryError {
    log::error!(target: "orgdir", "msg=\"database error\", operation=\"{operation}\", error=\"{e}\"");
    match e {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_) => DirectoryError::StorageUnavailable(e.to_string()),
        _ => DirectoryError::DatabaseError(e.to_string()),
    }
}

pub(crate) fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.is_unique_violation())
}
