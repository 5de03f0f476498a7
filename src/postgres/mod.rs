//! `PostgreSQL` database backend implementations.
//!
//! This module provides `PostgreSQL`-backed implementations of the
//! directory traits. Enable the `sqlx_postgres` feature to use them.

pub mod migrations;
mod organizations;
mod users;

pub use organizations::PostgresOrganizationDirectory;
pub use users::PostgresUserStore;

use sqlx::PgPool;

use crate::DirectoryError;

/// Creates all `PostgreSQL` store instances from a connection pool.
pub fn create_stores(pool: PgPool) -> (PostgresOrganizationDirectory, PostgresUserStore) {
    (
        PostgresOrganizationDirectory::new(pool.clone()),
        PostgresUserStore::new(pool),
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
