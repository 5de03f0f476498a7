//! Database migrations for `PostgreSQL`.
//!
//! Migrations are embedded at compile time via [`sqlx::migrate!`] and
//! tracked by sqlx's own `_sqlx_migrations` table.
//!
//! # Example
//!
//! ```rust,ignore
//! use orgdir::postgres::migrations;
//! use sqlx::PgPool;
//!
//! async fn setup_database(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
//!     migrations::run(pool).await?;
//!     Ok(())
//! }
//! ```

use sqlx::PgPool;

/// Runs all database migrations.
///
/// This includes tables for:
/// - `accounts`
/// - `memberships`
/// - `teams` / `team_memberships`
pub async fn run(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
