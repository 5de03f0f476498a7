//! Database migrations for `SQLite`.
//!
//! Migrations are embedded at compile time and run programmatically,
//! tracked in the `_orgdir_migrations` table.
//!
//! # Example
//!
//! ```rust,ignore
//! use orgdir::sqlite::migrations;
//! use sqlx::SqlitePool;
//!
//! async fn setup_database(pool: &SqlitePool) -> Result<(), sqlx::Error> {
//!     migrations::run(pool).await?;
//!     Ok(())
//! }
//! ```

use sqlx::{Executor, SqlitePool};

const CORE_MIGRATIONS: &[(&str, &str)] = &[
    (
        "20250715000001_create_accounts_table",
        include_str!("../../migrations_sqlite/core/20250715000001_create_accounts_table.sql"),
    ),
    (
        "20250715000002_create_memberships_table",
        include_str!("../../migrations_sqlite/core/20250715000002_create_memberships_table.sql"),
    ),
    (
        "20250715000003_create_teams_tables",
        include_str!("../../migrations_sqlite/core/20250715000003_create_teams_tables.sql"),
    ),
];

/// Runs all database migrations.
///
/// Migrations are executed in order and recorded in `_orgdir_migrations`;
/// already-applied migrations are skipped.
pub async fn run(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    pool.execute(
        r"
        CREATE TABLE IF NOT EXISTS _orgdir_migrations (
            name TEXT PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )
        ",
    )
    .await?;

    run_migrations(pool, CORE_MIGRATIONS).await
}

/// Runs a set of migrations against the database.
///
/// # Limitations
///
/// SQL statements are split by semicolons (`;`), so migrations must not
/// contain semicolons inside string literals. The bundled migrations are
/// written to respect this.
async fn run_migrations(pool: &SqlitePool, migrations: &[(&str, &str)]) -> Result<(), sqlx::Error> {
    for (name, sql) in migrations {
        let applied: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM _orgdir_migrations WHERE name = ?)")
                .bind(*name)
                .fetch_one(pool)
                .await?;

        if !applied {
            // SQLite executes one statement at a time, so split and run each.
            for statement in sql.split(';') {
                let trimmed = statement.trim();
                if !trimmed.is_empty() {
                    pool.execute(trimmed).await?;
                }
            }

            sqlx::query("INSERT INTO _orgdir_migrations (name) VALUES (?)")
                .bind(*name)
                .execute(pool)
                .await?;
        }
    }
    Ok(())
}
