//! `SQLite` implementation of [`UserStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use super::{is_unique_violation, storage_error};
use crate::directory::{Account, AccountKind, CreateUserOptions, UserStore};
use crate::validators::{validate_email, validate_name};
use crate::DirectoryError;

/// `SQLite`-backed user account store.
#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct AccountRecord {
    id: i64,
    name: String,
    email: String,
    kind: String,
    full_name: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRecord> for Account {
    fn from(row: AccountRecord) -> Self {
        Account {
            id: row.id,
            name: row.name,
            email: row.email,
            kind: AccountKind::from_str(&row.kind).unwrap_or_default(),
            full_name: row.full_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl UserStore for SqliteUserStore {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, opts), err))]
    async fn create(
        &self,
        name: &str,
        email: &str,
        opts: CreateUserOptions,
    ) -> Result<Account, DirectoryError> {
        validate_name(name).map_err(DirectoryError::InvalidName)?;
        validate_email(email).map_err(DirectoryError::InvalidEmail)?;

        let now = Utc::now();
        let row: AccountRecord = sqlx::query_as(
            r"
            INSERT INTO accounts (name, email, kind, full_name, created_at, updated_at)
            VALUES (?, ?, 'user', ?, ?, ?)
            RETURNING id, name, email, kind, full_name, created_at, updated_at
            ",
        )
        .bind(name)
        .bind(email)
        .bind(opts.full_name.unwrap_or_default())
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DirectoryError::NameTaken
            } else {
                storage_error("create_user", &e)
            }
        })?;

        Ok(row.into())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, DirectoryError> {
        let row: Option<AccountRecord> = sqlx::query_as(
            "SELECT id, name, email, kind, full_name, created_at, updated_at FROM accounts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("find_account_by_id", &e))?;

        Ok(row.map(Into::into))
    }
}
