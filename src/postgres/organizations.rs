//! `PostgreSQL` implementation of [`OrganizationDirectory`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use super::{is_unique_violation, storage_error};
use crate::directory::{
    Account, AccountKind, CreateOrganizationOptions, ListOrganizationsOptions, Membership,
    Organization, OrganizationDirectory,
};
use crate::validators::validate_name;
use crate::DirectoryError;

/// `PostgreSQL`-backed organization directory.
#[derive(Clone)]
pub struct PostgresOrganizationDirectory {
    pool: PgPool,
}

impl PostgresOrganizationDirectory {
    /// Create a new directory over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Organization rows carry the membership count as a correlated subquery,
// so every read path reports the same number without a cached column.
const ORG_COLUMNS: &str = "o.id, o.name, o.full_name, \
     (SELECT COUNT(*) FROM memberships m2 WHERE m2.org_id = o.id) AS num_members, \
     o.created_at, o.updated_at";

#[derive(FromRow)]
struct OrgRecord {
    id: i64,
    name: String,
    full_name: String,
    num_members: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<OrgRecord> for Organization {
    fn from(row: OrgRecord) -> Self {
        Organization {
            id: row.id,
            name: row.name,
            full_name: row.full_name,
            num_members: row.num_members,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(FromRow)]
struct MembershipRecord {
    id: i64,
    org_id: i64,
    account_id: i64,
    is_owner: bool,
    is_public: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<MembershipRecord> for Membership {
    fn from(row: MembershipRecord) -> Self {
        Membership {
            id: row.id,
            org_id: row.org_id,
            account_id: row.account_id,
            is_owner: row.is_owner,
            is_public: row.is_public,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
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
impl OrganizationDirectory for PostgresOrganizationDirectory {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, opts), err))]
    async fn create(
        &self,
        name: &str,
        creator_id: i64,
        opts: CreateOrganizationOptions,
    ) -> Result<Organization, DirectoryError> {
        validate_name(name).map_err(DirectoryError::InvalidName)?;

        let full_name = match opts.full_name {
            Some(s) if !s.trim().is_empty() => s,
            _ => name.to_owned(),
        };

        // The account row and the owner membership commit together or not
        // at all; any early return drops the transaction, which rolls back.
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| storage_error("create_organization", &e))?;

        let creator_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)")
                .bind(creator_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(|e| storage_error("create_organization", &e))?;
        if !creator_exists {
            return Err(DirectoryError::AccountNotFound);
        }

        let now = Utc::now();
        let org_id: i64 = sqlx::query_scalar(
            r"
            INSERT INTO accounts (name, email, kind, full_name, created_at, updated_at)
            VALUES ($1, '', 'organization', $2, $3, $4)
            RETURNING id
            ",
        )
        .bind(name)
        .bind(&full_name)
        .bind(now)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DirectoryError::NameTaken
            } else {
                storage_error("create_organization", &e)
            }
        })?;

        sqlx::query(
            r"
            INSERT INTO memberships (org_id, account_id, is_owner, is_public, created_at, updated_at)
            VALUES ($1, $2, TRUE, FALSE, $3, $4)
            ",
        )
        .bind(org_id)
        .bind(creator_id)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| storage_error("create_organization", &e))?;

        tx.commit()
            .await
            .map_err(|e| storage_error("create_organization", &e))?;

        Ok(Organization {
            id: org_id,
            name: name.to_owned(),
            full_name,
            num_members: 1,
            created_at: now,
            updated_at: now,
        })
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn get_by_name(&self, name: &str) -> Result<Organization, DirectoryError> {
        let row: Option<OrgRecord> = sqlx::query_as(&format!(
            "SELECT {ORG_COLUMNS} FROM accounts o WHERE o.name = $1 AND o.kind = 'organization'"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("get_organization_by_name", &e))?;

        row.map(Into::into)
            .ok_or(DirectoryError::OrganizationNotFound)
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn add_member(&self, org_id: i64, account_id: i64) -> Result<(), DirectoryError> {
        // Existence probes give precise not-found errors; the unique index
        // on (org_id, account_id) is what rejects concurrent duplicates.
        let org_exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1 AND kind = 'organization')",
        )
        .bind(org_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("add_member", &e))?;
        if !org_exists {
            return Err(DirectoryError::OrganizationNotFound);
        }

        let account_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM accounts WHERE id = $1)")
                .bind(account_id)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| storage_error("add_member", &e))?;
        if !account_exists {
            return Err(DirectoryError::AccountNotFound);
        }

        let now = Utc::now();
        sqlx::query(
            r"
            INSERT INTO memberships (org_id, account_id, is_owner, is_public, created_at, updated_at)
            VALUES ($1, $2, FALSE, FALSE, $3, $4)
            ",
        )
        .bind(org_id)
        .bind(account_id)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                DirectoryError::DuplicateMembership
            } else {
                storage_error("add_member", &e)
            }
        })?;

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn remove_member(&self, org_id: i64, account_id: i64) -> Result<(), DirectoryError> {
        let result = sqlx::query("DELETE FROM memberships WHERE org_id = $1 AND account_id = $2")
            .bind(org_id)
            .bind(account_id)
            .execute(&self.pool)
            .await
            .map_err(|e| storage_error("remove_member", &e))?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::MembershipNotFound);
        }

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn has_member(&self, org_id: i64, account_id: i64) -> Result<bool, DirectoryError> {
        sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM memberships WHERE org_id = $1 AND account_id = $2)",
        )
        .bind(org_id)
        .bind(account_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("has_member", &e))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn membership(
        &self,
        org_id: i64,
        account_id: i64,
    ) -> Result<Option<Membership>, DirectoryError> {
        let row: Option<MembershipRecord> = sqlx::query_as(
            r"
            SELECT id, org_id, account_id, is_owner, is_public, created_at, updated_at
            FROM memberships
            WHERE org_id = $1 AND account_id = $2
            ",
        )
        .bind(org_id)
        .bind(account_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| storage_error("get_membership", &e))?;

        Ok(row.map(Into::into))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn set_member_visibility(
        &self,
        org_id: i64,
        account_id: i64,
        is_public: bool,
    ) -> Result<(), DirectoryError> {
        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE memberships SET is_public = $1, updated_at = $2 WHERE org_id = $3 AND account_id = $4",
        )
        .bind(is_public)
        .bind(now)
        .bind(org_id)
        .bind(account_id)
        .execute(&self.pool)
        .await
        .map_err(|e| storage_error("set_member_visibility", &e))?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::MembershipNotFound);
        }

        Ok(())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, opts), err))]
    async fn list(
        &self,
        opts: ListOrganizationsOptions,
    ) -> Result<Vec<Organization>, DirectoryError> {
        let mut sql = format!(
            "SELECT {ORG_COLUMNS} \
             FROM accounts o \
             JOIN memberships m ON m.org_id = o.id \
             WHERE o.kind = 'organization' AND m.account_id = $1"
        );
        if !opts.include_private_members {
            sql.push_str(" AND m.is_public = TRUE");
        }
        sql.push_str(" ORDER BY o.id ASC");

        let rows: Vec<OrgRecord> = sqlx::query_as(&sql)
            .bind(opts.member_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("list_organizations", &e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn list_members(&self, org_id: i64) -> Result<Vec<Account>, DirectoryError> {
        let rows: Vec<AccountRecord> = sqlx::query_as(
            r"
            SELECT a.id, a.name, a.email, a.kind, a.full_name, a.created_at, a.updated_at
            FROM accounts a
            JOIN memberships m ON m.account_id = a.id
            WHERE m.org_id = $1
            ORDER BY m.id ASC
            ",
        )
        .bind(org_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| storage_error("list_members", &e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn search_by_name(
        &self,
        keyword: &str,
        page: i64,
        page_size: i64,
        order_by: &str,
    ) -> Result<(Vec<Organization>, i64), DirectoryError> {
        let pattern = format!("%{}%", keyword.to_lowercase());

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM accounts o \
             WHERE o.kind = 'organization' \
             AND (LOWER(o.name) LIKE $1 OR LOWER(o.full_name) LIKE $1)",
        )
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| storage_error("search_organizations", &e))?;

        // order_by is caller-supplied SQL, never user input.
        let order = if order_by.is_empty() { "id ASC" } else { order_by };
        let page = page.max(1);
        let sql = format!(
            "SELECT {ORG_COLUMNS} FROM accounts o \
             WHERE o.kind = 'organization' \
             AND (LOWER(o.name) LIKE $1 OR LOWER(o.full_name) LIKE $1) \
             ORDER BY {order} LIMIT $2 OFFSET $3"
        );
        let rows: Vec<OrgRecord> = sqlx::query_as(&sql)
            .bind(&pattern)
            .bind(page_size)
            .bind((page - 1) * page_size)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| storage_error("search_organizations", &e))?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    async fn count_by_user(&self, account_id: i64) -> Result<i64, DirectoryError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM memberships WHERE account_id = $1")
            .bind(account_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| storage_error("count_by_user", &e))
    }
}
