use async_trait::async_trait;

use super::types::{Account, Membership, Organization};
use crate::DirectoryError;

/// Optional fields for [`UserStore::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateUserOptions {
    /// Free-text display name; empty when not given.
    pub full_name: Option<String>,
}

/// Optional fields for [`OrganizationDirectory::create`].
#[derive(Debug, Clone, Default)]
pub struct CreateOrganizationOptions {
    /// Searchable display text. Falls back to the organization name when
    /// absent or blank.
    pub full_name: Option<String>,
}

/// Filter for [`OrganizationDirectory::list`].
#[derive(Debug, Clone)]
pub struct ListOrganizationsOptions {
    /// Only organizations where this account holds a membership.
    pub member_id: i64,
    /// When false, only memberships marked public are considered.
    pub include_private_members: bool,
}

/// Storage for individual user accounts.
///
/// The directory depends on this collaborator to materialize accounts
/// before organizations or memberships can reference them.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Create a user account.
    ///
    /// The name is unique across the whole account namespace, organizations
    /// included; a collision fails with [`DirectoryError::NameTaken`].
    async fn create(
        &self,
        name: &str,
        email: &str,
        opts: CreateUserOptions,
    ) -> Result<Account, DirectoryError>;

    /// Look up an account by id, user or organization.
    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, DirectoryError>;
}

/// Storage and queries for organizations and their membership edges.
///
/// Implementations are stateless over a connection pool and safe to share
/// across concurrent callers; correctness under concurrency is delegated to
/// the storage engine's transactions and unique constraints.
#[async_trait]
pub trait OrganizationDirectory: Send + Sync {
    /// Create an organization owned by `creator_id`.
    ///
    /// The organization account and the owner membership (`is_owner = true`,
    /// `is_public = false`) are committed in one transaction; a failure on
    /// either leaves no trace of the other. Fails with
    /// [`DirectoryError::NameTaken`] when any account already holds the
    /// name, [`DirectoryError::AccountNotFound`] when the creator does not
    /// exist, and [`DirectoryError::InvalidName`] on malformed names.
    async fn create(
        &self,
        name: &str,
        creator_id: i64,
        opts: CreateOrganizationOptions,
    ) -> Result<Organization, DirectoryError>;

    /// Look up an organization by name.
    ///
    /// Fails with [`DirectoryError::OrganizationNotFound`] when the name is
    /// unused or belongs to an individual user.
    async fn get_by_name(&self, name: &str) -> Result<Organization, DirectoryError>;

    /// Add `account_id` as a regular, private member of `org_id`.
    ///
    /// Not idempotent: an existing membership fails with
    /// [`DirectoryError::DuplicateMembership`]. The duplicate check is the
    /// storage-level unique index, so concurrent inserts of the same pair
    /// cannot both succeed.
    async fn add_member(&self, org_id: i64, account_id: i64) -> Result<(), DirectoryError>;

    /// Remove the membership edge for `(org_id, account_id)`.
    ///
    /// Fails with [`DirectoryError::MembershipNotFound`] when no such edge
    /// exists.
    async fn remove_member(&self, org_id: i64, account_id: i64) -> Result<(), DirectoryError>;

    /// Whether `account_id` holds a membership in `org_id`.
    async fn has_member(&self, org_id: i64, account_id: i64) -> Result<bool, DirectoryError>;

    /// Fetch the membership edge for `(org_id, account_id)`, if any.
    async fn membership(
        &self,
        org_id: i64,
        account_id: i64,
    ) -> Result<Option<Membership>, DirectoryError>;

    /// Set the visibility flag on an existing membership.
    ///
    /// Setting a flag to its current value succeeds silently. Fails with
    /// [`DirectoryError::MembershipNotFound`] when no edge exists.
    async fn set_member_visibility(
        &self,
        org_id: i64,
        account_id: i64,
        is_public: bool,
    ) -> Result<(), DirectoryError>;

    /// List organizations where `opts.member_id` holds a membership,
    /// ordered by ascending id.
    ///
    /// A member with no memberships yields an empty list, not an error.
    async fn list(
        &self,
        opts: ListOrganizationsOptions,
    ) -> Result<Vec<Organization>, DirectoryError>;

    /// List member accounts of an organization in join order.
    async fn list_members(&self, org_id: i64) -> Result<Vec<Account>, DirectoryError>;

    /// Search organizations whose name or full name contains `keyword`,
    /// case-insensitively.
    ///
    /// `page` is 1-indexed (values below 1 are treated as 1) and `page_size`
    /// bounds the returned rows. The second element of the result is the
    /// total match count across all pages. `order_by` is spliced into the
    /// query verbatim, with `"id ASC"` as the default when empty; it must
    /// come from trusted code, never from user input.
    async fn search_by_name(
        &self,
        keyword: &str,
        page: i64,
        page_size: i64,
        order_by: &str,
    ) -> Result<(Vec<Organization>, i64), DirectoryError>;

    /// Count memberships held by `account_id`, regardless of visibility.
    ///
    /// An unknown account id counts as zero rather than failing.
    async fn count_by_user(&self, account_id: i64) -> Result<i64, DirectoryError>;
}
