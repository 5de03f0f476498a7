pub mod directory;
pub mod validators;

#[cfg(feature = "sqlx_postgres")]
pub mod postgres;
#[cfg(feature = "sqlx_sqlite")]
pub mod sqlite;

pub use directory::Account;
pub use directory::AccountKind;
pub use directory::CreateOrganizationOptions;
pub use directory::CreateUserOptions;
pub use directory::ListOrganizationsOptions;
pub use directory::Membership;
pub use directory::Organization;
pub use directory::OrganizationDirectory;
pub use directory::UserStore;

#[cfg(feature = "mocks")]
pub use directory::MockDirectory;

pub use validators::ValidationError;

use std::fmt;

/// Errors returned by directory and user-store operations.
///
/// Conflict variants (`NameTaken`, `DuplicateMembership`) originate from
/// storage-level unique constraints, so they hold under concurrent callers.
/// `StorageUnavailable` is transient; everything else is not worth retrying.
#[derive(Debug, Clone, PartialEq)]
pub enum DirectoryError {
    OrganizationNotFound,
    AccountNotFound,
    MembershipNotFound,
    NameTaken,
    DuplicateMembership,
    InvalidName(ValidationError),
    InvalidEmail(ValidationError),
    StorageUnavailable(String),
    DatabaseError(String),
}

impl DirectoryError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DirectoryError::OrganizationNotFound
                | DirectoryError::AccountNotFound
                | DirectoryError::MembershipNotFound
        )
    }

    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DirectoryError::NameTaken | DirectoryError::DuplicateMembership
        )
    }

    /// Whether retrying the operation can succeed without caller-side changes.
    ///
    /// Note that `create` and `add_member` are not idempotent: if the first
    /// attempt actually committed, a retry reports a conflict.
    pub fn is_retryable(&self) -> bool {
        matches!(self, DirectoryError::StorageUnavailable(_))
    }
}

impl std::error::Error for DirectoryError {}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::OrganizationNotFound => write!(f, "Organization not found"),
            DirectoryError::AccountNotFound => write!(f, "Account not found"),
            DirectoryError::MembershipNotFound => write!(f, "Membership not found"),
            DirectoryError::NameTaken => write!(f, "Name is already taken by another account"),
            DirectoryError::DuplicateMembership => {
                write!(f, "Account is already a member of this organization")
            }
            DirectoryError::InvalidName(e) => write!(f, "Invalid name: {e}"),
            DirectoryError::InvalidEmail(e) => write!(f, "Invalid email: {e}"),
            DirectoryError::StorageUnavailable(msg) => write!(f, "Storage unavailable: {msg}"),
            DirectoryError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
        }
    }
}
