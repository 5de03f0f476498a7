//! Core types for the organization directory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminates individual users from organizations.
///
/// Both kinds live in the same `accounts` relation and share one name
/// namespace, so an organization can never shadow a user's name and vice
/// versa. Stored as a string in the database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountKind {
    #[default]
    User,
    Organization,
}

impl AccountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Organization => "organization",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(Self::User),
            "organization" => Some(Self::Organization),
            _ => None,
        }
    }
}

/// An identity in the shared account namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: i64,
    /// Globally unique handle, shared across users and organizations.
    pub name: String,
    /// Contact email; empty for organization accounts.
    pub email: String,
    /// Whether this account is an individual user or an organization.
    pub kind: AccountKind,
    /// Free-text display name, searchable alongside `name`.
    pub full_name: String,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_organization(&self) -> bool {
        self.kind == AccountKind::Organization
    }
}

/// An organization account, as returned by directory queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Organization {
    /// Unique identifier, immutable for the organization's lifetime.
    pub id: i64,
    /// Globally unique display handle.
    pub name: String,
    /// Free-text display name, searchable alongside `name`.
    pub full_name: String,
    /// Number of memberships, public and private alike.
    pub num_members: i64,
    /// When the organization was created.
    pub created_at: DateTime<Utc>,
    /// When the organization was last updated.
    pub updated_at: DateTime<Utc>,
}

/// The edge linking an account to an organization.
///
/// At most one membership exists per `(org_id, account_id)` pair; the
/// backing store enforces this with a unique index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    /// Unique identifier.
    pub id: i64,
    /// The organization side of the edge.
    pub org_id: i64,
    /// The member account side of the edge.
    pub account_id: i64,
    /// Set on the founding member at organization creation.
    pub is_owner: bool,
    /// Whether the membership shows up in listings that exclude private
    /// members. Defaults to false; changed only through
    /// [`set_member_visibility`](super::OrganizationDirectory::set_member_visibility).
    pub is_public: bool,
    /// When the account joined.
    pub created_at: DateTime<Utc>,
    /// When the membership was last updated.
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_kind_round_trip() {
        assert_eq!(AccountKind::from_str("user"), Some(AccountKind::User));
        assert_eq!(
            AccountKind::from_str("organization"),
            Some(AccountKind::Organization)
        );
        assert_eq!(AccountKind::from_str("robot"), None);

        assert_eq!(AccountKind::User.as_str(), "user");
        assert_eq!(AccountKind::Organization.as_str(), "organization");
    }

    #[test]
    fn test_account_is_organization() {
        let now = Utc::now();
        let account = Account {
            id: 1,
            name: "acme".to_owned(),
            email: String::new(),
            kind: AccountKind::Organization,
            full_name: "Acme Corp".to_owned(),
            created_at: now,
            updated_at: now,
        };
        assert!(account.is_organization());

        let user = Account {
            kind: AccountKind::User,
            ..account
        };
        assert!(!user.is_organization());
    }
}
