#![allow(clippy::significant_drop_tightening)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use super::repository::{
    CreateOrganizationOptions, CreateUserOptions, ListOrganizationsOptions,
    OrganizationDirectory, UserStore,
};
use super::types::{Account, AccountKind, Membership, Organization};
use crate::validators::{validate_email, validate_name};
use crate::DirectoryError;

/// In-memory directory for tests.
///
/// One struct implements both [`UserStore`] and [`OrganizationDirectory`]
/// so users and organizations share a single account namespace, the same
/// way the relational backends share the `accounts` table.
pub struct MockDirectory {
    accounts: RwLock<HashMap<i64, Account>>,
    memberships: RwLock<HashMap<i64, Membership>>,
    next_account_id: AtomicI64,
    next_membership_id: AtomicI64,
}

impl MockDirectory {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            memberships: RwLock::new(HashMap::new()),
            next_account_id: AtomicI64::new(1),
            next_membership_id: AtomicI64::new(1),
        }
    }

    fn org_from_account(&self, account: &Account, num_members: i64) -> Organization {
        Organization {
            id: account.id,
            name: account.name.clone(),
            full_name: account.full_name.clone(),
            num_members,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }

    fn count_members(memberships: &HashMap<i64, Membership>, org_id: i64) -> i64 {
        memberships.values().filter(|m| m.org_id == org_id).count() as i64
    }
}

impl Default for MockDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserStore for MockDirectory {
    async fn create(
        &self,
        name: &str,
        email: &str,
        opts: CreateUserOptions,
    ) -> Result<Account, DirectoryError> {
        validate_name(name).map_err(DirectoryError::InvalidName)?;
        validate_email(email).map_err(DirectoryError::InvalidEmail)?;

        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;
        if accounts.values().any(|a| a.name == name) {
            return Err(DirectoryError::NameTaken);
        }

        let id = self.next_account_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let account = Account {
            id,
            name: name.to_owned(),
            email: email.to_owned(),
            kind: AccountKind::User,
            full_name: opts.full_name.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        accounts.insert(id, account.clone());

        Ok(account)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<Account>, DirectoryError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;
        Ok(accounts.get(&id).cloned())
    }
}

#[async_trait]
impl OrganizationDirectory for MockDirectory {
    async fn create(
        &self,
        name: &str,
        creator_id: i64,
        opts: CreateOrganizationOptions,
    ) -> Result<Organization, DirectoryError> {
        validate_name(name).map_err(DirectoryError::InvalidName)?;

        let mut accounts = self
            .accounts
            .write()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;
        let mut memberships = self
            .memberships
            .write()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;

        if !accounts.contains_key(&creator_id) {
            return Err(DirectoryError::AccountNotFound);
        }
        if accounts.values().any(|a| a.name == name) {
            return Err(DirectoryError::NameTaken);
        }

        let full_name = match opts.full_name {
            Some(s) if !s.trim().is_empty() => s,
            _ => name.to_owned(),
        };

        let id = self.next_account_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let account = Account {
            id,
            name: name.to_owned(),
            email: String::new(),
            kind: AccountKind::Organization,
            full_name,
            created_at: now,
            updated_at: now,
        };
        accounts.insert(id, account.clone());

        let membership_id = self.next_membership_id.fetch_add(1, Ordering::SeqCst);
        memberships.insert(
            membership_id,
            Membership {
                id: membership_id,
                org_id: id,
                account_id: creator_id,
                is_owner: true,
                is_public: false,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(self.org_from_account(&account, 1))
    }

    async fn get_by_name(&self, name: &str) -> Result<Organization, DirectoryError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;
        let memberships = self
            .memberships
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;

        accounts
            .values()
            .find(|a| a.name == name && a.is_organization())
            .map(|a| self.org_from_account(a, Self::count_members(&memberships, a.id)))
            .ok_or(DirectoryError::OrganizationNotFound)
    }

    async fn add_member(&self, org_id: i64, account_id: i64) -> Result<(), DirectoryError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;
        let mut memberships = self
            .memberships
            .write()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;

        if !accounts.get(&org_id).is_some_and(Account::is_organization) {
            return Err(DirectoryError::OrganizationNotFound);
        }
        if !accounts.contains_key(&account_id) {
            return Err(DirectoryError::AccountNotFound);
        }
        if memberships
            .values()
            .any(|m| m.org_id == org_id && m.account_id == account_id)
        {
            return Err(DirectoryError::DuplicateMembership);
        }

        let id = self.next_membership_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        memberships.insert(
            id,
            Membership {
                id,
                org_id,
                account_id,
                is_owner: false,
                is_public: false,
                created_at: now,
                updated_at: now,
            },
        );

        Ok(())
    }

    async fn remove_member(&self, org_id: i64, account_id: i64) -> Result<(), DirectoryError> {
        let mut memberships = self
            .memberships
            .write()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;

        let id = memberships
            .values()
            .find(|m| m.org_id == org_id && m.account_id == account_id)
            .map(|m| m.id)
            .ok_or(DirectoryError::MembershipNotFound)?;
        memberships.remove(&id);

        Ok(())
    }

    async fn has_member(&self, org_id: i64, account_id: i64) -> Result<bool, DirectoryError> {
        let memberships = self
            .memberships
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;
        Ok(memberships
            .values()
            .any(|m| m.org_id == org_id && m.account_id == account_id))
    }

    async fn membership(
        &self,
        org_id: i64,
        account_id: i64,
    ) -> Result<Option<Membership>, DirectoryError> {
        let memberships = self
            .memberships
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;
        Ok(memberships
            .values()
            .find(|m| m.org_id == org_id && m.account_id == account_id)
            .cloned())
    }

    async fn set_member_visibility(
        &self,
        org_id: i64,
        account_id: i64,
        is_public: bool,
    ) -> Result<(), DirectoryError> {
        let mut memberships = self
            .memberships
            .write()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;

        let membership = memberships
            .values_mut()
            .find(|m| m.org_id == org_id && m.account_id == account_id)
            .ok_or(DirectoryError::MembershipNotFound)?;
        membership.is_public = is_public;
        membership.updated_at = Utc::now();

        Ok(())
    }

    async fn list(
        &self,
        opts: ListOrganizationsOptions,
    ) -> Result<Vec<Organization>, DirectoryError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;
        let memberships = self
            .memberships
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;

        let mut orgs: Vec<Organization> = memberships
            .values()
            .filter(|m| {
                m.account_id == opts.member_id && (opts.include_private_members || m.is_public)
            })
            .filter_map(|m| accounts.get(&m.org_id))
            .filter(|a| a.is_organization())
            .map(|a| self.org_from_account(a, Self::count_members(&memberships, a.id)))
            .collect();
        orgs.sort_by_key(|o| o.id);
        orgs.dedup_by_key(|o| o.id);

        Ok(orgs)
    }

    async fn list_members(&self, org_id: i64) -> Result<Vec<Account>, DirectoryError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;
        let memberships = self
            .memberships
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;

        let mut edges: Vec<&Membership> = memberships
            .values()
            .filter(|m| m.org_id == org_id)
            .collect();
        edges.sort_by_key(|m| m.id);

        Ok(edges
            .into_iter()
            .filter_map(|m| accounts.get(&m.account_id).cloned())
            .collect())
    }

    async fn search_by_name(
        &self,
        keyword: &str,
        page: i64,
        page_size: i64,
        order_by: &str,
    ) -> Result<(Vec<Organization>, i64), DirectoryError> {
        let accounts = self
            .accounts
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;
        let memberships = self
            .memberships
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;

        let keyword = keyword.to_lowercase();
        let mut matches: Vec<Organization> = accounts
            .values()
            .filter(|a| a.is_organization())
            .filter(|a| {
                a.name.to_lowercase().contains(&keyword)
                    || a.full_name.to_lowercase().contains(&keyword)
            })
            .map(|a| self.org_from_account(a, Self::count_members(&memberships, a.id)))
            .collect();

        // The mock understands orderings on the id column only.
        if order_by.trim().eq_ignore_ascii_case("id desc") {
            matches.sort_by_key(|o| std::cmp::Reverse(o.id));
        } else {
            matches.sort_by_key(|o| o.id);
        }

        let total = matches.len() as i64;
        let page = page.max(1);
        let offset = ((page - 1) * page_size).max(0) as usize;
        let orgs = matches
            .into_iter()
            .skip(offset)
            .take(page_size.max(0) as usize)
            .collect();

        Ok((orgs, total))
    }

    async fn count_by_user(&self, account_id: i64) -> Result<i64, DirectoryError> {
        let memberships = self
            .memberships
            .read()
            .map_err(|_| DirectoryError::DatabaseError("lock poisoned".into()))?;
        Ok(memberships
            .values()
            .filter(|m| m.account_id == account_id)
            .count() as i64)
    }
}
