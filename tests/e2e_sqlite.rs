// these tests use #[serial] because each one rebuilds its own in-memory
// database and the suite is cheap enough that parallelism buys nothing.
//! End-to-end tests for the `SQLite` stores.
//!
//! These tests use an in-memory `SQLite` database.
//! Run with: `cargo test --features sqlx_sqlite --test e2e_sqlite`

#![cfg(feature = "sqlx_sqlite")]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use orgdir::sqlite::{migrations, SqliteOrganizationDirectory, SqliteUserStore};
use orgdir::{
    Account, CreateOrganizationOptions, CreateUserOptions, DirectoryError,
    ListOrganizationsOptions, OrganizationDirectory, UserStore,
};
use serial_test::serial;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

async fn setup_db() -> SqlitePool {
    // Use in-memory database for testing
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory SQLite database");

    migrations::run(&pool).await.expect("Failed to run migrations");

    pool
}

async fn create_user(users: &SqliteUserStore, name: &str) -> Account {
    users
        .create(
            name,
            &format!("{name}@example.com"),
            CreateUserOptions::default(),
        )
        .await
        .expect("Failed to create user")
}

#[tokio::test]
#[serial]
async fn test_create_organization_creates_owner_membership() {
    let pool = setup_db().await;
    let users = SqliteUserStore::new(pool.clone());
    let dir = SqliteOrganizationDirectory::new(pool);

    let alice = create_user(&users, "alice").await;

    let org = dir
        .create("org1", alice.id, CreateOrganizationOptions::default())
        .await
        .expect("Failed to create organization");
    assert_eq!(org.name, "org1");
    // full_name falls back to the name when not given
    assert_eq!(org.full_name, "org1");
    assert_eq!(org.num_members, 1);

    let membership = dir
        .membership(org.id, alice.id)
        .await
        .expect("Failed to fetch membership")
        .expect("Owner membership missing");
    assert!(membership.is_owner);
    assert!(!membership.is_public);

    assert!(dir.has_member(org.id, alice.id).await.unwrap());

    let members = dir.list_members(org.id).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, alice.id);
}

#[tokio::test]
#[serial]
async fn test_create_organization_rejects_bad_input() {
    let pool = setup_db().await;
    let users = SqliteUserStore::new(pool.clone());
    let dir = SqliteOrganizationDirectory::new(pool);

    let alice = create_user(&users, "alice").await;

    // empty name
    let err = dir
        .create("", alice.id, CreateOrganizationOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::InvalidName(_)));

    // unknown creator
    let err = dir
        .create("org1", 404, CreateOrganizationOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, DirectoryError::AccountNotFound);
    // the failed create must not leave the account row behind
    assert_eq!(
        dir.get_by_name("org1").await.unwrap_err(),
        DirectoryError::OrganizationNotFound
    );

    // organization name colliding with another organization
    dir.create("org1", alice.id, CreateOrganizationOptions::default())
        .await
        .unwrap();
    let err = dir
        .create("org1", alice.id, CreateOrganizationOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, DirectoryError::NameTaken);

    // organizations share the account namespace with users
    let err = dir
        .create("alice", alice.id, CreateOrganizationOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, DirectoryError::NameTaken);
}

#[tokio::test]
#[serial]
async fn test_add_member_duplicate_fails() {
    let pool = setup_db().await;
    let users = SqliteUserStore::new(pool.clone());
    let dir = SqliteOrganizationDirectory::new(pool);

    let alice = create_user(&users, "alice").await;
    let bob = create_user(&users, "bob").await;

    let org = dir
        .create("org1", alice.id, CreateOrganizationOptions::default())
        .await
        .unwrap();

    dir.add_member(org.id, bob.id).await.unwrap();
    let err = dir.add_member(org.id, bob.id).await.unwrap_err();
    assert_eq!(err, DirectoryError::DuplicateMembership);

    // the pair still has exactly one membership
    assert_eq!(dir.count_by_user(bob.id).await.unwrap(), 1);
    assert_eq!(dir.list_members(org.id).await.unwrap().len(), 2);
}

#[tokio::test]
#[serial]
async fn test_add_member_missing_endpoints() {
    let pool = setup_db().await;
    let users = SqliteUserStore::new(pool.clone());
    let dir = SqliteOrganizationDirectory::new(pool);

    let alice = create_user(&users, "alice").await;
    let bob = create_user(&users, "bob").await;

    let org = dir
        .create("org1", alice.id, CreateOrganizationOptions::default())
        .await
        .unwrap();

    let err = dir.add_member(404, bob.id).await.unwrap_err();
    assert_eq!(err, DirectoryError::OrganizationNotFound);

    // a user-kind account id is not an organization
    let err = dir.add_member(alice.id, bob.id).await.unwrap_err();
    assert_eq!(err, DirectoryError::OrganizationNotFound);

    let err = dir.add_member(org.id, 404).await.unwrap_err();
    assert_eq!(err, DirectoryError::AccountNotFound);
}

#[tokio::test]
#[serial]
async fn test_set_member_visibility() {
    let pool = setup_db().await;
    let users = SqliteUserStore::new(pool.clone());
    let dir = SqliteOrganizationDirectory::new(pool);

    let alice = create_user(&users, "alice").await;
    let org = dir
        .create("org1", alice.id, CreateOrganizationOptions::default())
        .await
        .unwrap();

    dir.set_member_visibility(org.id, alice.id, true)
        .await
        .unwrap();
    let membership = dir.membership(org.id, alice.id).await.unwrap().unwrap();
    assert!(membership.is_public);

    // setting the current value succeeds silently
    dir.set_member_visibility(org.id, alice.id, true)
        .await
        .unwrap();

    dir.set_member_visibility(org.id, alice.id, false)
        .await
        .unwrap();
    let membership = dir.membership(org.id, alice.id).await.unwrap().unwrap();
    assert!(!membership.is_public);

    let err = dir
        .set_member_visibility(org.id, 404, true)
        .await
        .unwrap_err();
    assert_eq!(err, DirectoryError::MembershipNotFound);
}

#[tokio::test]
#[serial]
async fn test_list_organizations() {
    let pool = setup_db().await;
    let users = SqliteUserStore::new(pool.clone());
    let dir = SqliteOrganizationDirectory::new(pool);

    let alice = create_user(&users, "alice").await;
    let bob = create_user(&users, "bob").await;

    let org1 = dir
        .create("org1", alice.id, CreateOrganizationOptions::default())
        .await
        .unwrap();
    let org2 = dir
        .create("org2", alice.id, CreateOrganizationOptions::default())
        .await
        .unwrap();
    dir.set_member_visibility(org2.id, alice.id, true)
        .await
        .unwrap();
    dir.add_member(org2.id, bob.id).await.unwrap();

    struct Test {
        name: &'static str,
        opts: ListOrganizationsOptions,
        want_org_names: Vec<&'static str>,
    }
    let tests = vec![
        Test {
            name: "only public memberships for a user",
            opts: ListOrganizationsOptions {
                member_id: alice.id,
                include_private_members: false,
            },
            want_org_names: vec!["org2"],
        },
        Test {
            name: "all memberships for a user",
            opts: ListOrganizationsOptions {
                member_id: alice.id,
                include_private_members: true,
            },
            want_org_names: vec!["org1", "org2"],
        },
        Test {
            name: "no membership for a non-existent user",
            opts: ListOrganizationsOptions {
                member_id: 404,
                include_private_members: true,
            },
            want_org_names: vec![],
        },
    ];
    for test in tests {
        let got = dir.list(test.opts).await.expect(test.name);
        let got_names: Vec<&str> = got.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(got_names, test.want_org_names, "{}", test.name);
    }

    // ascending id order and exactly-once delivery
    let got = dir
        .list(ListOrganizationsOptions {
            member_id: alice.id,
            include_private_members: true,
        })
        .await
        .unwrap();
    assert_eq!(got.len(), 2);
    assert_eq!(got[0].id, org1.id);
    assert_eq!(got[1].id, org2.id);
    assert_eq!(got[1].num_members, 2);
}

#[tokio::test]
#[serial]
async fn test_search_by_name() {
    let pool = setup_db().await;
    let users = SqliteUserStore::new(pool.clone());
    let dir = SqliteOrganizationDirectory::new(pool);

    let alice = create_user(&users, "alice").await;

    let org1 = dir
        .create(
            "org1",
            alice.id,
            CreateOrganizationOptions {
                full_name: Some("Acme Corp".to_owned()),
            },
        )
        .await
        .unwrap();
    let org2 = dir
        .create(
            "org2",
            alice.id,
            CreateOrganizationOptions {
                full_name: Some("Acme Corp 2".to_owned()),
            },
        )
        .await
        .unwrap();

    // case-insensitive match on the name column
    let (orgs, count) = dir.search_by_name("G1", 1, 1, "").await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].id, org1.id);

    let (orgs, count) = dir.search_by_name("G2", 1, 1, "").await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(orgs[0].id, org2.id);

    // case-insensitive match on the full_name column
    let (orgs, count) = dir.search_by_name("ACME", 1, 10, "").await.unwrap();
    assert_eq!(count, 2);
    assert_eq!(orgs.len(), 2);
    assert_eq!(orgs[0].id, org1.id);
    assert_eq!(orgs[1].id, org2.id);

    // total count spans all pages even when one row is returned
    let (orgs, count) = dir.search_by_name("ACME", 1, 1, "id DESC").await.unwrap();
    assert_eq!(count, 2);
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].id, org2.id);

    // a page past the end of the result set is empty, not an error
    let (orgs, count) = dir.search_by_name("ACME", 3, 2, "").await.unwrap();
    assert_eq!(count, 2);
    assert!(orgs.is_empty());

    // no match
    let (orgs, count) = dir.search_by_name("zebra", 1, 10, "").await.unwrap();
    assert_eq!(count, 0);
    assert!(orgs.is_empty());
}

#[tokio::test]
#[serial]
async fn test_count_by_user() {
    let pool = setup_db().await;
    let users = SqliteUserStore::new(pool.clone());
    let dir = SqliteOrganizationDirectory::new(pool);

    let alice = create_user(&users, "alice").await;
    let bob = create_user(&users, "bob").await;

    let org1 = dir
        .create("org1", alice.id, CreateOrganizationOptions::default())
        .await
        .unwrap();
    dir.add_member(org1.id, bob.id).await.unwrap();

    assert_eq!(dir.count_by_user(alice.id).await.unwrap(), 1);
    assert_eq!(dir.count_by_user(bob.id).await.unwrap(), 1);

    // a non-existent account simply has zero memberships
    assert_eq!(dir.count_by_user(404).await.unwrap(), 0);
}

#[tokio::test]
#[serial]
async fn test_get_by_name() {
    let pool = setup_db().await;
    let users = SqliteUserStore::new(pool.clone());
    let dir = SqliteOrganizationDirectory::new(pool);

    let alice = create_user(&users, "alice").await;
    let org = dir
        .create(
            "org1",
            alice.id,
            CreateOrganizationOptions {
                full_name: Some("Acme Corp".to_owned()),
            },
        )
        .await
        .unwrap();

    let got = dir.get_by_name("org1").await.unwrap();
    assert_eq!(got.id, org.id);
    assert_eq!(got.full_name, "Acme Corp");
    assert_eq!(got.num_members, 1);

    let err = dir.get_by_name("missing").await.unwrap_err();
    assert_eq!(err, DirectoryError::OrganizationNotFound);

    // a user account name does not resolve to an organization
    let err = dir.get_by_name("alice").await.unwrap_err();
    assert_eq!(err, DirectoryError::OrganizationNotFound);
}

#[tokio::test]
#[serial]
async fn test_remove_member() {
    let pool = setup_db().await;
    let users = SqliteUserStore::new(pool.clone());
    let dir = SqliteOrganizationDirectory::new(pool);

    let alice = create_user(&users, "alice").await;
    let bob = create_user(&users, "bob").await;

    let org = dir
        .create("org1", alice.id, CreateOrganizationOptions::default())
        .await
        .unwrap();
    dir.add_member(org.id, bob.id).await.unwrap();
    assert!(dir.has_member(org.id, bob.id).await.unwrap());

    dir.remove_member(org.id, bob.id).await.unwrap();
    assert!(!dir.has_member(org.id, bob.id).await.unwrap());
    assert_eq!(dir.count_by_user(bob.id).await.unwrap(), 0);

    let err = dir.remove_member(org.id, bob.id).await.unwrap_err();
    assert_eq!(err, DirectoryError::MembershipNotFound);
}

#[tokio::test]
#[serial]
async fn test_user_store_create_and_find() {
    let pool = setup_db().await;
    let users = SqliteUserStore::new(pool);

    let alice = users
        .create(
            "alice",
            "alice@example.com",
            CreateUserOptions {
                full_name: Some("Alice Liddell".to_owned()),
            },
        )
        .await
        .unwrap();
    assert!(alice.id > 0);
    assert_eq!(alice.full_name, "Alice Liddell");
    assert!(!alice.is_organization());

    let found = users.find_by_id(alice.id).await.unwrap().unwrap();
    assert_eq!(found.name, "alice");

    assert!(users.find_by_id(404).await.unwrap().is_none());

    let err = users
        .create("alice", "other@example.com", CreateUserOptions::default())
        .await
        .unwrap_err();
    assert_eq!(err, DirectoryError::NameTaken);

    let err = users
        .create("carol", "not-an-email", CreateUserOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, DirectoryError::InvalidEmail(_)));
}
