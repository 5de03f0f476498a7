mod repository;
mod types;

pub use repository::{
    CreateOrganizationOptions, CreateUserOptions, ListOrganizationsOptions,
    OrganizationDirectory, UserStore,
};
pub use types::{Account, AccountKind, Membership, Organization};

#[cfg(feature = "mocks")]
mod mocks;

#[cfg(feature = "mocks")]
pub use mocks::MockDirectory;
