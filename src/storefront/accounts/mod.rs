//! User account storage.
//!
//! The login flow only needs two lookups (account by email, role by account
//! id); registration adds one insert. Postgres backs the service, the memory
//! store backs tests.

mod memory;
mod postgres;

pub use memory::MemoryAccountStore;
pub use postgres::{PgAccountStore, SCHEMA_SQL};

use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    Duplicate,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("account store unavailable: {0}")]
    Unavailable(String),
}

/// Roles shipped with the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    Seller,
    Customer,
}

impl Role {
    #[must_use]
    pub const fn id(self) -> i64 {
        match self {
            Self::Admin => 1,
            Self::Seller => 2,
            Self::Customer => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub account_id: i64,
    pub email: String,
    pub password_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleRecord {
    pub role_id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub store_name: Option<String>,
    pub phone_number: Option<String>,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Accounts whose email equals `email` exactly (zero or one in practice).
    async fn find_account_by_identity(&self, email: &str) -> Result<Vec<Account>, StoreError>;

    /// Role rows attached to an account.
    async fn find_role_by_account_id(&self, account_id: i64) -> Result<Vec<RoleRecord>, StoreError>;

    /// Insert the profile and login rows for a new account, returning the account id.
    async fn create_account(&self, account: NewAccount) -> Result<i64, StoreError>;

    /// Connectivity probe used by `/health`.
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
