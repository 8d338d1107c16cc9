use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use super::{Account, AccountStore, NewAccount, RoleRecord, StoreError};

#[derive(Debug)]
struct StoredAccount {
    account: Account,
    role_id: i64,
}

/// In-process account store; ids start at 1 like a fresh sequence.
#[derive(Clone, Debug, Default)]
pub struct MemoryAccountStore {
    accounts: Arc<Mutex<Vec<StoredAccount>>>,
}

impl MemoryAccountStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<StoredAccount>>, StoreError> {
        self.accounts
            .lock()
            .map_err(|_| StoreError::Unavailable("account store lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn find_account_by_identity(&self, email: &str) -> Result<Vec<Account>, StoreError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|stored| stored.account.email == email)
            .map(|stored| stored.account.clone())
            .collect())
    }

    async fn find_role_by_account_id(&self, account_id: i64) -> Result<Vec<RoleRecord>, StoreError> {
        Ok(self
            .lock()?
            .iter()
            .filter(|stored| stored.account.account_id == account_id)
            .map(|stored| RoleRecord {
                role_id: stored.role_id,
            })
            .collect())
    }

    async fn create_account(&self, account: NewAccount) -> Result<i64, StoreError> {
        let mut accounts = self.lock()?;
        if accounts
            .iter()
            .any(|stored| stored.account.email == account.email)
        {
            return Err(StoreError::Duplicate);
        }

        let account_id = i64::try_from(accounts.len())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?
            + 1;
        accounts.push(StoredAccount {
            account: Account {
                account_id,
                email: account.email,
                password_hash: account.password_hash,
            },
            role_id: account.role.id(),
        });

        Ok(account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storefront::accounts::Role;

    fn new_account(email: &str, role: Role) -> NewAccount {
        NewAccount {
            name: "Test User".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role,
            store_name: None,
            phone_number: None,
        }
    }

    #[tokio::test]
    async fn create_then_find() {
        let store = MemoryAccountStore::new();
        let id = store
            .create_account(new_account("user@example.com", Role::Customer))
            .await
            .unwrap();
        assert_eq!(id, 1);

        let found = store.find_account_by_identity("user@example.com").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].account_id, 1);

        let roles = store.find_role_by_account_id(1).await.unwrap();
        assert_eq!(roles, vec![RoleRecord { role_id: 3 }]);
    }

    #[tokio::test]
    async fn lookup_is_exact() {
        let store = MemoryAccountStore::new();
        store
            .create_account(new_account("user@example.com", Role::Seller))
            .await
            .unwrap();
        assert!(store
            .find_account_by_identity("USER@example.com")
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryAccountStore::new();
        store
            .create_account(new_account("user@example.com", Role::Customer))
            .await
            .unwrap();
        assert!(matches!(
            store
                .create_account(new_account("user@example.com", Role::Seller))
                .await,
            Err(StoreError::Duplicate)
        ));
    }
}
