use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::models::Account;
use crate::db::CredentialStore;
use crate::error::AppError;

/// In-memory credential store for tests and database-less development.
///
/// The whole map sits behind one async lock, so the existence check and the
/// insert are a single atomic step and duplicate emails cannot race past
/// each other.
#[derive(Default)]
pub struct MemoryStore {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        role: Option<&str>,
    ) -> Result<Account, AppError> {
        let mut accounts = self.accounts.write().await;
        if accounts.contains_key(email) {
            return Err(AppError::DuplicateEmail);
        }
        let account = Account::new(email.to_owned(), password_hash.to_owned(), role.map(str::to_owned));
        accounts.insert(email.to_owned(), account.clone());
        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        Ok(self.accounts.read().await.get(email).cloned())
    }
}
