//! Credential store for VetBridge accounts.
//!
//! Email uniqueness is a store-level guarantee: concurrent registrations
//! of the same address yield exactly one success, whichever backend is in
//! use.

pub mod memory;
pub mod models;
pub mod postgres;

pub use memory::MemoryStore;
pub use models::Account;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::error::AppError;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persist a new account. Fails with `AppError::DuplicateEmail` when the
    /// email is already taken, leaving no partial record behind.
    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        role: Option<&str>,
    ) -> Result<Account, AppError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError>;
}
