use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::models::Account;
use crate::db::CredentialStore;
use crate::error::AppError;

/// Postgres-backed credential store. The `accounts.email` unique constraint
/// is what makes concurrent registrations of one address resolve to a single
/// winner; the insert either commits whole or not at all.
pub struct PgStore {
    pool: Arc<PgPool>,
}

impl PgStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn create_account(
        &self,
        email: &str,
        password_hash: &str,
        role: Option<&str>,
    ) -> Result<Account, AppError> {
        let account = Account::new(email.to_owned(), password_hash.to_owned(), role.map(str::to_owned));

        let account = sqlx::query_as::<_, Account>(
            r#"
            INSERT INTO accounts (id, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, role, created_at
            "#,
        )
        .bind(account.id)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(&account.role)
        .bind(account.created_at)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(account)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, AppError> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, password_hash, role, created_at FROM accounts WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(account)
    }
}
