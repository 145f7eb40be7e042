use std::sync::Arc;

use tracing::info;

use crate::auth::password::PasswordHasher;
use crate::auth::token::TokenService;
use crate::db::{Account, CredentialStore};
use crate::error::{AppError, AuthError};

/// Orchestrates the credential store, password hasher and token issuer for
/// registration and login.
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    hasher: PasswordHasher,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(store: Arc<dyn CredentialStore>, hasher: PasswordHasher, tokens: TokenService) -> Self {
        Self { store, hasher, tokens }
    }

    /// Create a new account from already shape-validated credentials.
    /// Duplicate emails surface as `AppError::DuplicateEmail`.
    pub async fn register(&self, email: &str, password: &str) -> Result<Account, AppError> {
        let hash = self.hasher.hash(password).await?;
        let account = self.store.create_account(email, &hash, None).await?;
        info!("registered account {}", account.id);
        Ok(account)
    }

    /// Verify credentials and issue a token. Unknown email and wrong
    /// password are indistinguishable: same error, and the unknown-email
    /// path burns a bcrypt round so the timing matches a failed verify.
    pub async fn login(&self, email: &str, password: &str) -> Result<String, AppError> {
        let account = match self.store.find_by_email(email).await? {
            Some(account) => account,
            None => {
                let _ = self.hasher.hash(password).await;
                return Err(AuthError::InvalidCredentials.into());
            }
        };

        if !self.hasher.verify(password, &account.password_hash).await? {
            return Err(AuthError::InvalidCredentials.into());
        }

        self.tokens.issue(account.id, account.role.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use async_trait::async_trait;

    /// Store double whose every call fails, for exercising error paths the
    /// in-memory store cannot produce.
    struct FailingStore;

    #[async_trait]
    impl CredentialStore for FailingStore {
        async fn create_account(
            &self,
            _email: &str,
            _password_hash: &str,
            _role: Option<&str>,
        ) -> Result<Account, AppError> {
            Err(AppError::Database("connection refused".to_string()))
        }

        async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, AppError> {
            Err(AppError::Database("connection refused".to_string()))
        }
    }

    fn service_with(store: Arc<dyn CredentialStore>) -> AuthService {
        AuthService::new(
            store,
            PasswordHasher::new(4),
            TokenService::new(Some("test_secret".to_string())),
        )
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_plaintext() {
        let store = Arc::new(MemoryStore::new());
        let auth = service_with(store.clone());

        let account = auth.register("vet@example.com", "secret1").await.unwrap();
        assert_eq!(account.email, "vet@example.com");
        assert!(account.role.is_none());

        let stored = store.find_by_email("vet@example.com").await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "secret1");
        assert!(stored.password_hash.starts_with("$2"));
    }

    #[tokio::test]
    async fn test_login_round_trip() {
        let store = Arc::new(MemoryStore::new());
        let auth = service_with(store);

        let account = auth.register("vet@example.com", "secret1").await.unwrap();
        let token = auth.login("vet@example.com", "secret1").await.unwrap();

        let tokens = TokenService::new(Some("test_secret".to_string()));
        let claims = tokens.verify(&token).unwrap();
        assert_eq!(claims.sub, account.id.to_string());
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_look_alike() {
        let store = Arc::new(MemoryStore::new());
        let auth = service_with(store);
        auth.register("vet@example.com", "secret1").await.unwrap();

        let unknown = auth.login("nobody@example.com", "secret1").await.unwrap_err();
        let wrong = auth.login("vet@example.com", "wrong-password").await.unwrap_err();

        assert!(matches!(unknown, AppError::Auth(AuthError::InvalidCredentials)));
        assert!(matches!(wrong, AppError::Auth(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_login_carries_role_into_token() {
        let store = Arc::new(MemoryStore::new());
        let hash = PasswordHasher::new(4).hash("secret1").await.unwrap();
        store
            .create_account("admin@example.com", &hash, Some("admin"))
            .await
            .unwrap();

        let auth = service_with(store);
        let token = auth.login("admin@example.com", "secret1").await.unwrap();

        let claims = TokenService::new(Some("test_secret".to_string()))
            .verify(&token)
            .unwrap();
        assert_eq!(claims.role.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_store_failure_is_not_invalid_credentials() {
        let auth = service_with(Arc::new(FailingStore));
        let err = auth.login("vet@example.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AppError::Database(_)));
    }

    #[tokio::test]
    async fn test_login_without_secret_is_configuration_fault() {
        let store = Arc::new(MemoryStore::new());
        let hash = PasswordHasher::new(4).hash("secret1").await.unwrap();
        store.create_account("vet@example.com", &hash, None).await.unwrap();

        let auth = AuthService::new(store, PasswordHasher::new(4), TokenService::new(None));
        let err = auth.login("vet@example.com", "secret1").await.unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }
}
