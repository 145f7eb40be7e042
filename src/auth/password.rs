use tokio::task;

use crate::error::AppError;

/// bcrypt wrapper around a configurable cost factor.
///
/// Hashing and verification are deliberately slow, so both run on blocking
/// threads and suspend only the request that asked for them. Plaintext
/// passwords never appear in logs or return values.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    /// Hash a plaintext password. The salt is random and embedded in the
    /// output, so two hashes of the same password differ.
    pub async fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        let cost = self.cost;
        let plaintext = plaintext.to_owned();
        task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(|e| AppError::Internal(e.to_string()))
    }

    pub async fn verify(&self, plaintext: &str, hashed: &str) -> Result<bool, AppError> {
        let plaintext = plaintext.to_owned();
        let hashed = hashed.to_owned();
        task::spawn_blocking(move || bcrypt::verify(plaintext, &hashed))
            .await
            .map_err(|e| AppError::Internal(e.to_string()))?
            .map_err(|e| AppError::Internal(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // minimum bcrypt cost keeps the tests fast
    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[tokio::test]
    async fn test_hashing_is_salted() {
        let hasher = hasher();
        let first = hasher.hash("secret1").await.unwrap();
        let second = hasher.hash("secret1").await.unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("secret1", &first).await.unwrap());
        assert!(hasher.verify("secret1", &second).await.unwrap());
    }

    #[tokio::test]
    async fn test_wrong_password_fails_verification() {
        let hasher = hasher();
        let hash = hasher.hash("secret1").await.unwrap();
        assert!(!hasher.verify("secret2", &hash).await.unwrap());
        assert!(!hasher.verify("", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_hash_never_contains_plaintext() {
        let hasher = hasher();
        let hash = hasher.hash("hunter2-plaintext").await.unwrap();
        assert!(!hash.contains("hunter2"));
    }
}
