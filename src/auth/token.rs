use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

/// Fixed token lifetime of 7 days.
pub const TOKEN_LIFETIME_SECS: i64 = 7 * 24 * 3600;

/// Claim set carried by every issued token.
///
/// `role` is copied from the account at issuance and may go stale; the
/// verifier trusts the signature and never re-reads the store, so a changed
/// or deleted account keeps its claims until `exp`. That inconsistency
/// window is bounded by the token lifetime and accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256-signed bearer tokens.
#[derive(Clone)]
pub struct TokenService {
    secret: Option<String>,
}

impl TokenService {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    /// Sign a claim set for an account. An unconfigured secret is a fatal
    /// configuration fault on this path, not something to paper over.
    pub fn issue(&self, account_id: Uuid, role: Option<&str>) -> Result<String, AppError> {
        let secret = self.secret.as_deref().ok_or_else(|| {
            error!("refusing to issue token: signing secret is not configured");
            AppError::Configuration("signing secret is not configured".to_string())
        })?;

        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: account_id.to_string(),
            role: role.map(str::to_owned),
            iat: now,
            exp: now + TOKEN_LIFETIME_SECS,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| AppError::Internal(e.to_string()))
    }

    /// Validate a presented token and recover its claims. Malformed tokens,
    /// bad signatures, expired tokens and a missing secret all surface as
    /// the same generic 401 to the client; only the logs know which.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let Some(secret) = self.secret.as_deref() else {
            error!("cannot verify token: signing secret is not configured");
            return Err(AuthError::InvalidToken);
        };

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<Claims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|e| {
            debug!("token rejected: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => AuthError::InvalidToken,
            }
        })
    }
}
