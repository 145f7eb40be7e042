pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod proxy;
pub mod rate_limit;

use std::sync::Arc;

use actix_web::HttpResponse;
use sqlx::postgres::PgPoolOptions;

pub use config::Settings;
pub use error::{AppError, AuthError};
pub type Result<T> = std::result::Result<T, AppError>;

pub use auth::{AuthService, Claims, PasswordHasher, RequireAuth, TokenService};
pub use db::{Account, CredentialStore, MemoryStore, PgStore};
pub use proxy::GenerationClient;
pub use rate_limit::{RateLimit, RateLimiter};

/// Health check endpoint handler
/// Returns a JSON response with server status and timestamp
pub async fn health_check() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Application state shared across all request handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Settings>,
    pub auth: Arc<AuthService>,
    pub tokens: TokenService,
    pub generation: Arc<GenerationClient>,
}

impl AppState {
    /// Connect to Postgres, run pending migrations and wire up the services.
    pub async fn new(config: Settings) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .connect(&config.database.url)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        let store: Arc<dyn CredentialStore> = Arc::new(PgStore::new(Arc::new(pool)));
        Ok(Self::with_store(config, store))
    }

    /// Wire up the services against any credential store. Used by tests and
    /// database-less development with [`MemoryStore`].
    pub fn with_store(config: Settings, store: Arc<dyn CredentialStore>) -> Self {
        let tokens = TokenService::new(config.auth.jwt_secret.clone());
        let hasher = PasswordHasher::new(config.auth.bcrypt_cost);
        let auth = Arc::new(AuthService::new(store, hasher, tokens.clone()));
        let generation = Arc::new(GenerationClient::new(&config.generation));

        Self {
            config: Arc::new(config),
            auth,
            tokens,
            generation,
        }
    }
}
