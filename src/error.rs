use std::collections::HashMap;

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use validator::ValidationErrors;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    #[error("validation failed")]
    Validation(HashMap<String, String>),

    #[error("email already in use")]
    DuplicateEmail,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("database error: {0}")]
    Database(String),

    #[error("generation request failed: {0}")]
    Upstream(String),

    #[error("internal server error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("missing bearer token")]
    MissingToken,

    #[error("invalid token")]
    InvalidToken,

    #[error("token expired")]
    TokenExpired,

    #[error("rate limited")]
    RateLimited { limit: u32, reset_secs: u64 },
}

impl AppError {
    /// Message safe to return to clients. Internal causes stay in the logs.
    fn public_message(&self) -> &'static str {
        match self {
            AppError::Auth(AuthError::InvalidCredentials) => "invalid credentials",
            // A missing, malformed, tampered or expired token all read the
            // same from the outside so the failing check is not leaked.
            AppError::Auth(AuthError::MissingToken)
            | AppError::Auth(AuthError::InvalidToken)
            | AppError::Auth(AuthError::TokenExpired) => "invalid token",
            AppError::Auth(AuthError::RateLimited { .. }) => "too many requests",
            AppError::Validation(_) => "validation failed",
            AppError::DuplicateEmail => "email already in use",
            AppError::Configuration(_) => "server configuration error",
            AppError::Upstream(_) => "generation service unavailable",
            AppError::Database(_) | AppError::Internal(_) => "internal server error",
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => AppError::DuplicateEmail,
            _ => AppError::Database(err.to_string()),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errs: ValidationErrors) -> Self {
        let fields = errs
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let reason = errors
                    .first()
                    .and_then(|e| e.message.clone())
                    .map(|m| m.into_owned())
                    .unwrap_or_else(|| "invalid value".to_string());
                (field.to_string(), reason)
            })
            .collect();
        AppError::Validation(fields)
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Auth(e) => match e {
                AuthError::InvalidCredentials
                | AuthError::MissingToken
                | AuthError::InvalidToken
                | AuthError::TokenExpired => StatusCode::UNAUTHORIZED,
                AuthError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            },
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateEmail => StatusCode::CONFLICT,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::Configuration(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("request failed: {}", self);
        }

        let body = match self {
            AppError::Validation(fields) => json!({
                "error": self.public_message(),
                "fields": fields,
            }),
            _ => json!({ "error": self.public_message() }),
        };

        let mut builder = HttpResponse::build(status);
        if let AppError::Auth(AuthError::RateLimited { limit, reset_secs }) = self {
            builder
                .insert_header(("RateLimit-Limit", *limit))
                .insert_header(("RateLimit-Remaining", 0u32))
                .insert_header(("RateLimit-Reset", *reset_secs))
                .insert_header(("Retry-After", *reset_secs));
        }
        builder.json(body)
    }
}
