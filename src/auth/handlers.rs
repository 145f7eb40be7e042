use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CredentialsRequest {
    #[validate(email(message = "must be a well-formed email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "must be at least 6 characters"))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub id: Uuid,
    pub email: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

pub async fn register(
    req: web::Json<CredentialsRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    info!("registration request for {}", req.email);
    let account = state.auth.register(&req.email, &req.password).await?;

    Ok(HttpResponse::Ok().json(RegisterResponse {
        id: account.id,
        email: account.email,
    }))
}

pub async fn login(
    req: web::Json<CredentialsRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    req.validate()?;

    match state.auth.login(&req.email, &req.password).await {
        Ok(token) => {
            info!("login successful for {}", req.email);
            Ok(HttpResponse::Ok().json(LoginResponse { token }))
        }
        Err(e) => {
            warn!("login failed for {}: {}", req.email, e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_shape_validation() {
        let ok = CredentialsRequest {
            email: "vet@example.com".to_string(),
            password: "secret1".to_string(),
        };
        assert!(ok.validate().is_ok());

        let bad_email = CredentialsRequest {
            email: "not-an-email".to_string(),
            password: "secret1".to_string(),
        };
        let errs = bad_email.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("email"));

        let short_password = CredentialsRequest {
            email: "vet@example.com".to_string(),
            password: "five5".to_string(),
        };
        let errs = short_password.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("password"));
    }
}
