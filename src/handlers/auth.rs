// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::{
    config::Config,
    error::AppError,
    state::AdminCredentials,
    utils::{hash::verify_password, jwt::sign_jwt},
};

/// DTO for admin login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Authenticates the admin and returns a JWT token.
///
/// The credential comes from configuration; the password is checked
/// against the Argon2 hash computed at startup.
pub async fn login(
    State(config): State<Config>,
    State(admin): State<Arc<AdminCredentials>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Err(validation_errors) = payload.validate() {
        return Err(AppError::BadRequest(validation_errors.to_string()));
    }

    let is_valid = payload.username == admin.username
        && verify_password(&payload.password, &admin.password_hash)?;

    if !is_valid {
        tracing::warn!("Failed admin login for '{}'", payload.username);
        return Err(AppError::AuthError("Invalid credentials".to_string()));
    }

    let token = sign_jwt(
        &admin.username,
        "admin",
        &config.jwt_secret,
        config.jwt_expiration,
    )?;

    tracing::info!("Admin '{}' logged in", admin.username);

    Ok(Json(json!({
        "token": token,
        "type": "Bearer",
        "expires_in": config.jwt_expiration,
    })))
}
