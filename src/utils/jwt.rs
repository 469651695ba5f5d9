// src/utils/jwt.rs

use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::{config::Config, error::AppError};

/// Admin JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the admin username.
    pub sub: String,
    /// Always 'admin' for tokens issued by the login route.
    pub role: String,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

/// Ticket handed out when a quiz starts.
///
/// Pins the question set that will be scored and records when the attempt
/// began, so the time taken can be computed on submission.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct QuizTicket {
    pub set_id: i64,
    /// Issued-at, Unix timestamp.
    pub iat: usize,
    pub exp: usize,
}

pub fn now_unix() -> Result<usize, AppError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?
        .as_secs() as usize)
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String, AppError> {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

fn verify<T: DeserializeOwned>(token: &str, secret: &str, what: &str) -> Result<T, AppError> {
    let token_data = decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError(format!("Invalid {}", what)))?;

    Ok(token_data.claims)
}

/// Signs a new admin JWT.
pub fn sign_jwt(
    username: &str,
    role: &str,
    secret: &str,
    expiration_seconds: u64,
) -> Result<String, AppError> {
    let claims = Claims {
        sub: username.to_owned(),
        role: role.to_owned(),
        exp: now_unix()? + expiration_seconds as usize,
    };

    sign(&claims, secret)
}

/// Verifies and decodes an admin JWT string.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    verify(token, secret, "token")
}

/// Issues a quiz ticket for `set_id`, valid for `ttl_seconds`.
pub fn issue_quiz_ticket(set_id: i64, secret: &str, ttl_seconds: u64) -> Result<String, AppError> {
    let iat = now_unix()?;
    let ticket = QuizTicket {
        set_id,
        iat,
        exp: iat + ttl_seconds as usize,
    };

    sign(&ticket, secret)
}

pub fn verify_quiz_ticket(token: &str, secret: &str) -> Result<QuizTicket, AppError> {
    verify(token, secret, "or expired quiz token, please restart the quiz")
}

/// Axum Middleware: Authentication.
///
/// Intercepts requests, validates the 'Authorization: Bearer <token>' header.
/// If valid, injects `Claims` into the request extensions for handlers to use.
/// If invalid, returns 401 Unauthorized.
pub async fn auth_middleware(
    State(config): State<Config>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header {
        Some(header) if header.starts_with("Bearer ") => &header[7..],
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    match verify_jwt(token, &config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(next.run(req).await)
        }
        Err(_) => Err(StatusCode::UNAUTHORIZED),
    }
}

/// Axum Middleware: Admin Authorization.
///
/// Must be used AFTER `auth_middleware`. Checks if the injected `Claims` has 'admin' role.
/// If not, returns 403 Forbidden.
pub async fn admin_middleware(req: Request<Body>, next: Next) -> Result<Response, StatusCode> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or(StatusCode::UNAUTHORIZED)?;

    if claims.role != "admin" {
        return Err(StatusCode::FORBIDDEN);
    }

    Ok(next.run(req).await)
}
