// src/utils/gate.rs

//! One-attempt-per-IP gating.
//!
//! This is advisory only: anyone can change their address or send their
//! own `X-Forwarded-For` header. It keeps honest users from retaking the
//! quiz and is not an access control.

use std::{convert::Infallible, net::SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::request::Parts,
};
use chrono::Utc;
use sqlx::{SqliteConnection, SqliteExecutor};

/// Address the request came from.
///
/// The first `X-Forwarded-For` entry wins, then the socket peer address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl<S> FromRequestParts<S> for ClientIp
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|ip| !ip.is_empty());

        if let Some(ip) = forwarded {
            return Ok(ClientIp(ip.to_string()));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());

        Ok(ClientIp(peer))
    }
}

/// Outcome of trying to take the lock for an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOutcome {
    Acquired,
    AlreadyLocked,
}

/// Whether `ip` already finished the quiz.
pub async fn is_locked<'e, E>(executor: E, ip: &str) -> Result<bool, sqlx::Error>
where
    E: SqliteExecutor<'e>,
{
    let row: Option<(i64,)> =
        sqlx::query_as("SELECT submission_id FROM ip_locks WHERE ip_address = $1")
            .bind(ip)
            .fetch_optional(executor)
            .await?;

    Ok(row.is_some())
}

/// Records that `ip` finished the quiz with `submission_id`.
///
/// Must run in the same transaction as the submission insert. The primary
/// key on `ip_address` turns a concurrent second attempt into
/// `AlreadyLocked`, and the caller rolls back.
pub async fn lock(
    conn: &mut SqliteConnection,
    ip: &str,
    submission_id: i64,
) -> Result<LockOutcome, sqlx::Error> {
    let result =
        sqlx::query("INSERT INTO ip_locks (ip_address, submission_id, locked_at) VALUES ($1, $2, $3)")
            .bind(ip)
            .bind(submission_id)
            .bind(Utc::now())
            .execute(conn)
            .await;

    match result {
        Ok(_) => Ok(LockOutcome::Acquired),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Ok(LockOutcome::AlreadyLocked)
        }
        Err(e) => Err(e),
    }
}
