use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{config::Config, error::AppError, utils::hash::hash_password};

/// Admin credential taken from configuration.
/// Only the Argon2 hash of the password is kept after startup.
#[derive(Debug)]
pub struct AdminCredentials {
    pub username: String,
    pub password_hash: String,
}

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub admin: Arc<AdminCredentials>,
}

impl AppState {
    pub fn new(pool: SqlitePool, config: Config) -> Result<Self, AppError> {
        let admin = AdminCredentials {
            username: config.admin_username.clone(),
            password_hash: hash_password(&config.admin_password)?,
        };

        Ok(Self {
            pool,
            config,
            admin: Arc::new(admin),
        })
    }
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<AdminCredentials> {
    fn from_ref(state: &AppState) -> Self {
        state.admin.clone()
    }
}
