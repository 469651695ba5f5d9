// src/config.rs

use std::{env, fmt::Display, str::FromStr};

use dotenvy::dotenv;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Lifetime of admin bearer tokens, in seconds.
    pub jwt_expiration: u64,
    /// Lifetime of the ticket handed out when a quiz starts, in seconds.
    pub quiz_ticket_ttl: u64,
    pub rust_log: String,
    pub log_dir: String,
    pub admin_username: String,
    pub admin_password: String,
    /// One attempt per client IP when enabled.
    pub ip_lock_enabled: bool,
    pub max_upload_bytes: usize,
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://quiz.db".to_string());

        let jwt_secret = env::var("SECRET_KEY").expect("SECRET_KEY must be set");

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let log_dir = env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string());

        let admin_username = env::var("ADMIN_USERNAME").unwrap_or_else(|_| {
            tracing::warn!("ADMIN_USERNAME not set, using default");
            "admin".to_string()
        });

        let admin_password = env::var("ADMIN_PASSWORD").unwrap_or_else(|_| {
            tracing::warn!("ADMIN_PASSWORD not set, using the default password");
            "admin123".to_string()
        });

        Self {
            database_url,
            jwt_secret,
            jwt_expiration: parse_or("JWT_EXPIRATION", 3600),
            quiz_ticket_ttl: parse_or("QUIZ_TICKET_TTL", 7200),
            rust_log,
            log_dir,
            admin_username,
            admin_password,
            ip_lock_enabled: parse_flag("IP_LOCK_ENABLED", true),
            max_upload_bytes: parse_or("MAX_UPLOAD_BYTES", 5 * 1024 * 1024),
            port: parse_or("PORT", 3000),
        }
    }
}

fn parse_or<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("Invalid {key} value '{raw}': {e}")),
        Err(_) => {
            tracing::info!("{key} not set, using default: {default}");
            default
        }
    }
}

fn parse_flag(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(raw) => matches!(
            raw.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        Err(_) => default,
    }
}
