// src/config.rs

use std::env;
use std::net::SocketAddr;

use dotenvy::dotenv;

use crate::models::grade::RoundingMethod;

/// Rounding method used by `finalize` when the request does not name one.
pub const DEFAULT_ROUNDING_METHOD: RoundingMethod = RoundingMethod::Round;

const DEFAULT_MAGIC_TOKEN_TTL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres connection string. Without it the service runs on the in-memory store.
    pub database_url: Option<String>,
    pub jwt_secret: String,
    /// Lifetime of the magic links handed to students.
    pub magic_token_ttl: u64,
    pub bind_addr: SocketAddr,
    pub rust_log: String,
    pub log_dir: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv().ok();

        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.is_empty());

        let jwt_secret = env::var("JWT_SECRET")
            .expect("JWT_SECRET must be set");

        let magic_token_ttl = env::var("MAGIC_TOKEN_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_MAGIC_TOKEN_TTL_SECS);

        let bind_addr = env::var("BIND_ADDR")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

        let rust_log = env::var("RUST_LOG")
            .unwrap_or_else(|_| "info".to_string());

        let log_dir = env::var("LOG_DIR")
            .unwrap_or_else(|_| "logs".to_string());

        Self {
            database_url,
            jwt_secret,
            magic_token_ttl,
            bind_addr,
            rust_log,
            log_dir,
        }
    }

    /// Configuration for tests and local tooling: in-memory store, fixed secret.
    pub fn for_testing(jwt_secret: &str) -> Self {
        Self {
            database_url: None,
            jwt_secret: jwt_secret.to_string(),
            magic_token_ttl: 600,
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            rust_log: "error".to_string(),
            log_dir: "logs".to_string(),
        }
    }
}
