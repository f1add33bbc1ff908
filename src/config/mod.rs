//! Configuration module for the lab portal backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::{AddrParseError, SocketAddr};
use std::path::PathBuf;

/// Default lifetime of a member token.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 480;

/// Shortest signing secret accepted without a warning.
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key guarding the admin API (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy user directory index
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Secret signing member tokens; a random one is used when unset
    pub jwt_secret: Option<String>,
    /// Member token lifetime in minutes
    pub token_ttl_minutes: i64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AddrParseError> {
        dotenvy::dotenv().ok();

        let api_psk = env::var("LAB_API_PSK").ok().filter(|k| !k.is_empty());

        let db_path = env::var("LAB_DB_PATH")
            .unwrap_or_else(|_| "./data/lab.sqlite".to_string())
            .into();

        let index_path = env::var("LAB_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr = env::var("LAB_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()?;

        let log_level = env::var("LAB_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let jwt_secret = env::var("LAB_JWT_SECRET").ok().filter(|s| !s.is_empty());

        let token_ttl_minutes = env::var("LAB_TOKEN_TTL_MINUTES")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|m: &i64| *m > 0)
            .unwrap_or(DEFAULT_TOKEN_TTL_MINUTES);

        Ok(Self {
            api_psk,
            db_path,
            index_path,
            bind_addr,
            log_level,
            jwt_secret,
            token_ttl_minutes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Both cases share one test so they never race on the process environment.
    #[test]
    fn test_config_from_env() {
        env::remove_var("LAB_API_PSK");
        env::remove_var("LAB_DB_PATH");
        env::remove_var("LAB_INDEX_PATH");
        env::remove_var("LAB_BIND_ADDR");
        env::remove_var("LAB_LOG_LEVEL");
        env::remove_var("LAB_JWT_SECRET");
        env::remove_var("LAB_TOKEN_TTL_MINUTES");

        let config = Config::from_env().unwrap();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/lab.sqlite"));
        assert_eq!(config.index_path, PathBuf::from("./data/index"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(config.jwt_secret.is_none());
        assert_eq!(config.token_ttl_minutes, DEFAULT_TOKEN_TTL_MINUTES);

        env::set_var("LAB_TOKEN_TTL_MINUTES", "-5");
        assert_eq!(
            Config::from_env().unwrap().token_ttl_minutes,
            DEFAULT_TOKEN_TTL_MINUTES
        );
        env::set_var("LAB_TOKEN_TTL_MINUTES", "30");
        assert_eq!(Config::from_env().unwrap().token_ttl_minutes, 30);
        env::remove_var("LAB_TOKEN_TTL_MINUTES");

        env::set_var("LAB_BIND_ADDR", "not-an-address");
        assert!(Config::from_env().is_err());
        env::remove_var("LAB_BIND_ADDR");
    }
}
