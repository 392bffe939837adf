//! Configuration management for the Votecast application.
//!
//! Loads configuration from environment variables with sensible defaults.
//! A `.env` file in the working directory is honored when present.

use std::env;
use votecast_postgres::PostgresConfig;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// `PostgreSQL` configuration
    pub postgres: PostgresConfig,
    /// Platform billing configuration
    pub platform: PlatformConfig,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Platform billing configuration
#[derive(Debug, Clone, Copy)]
pub struct PlatformConfig {
    /// Percentage of each order the platform keeps
    pub fee_percent: u8,
}

impl Config {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        // A missing .env file is the normal production case.
        let _ = dotenvy::dotenv();

        Self {
            postgres: PostgresConfig::from_env(),
            platform: PlatformConfig {
                fee_percent: env::var("PLATFORM_FEE_PERCENT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
            },
            log_level: env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }
}
