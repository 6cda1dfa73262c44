//! Configuration module for environment variables and application settings

use anyhow::{Result, anyhow};
use once_cell::sync::Lazy;
use std::env;
use url::Url;

/// Global application configuration loaded from environment variables.
/// Missing secrets or an unparseable origin abort startup; the process
/// must not serve traffic half-configured.
pub static CONFIG: Lazy<Config> = Lazy::new(|| {
    Config::from_env().expect("Failed to load configuration from environment")
});

#[derive(Debug, Clone)]
pub struct Config {
    /// Secret keying the magic-link payload codec
    pub magic_link_secret: String,

    /// Secret keying the session cookie codec (independent of the link secret)
    pub session_secret: String,

    /// Externally reachable origin magic links point back at
    pub origin: Url,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Server configuration
    pub server: ServerConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let origin = env::var("ORIGIN")
            .map_err(|_| anyhow!("ORIGIN environment variable is required"))?;
        let origin = Url::parse(&origin)
            .map_err(|e| anyhow!("ORIGIN must be an absolute URL: {}", e))?;

        Ok(Self {
            magic_link_secret: env::var("MAGIC_LINK_SECRET")
                .map_err(|_| anyhow!("MAGIC_LINK_SECRET environment variable is required"))?,

            session_secret: env::var("SESSION_SECRET")
                .map_err(|_| anyhow!("SESSION_SECRET environment variable is required"))?,

            origin,

            database: DatabaseConfig {
                url: env::var("DATABASE_URL")
                    .map_err(|_| anyhow!("DATABASE_URL environment variable is required"))?,
            },

            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port: env::var("SERVER_PORT")
                    .unwrap_or_else(|_| "3000".to_string())
                    .parse()
                    .unwrap_or(3000),
            },
        })
    }
}
