//! Runtime configuration read from the environment.

use serde::{Deserialize, Serialize};

use crate::errors::{AppError, AppResult};

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// PostgreSQL settings; `None` selects the in-memory repositories.
    pub database: Option<DatabaseConfig>,

    /// Whether the bootstrap data is seeded on startup.
    pub bootstrap_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl AppConfig {
    /// Reads `DATABASE_URL`, `DATABASE_MAX_CONNECTIONS` and `BOOTSTRAP_ENABLED`.
    pub fn from_env() -> AppResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|&n| n > 0)
                .ok_or_else(|| {
                    AppError::Config(format!(
                        "DATABASE_MAX_CONNECTIONS must be a positive number, got {raw:?}"
                    ))
                })?,
            None => 5,
        };

        let database = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig {
                url,
                max_connections,
            });

        let bootstrap_enabled = match lookup("BOOTSTRAP_ENABLED") {
            Some(raw) => parse_flag(&raw).ok_or_else(|| {
                AppError::Config(format!("BOOTSTRAP_ENABLED must be true or false, got {raw:?}"))
            })?,
            None => true,
        };

        Ok(Self {
            database,
            bootstrap_enabled,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
