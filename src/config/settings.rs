//! Runtime settings read from the environment (after `dotenvy`).

use crate::error::ConfigError;
use std::path::PathBuf;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Validation(format!(
                "invalid SIAGOV_STORE: {} (expected postgres or memory)",
                s
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    /// Schema holding the entity tables.
    pub schema: String,
    pub bind: String,
    pub max_connections: u32,
    pub backend: StoreBackend,
    pub catalog_path: Option<PathBuf>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Settings::from_lookup(|k| std::env::var(k).ok())
    }

    /// Same as `from_env` with an injectable variable source.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let max_connections = match get("SIAGOV_MAX_CONNECTIONS") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Validation(format!("invalid SIAGOV_MAX_CONNECTIONS: {}", v)))?,
            None => 5,
        };
        let backend = match get("SIAGOV_STORE") {
            Some(v) => v.parse()?,
            None => StoreBackend::Postgres,
        };
        let schema = get("SIAGOV_SCHEMA").unwrap_or_else(|| "public".into());
        if schema.is_empty() || !schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Validation(format!("invalid SIAGOV_SCHEMA: {}", schema)));
        }
        Ok(Settings {
            database_url: get("DATABASE_URL").unwrap_or_else(|| "postgres://localhost/siagov".into()),
            schema,
            bind: get("SIAGOV_BIND").unwrap_or_else(|| "0.0.0.0:3000".into()),
            max_connections,
            backend,
            catalog_path: get("SIAGOV_CATALOG").filter(|s| !s.is_empty()).map(PathBuf::from),
        })
    }
}
