//! Process configuration, read once at startup and passed into [`crate::app::build_app`].

use std::net::SocketAddr;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEV_JWT_SECRET: &str = "dev-secret";
const DEFAULT_JWT_EXPIRE_SECS: i64 = 24 * 60 * 60;
const DEFAULT_AUDIT_QUERY_MAX_LIMIT: u64 = 500;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is not a valid socket address: {value}")]
    InvalidBindAddr { key: &'static str, value: String },

    #[error("{key} must be a positive integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("DATABASE_URL is required when USE_PERSISTENT_STORES=true")]
    MissingDatabaseUrl,
}

/// Which store backend the application is wired with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expire_secs: i64,
    pub store: StoreBackend,
    /// Upper bound (and default) for `limit` on audit log queries.
    pub audit_query_max_limit: u64,
}

impl ApiConfig {
    /// In-memory configuration with defaults; used by tests and local runs.
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            jwt_secret: jwt_secret.into(),
            jwt_expire_secs: DEFAULT_JWT_EXPIRE_SECS,
            store: StoreBackend::InMemory,
            audit_query_max_limit: DEFAULT_AUDIT_QUERY_MAX_LIMIT,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw_addr = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = raw_addr.parse().map_err(|_| ConfigError::InvalidBindAddr {
            key: "BIND_ADDR",
            value: raw_addr.clone(),
        })?;

        let jwt_secret = match lookup("JWT_SECRET").filter(|s| !s.is_empty()) {
            Some(secret) => secret,
            None => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET.to_string()
            }
        };

        let jwt_expire_secs = match lookup("JWT_EXPIRE_TIME") {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(value = %raw, "JWT_EXPIRE_TIME is not a positive integer; using default");
                    DEFAULT_JWT_EXPIRE_SECS
                }
            },
            None => DEFAULT_JWT_EXPIRE_SECS,
        };

        let persistent = lookup("USE_PERSISTENT_STORES")
            .map(|v| v.trim().eq_ignore_ascii_case("true") || v.trim() == "1")
            .unwrap_or(false);
        let store = if persistent {
            let database_url = lookup("DATABASE_URL")
                .filter(|s| !s.is_empty())
                .ok_or(ConfigError::MissingDatabaseUrl)?;
            StoreBackend::Postgres { database_url }
        } else {
            StoreBackend::InMemory
        };

        let audit_query_max_limit = match lookup("AUDIT_QUERY_MAX_LIMIT") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidNumber {
                        key: "AUDIT_QUERY_MAX_LIMIT",
                        value: raw,
                    });
                }
            },
            None => DEFAULT_AUDIT_QUERY_MAX_LIMIT,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            jwt_expire_secs,
            store,
            audit_query_max_limit,
        })
    }
}
