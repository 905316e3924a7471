use std::{env, fmt, str::FromStr, time::Duration};

use thiserror::Error;

/// SQL dialects a connection can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Postgres wire protocol, as spoken by CockroachDB.
    Postgres,
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::Postgres => write!(f, "postgres"),
        }
    }
}

impl FromStr for Dialect {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "cockroachdb" => Ok(Dialect::Postgres),
            other => Err(ConfigError::UnsupportedDialect(other.to_string())),
        }
    }
}

/// Errors reading connection configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unsupported dialect: {0}")]
    UnsupportedDialect(String),
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Connection settings. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Database host (default: "localhost")
    pub host: String,
    /// Database port (default: 26257)
    pub port: u16,
    /// Database name (default: "fluid_prefsdb")
    pub database: String,
    /// User name (default: "maxroach")
    pub user: String,
    /// Password (default: empty)
    pub password: String,
    /// SQL dialect (default: postgres)
    pub dialect: Dialect,
    /// Maximum pooled connections (default: 5)
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection (default: 30)
    pub acquire_timeout_seconds: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 26257,
            database: "fluid_prefsdb".to_string(),
            user: "maxroach".to_string(),
            password: String::new(),
            dialect: Dialect::Postgres,
            max_connections: 5,
            acquire_timeout_seconds: 30,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}

impl ConnectionConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `COCKROACH_HOST` - Database host (default: "localhost")
    /// - `COCKROACH_PORT` - Database port (default: 26257)
    /// - `COCKROACH_DATABASE` - Database name (default: "fluid_prefsdb")
    /// - `COCKROACH_USER` - User name (default: "maxroach")
    /// - `COCKROACH_PASSWORD` - Password (default: empty)
    /// - `COCKROACH_DIALECT` - SQL dialect (default: "postgres")
    /// - `COCKROACH_MAX_CONNECTIONS` - Pool size (default: 5)
    /// - `COCKROACH_ACQUIRE_TIMEOUT_SECONDS` - Wait for a pooled connection (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            host: env::var("COCKROACH_HOST").unwrap_or(defaults.host),
            port: parse_var("COCKROACH_PORT", defaults.port)?,
            database: env::var("COCKROACH_DATABASE").unwrap_or(defaults.database),
            user: env::var("COCKROACH_USER").unwrap_or(defaults.user),
            password: env::var("COCKROACH_PASSWORD").unwrap_or(defaults.password),
            dialect: parse_var("COCKROACH_DIALECT", defaults.dialect)?,
            max_connections: parse_var("COCKROACH_MAX_CONNECTIONS", defaults.max_connections)?,
            acquire_timeout_seconds: parse_var(
                "COCKROACH_ACQUIRE_TIMEOUT_SECONDS",
                defaults.acquire_timeout_seconds,
            )?,
        })
    }

    /// Get the pool acquire timeout as a Duration.
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }

    /// Connection URL with the password redacted, for logs.
    pub fn redacted_url(&self) -> String {
        let credentials = if self.password.is_empty() {
            self.user.clone()
        } else {
            format!("{}:***", self.user)
        };
        format!(
            "{}://{}@{}:{}/{}",
            self.dialect, credentials, self.host, self.port, self.database
        )
    }
}
