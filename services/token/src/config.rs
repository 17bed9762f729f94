//! Centralized configuration for the GUID token service.
//!
//! All configuration is loaded from environment variables and validated
//! at startup.

use crate::error::TokenError;
use crate::jwt::SigningSecret;
use std::env;
use std::time::Duration;

/// Minimum accepted signing secret length in bytes.
pub const MIN_SECRET_LEN: usize = 32;

/// Upper bound for both token TTLs (one year).
pub const MAX_TOKEN_TTL: Duration = Duration::from_secs(365 * 24 * 3600);

/// Refresh record backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL via a pooled sqlx connection
    Postgres {
        /// Connection string
        url: String,
        /// Pool size
        max_connections: u32,
    },
    /// In-process map, lost on restart
    Memory,
}

/// Argon2id cost parameters for refresh secret hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashCost {
    fn default() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Request deadline enforced by the HTTP layer
    pub request_timeout: Duration,
    /// Drain window on shutdown
    pub shutdown_timeout: Duration,
    /// Take the client address from `X-Forwarded-For`
    pub trust_forwarded_for: bool,

    // Token settings
    /// Process-wide HS512 signing secret
    pub jwt_secret: SigningSecret,
    /// Access token TTL
    pub access_token_ttl: Duration,
    /// Refresh record validity window
    pub refresh_token_ttl: Duration,
    /// Refresh hash cost
    pub hash_cost: HashCost,

    // Storage settings
    /// Refresh record backend
    pub storage: StorageBackend,
    /// Run the embedded migration at startup
    pub apply_migrations: bool,
    /// Deadline for a single storage call
    pub storage_timeout: Duration,

    // Side channels
    /// Deadline for an anomaly notification
    pub notification_timeout: Duration,

    // Logging
    /// tracing filter directive
    pub log_level: String,
    /// Emit JSON log lines
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, TokenError> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| TokenError::config("JWT_SECRET is required"))
            .and_then(|s| SigningSecret::new(s.into_bytes()))?;

        let storage = match env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StorageBackend::Postgres {
                url: env::var("DATABASE_URL").map_err(|_| {
                    TokenError::config("DATABASE_URL is required for the postgres backend")
                })?,
                max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 10)?,
            },
            "memory" => StorageBackend::Memory,
            other => {
                return Err(TokenError::config(format!(
                    "Invalid STORAGE_BACKEND: {other}"
                )))
            }
        };

        let config = Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: parse_env("PORT", 8080)?,
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT", 30)?),
            shutdown_timeout: Duration::from_secs(parse_env("SHUTDOWN_TIMEOUT", 10)?),
            trust_forwarded_for: parse_env("TRUST_FORWARDED_FOR", false)?,
            jwt_secret,
            access_token_ttl: Duration::from_secs(parse_env("ACCESS_TOKEN_TTL", 1800)?),
            refresh_token_ttl: Duration::from_secs(parse_env("REFRESH_TOKEN_TTL", 86_400)?),
            hash_cost: HashCost {
                memory_kib: parse_env("ARGON2_MEMORY_KIB", HashCost::default().memory_kib)?,
                iterations: parse_env("ARGON2_ITERATIONS", HashCost::default().iterations)?,
                parallelism: parse_env("ARGON2_PARALLELISM", HashCost::default().parallelism)?,
            },
            storage,
            apply_migrations: parse_env("APPLY_MIGRATIONS", false)?,
            storage_timeout: Duration::from_secs(parse_env("STORAGE_TIMEOUT", 5)?),
            notification_timeout: Duration::from_secs(parse_env("NOTIFICATION_TIMEOUT", 2)?),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: parse_env("LOG_JSON", true)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates value ranges.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first offending field.
    pub fn validate(&self) -> Result<(), TokenError> {
        if self.port == 0 {
            return Err(TokenError::config("PORT must be between 1 and 65535"));
        }
        if self.jwt_secret.len() < MIN_SECRET_LEN {
            return Err(TokenError::config(format!(
                "JWT_SECRET must be at least {MIN_SECRET_LEN} bytes"
            )));
        }

        let durations = [
            ("ACCESS_TOKEN_TTL", self.access_token_ttl),
            ("REFRESH_TOKEN_TTL", self.refresh_token_ttl),
            ("REQUEST_TIMEOUT", self.request_timeout),
            ("STORAGE_TIMEOUT", self.storage_timeout),
            ("NOTIFICATION_TIMEOUT", self.notification_timeout),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, d)| d.is_zero()) {
            return Err(TokenError::config(format!("{name} must be greater than 0")));
        }

        for (name, ttl) in [
            ("ACCESS_TOKEN_TTL", self.access_token_ttl),
            ("REFRESH_TOKEN_TTL", self.refresh_token_ttl),
        ] {
            if ttl > MAX_TOKEN_TTL {
                return Err(TokenError::config(format!(
                    "{name} must be at most {} seconds",
                    MAX_TOKEN_TTL.as_secs()
                )));
            }
        }

        if let StorageBackend::Postgres { max_connections, .. } = &self.storage {
            if *max_connections == 0 {
                return Err(TokenError::config(
                    "DATABASE_MAX_CONNECTIONS must be greater than 0",
                ));
            }
        }
        Ok(())
    }

    /// Socket address string to bind.
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, TokenError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .parse()
            .map_err(|e| TokenError::config(format!("Invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}
