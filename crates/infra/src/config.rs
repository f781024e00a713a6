//! Configuration loading and representation.
//!
//! Everything comes from environment variables with production defaults, so a
//! bare `ura-api` starts against `./ura.db` on port 8080.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use ura_observability::LogFormat;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Per-client admission control settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Minimum spacing between two admitted requests of one client.
    pub window: Duration,
    /// How long an idle client key is remembered.
    pub ttl: Duration,
    /// Sweep period for idle keys.
    pub sweep_every: Duration,
    /// Derive the client key from `X-Forwarded-For` when present.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(2000),
            ttl: Duration::from_secs(300),
            sweep_every: Duration::from_secs(60),
            trust_forwarded_for: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub db_max_connections: u32,
    /// Upper bound for every storage call.
    pub storage_timeout: Duration,
    pub session_ttl: chrono::Duration,
    pub rate_limit: RateLimitConfig,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            database_url: "sqlite://ura.db".to_string(),
            db_max_connections: 10,
            storage_timeout: Duration::from_millis(5000),
            session_ttl: chrono::Duration::minutes(60),
            rate_limit: RateLimitConfig::default(),
            log_format: LogFormat::Json,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from an arbitrary variable source (tests pass a map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let bind_addr = parse_var(&lookup, "URA_BIND_ADDR", defaults.bind_addr)?;
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or(defaults.database_url);
        let db_max_connections: u32 =
            parse_var(&lookup, "URA_DB_MAX_CONNECTIONS", defaults.db_max_connections)?;
        if db_max_connections == 0 {
            return Err(invalid("URA_DB_MAX_CONNECTIONS", "0", "must be at least 1"));
        }

        let storage_timeout_ms: u64 = parse_var(&lookup, "URA_STORAGE_TIMEOUT_MS", 5000)?;
        let session_ttl_minutes: i64 = parse_var(&lookup, "URA_SESSION_TTL_MINUTES", 60)?;
        if session_ttl_minutes <= 0 {
            return Err(invalid(
                "URA_SESSION_TTL_MINUTES",
                &session_ttl_minutes.to_string(),
                "must be positive",
            ));
        }

        let window_ms: u64 = parse_var(&lookup, "URA_RATE_LIMIT_WINDOW_MS", 2000)?;
        let ttl_secs: u64 = parse_var(&lookup, "URA_RATE_LIMIT_TTL_SECS", 300)?;
        let sweep_secs: u64 = parse_var(&lookup, "URA_RATE_LIMIT_SWEEP_SECS", 60)?;
        if sweep_secs == 0 {
            return Err(invalid("URA_RATE_LIMIT_SWEEP_SECS", "0", "must be at least 1"));
        }
        let trust_forwarded_for = parse_var(&lookup, "URA_TRUST_FORWARDED_FOR", true)?;
        let log_format = parse_var(&lookup, "URA_LOG_FORMAT", defaults.log_format)?;

        Ok(Self {
            bind_addr,
            database_url,
            db_max_connections,
            storage_timeout: Duration::from_millis(storage_timeout_ms),
            session_ttl: chrono::Duration::minutes(session_ttl_minutes),
            rate_limit: RateLimitConfig {
                window: Duration::from_millis(window_ms),
                ttl: Duration::from_secs(ttl_secs),
                sweep_every: Duration::from_secs(sweep_secs),
                trust_forwarded_for,
            },
            log_format,
        })
    }
}

fn parse_var<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) if raw.trim().is_empty() => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| invalid(var, &raw, &e.to_string())),
    }
}

fn invalid(var: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn from_map(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| map.get(var).cloned())
    }

    #[test]
    fn empty_environment_gives_defaults() {
        assert_eq!(from_map(&[]).unwrap(), Config::default());
    }

    #[test]
    fn overrides_are_applied() {
        let config = from_map(&[
            ("URA_BIND_ADDR", "127.0.0.1:9000"),
            ("DATABASE_URL", "sqlite::memory:"),
            ("URA_STORAGE_TIMEOUT_MS", "250"),
            ("URA_SESSION_TTL_MINUTES", "15"),
            ("URA_RATE_LIMIT_WINDOW_MS", "500"),
            ("URA_TRUST_FORWARDED_FOR", "false"),
            ("URA_LOG_FORMAT", "pretty"),
        ])
        .unwrap();

        assert_eq!(config.bind_addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.storage_timeout, Duration::from_millis(250));
        assert_eq!(config.session_ttl, chrono::Duration::minutes(15));
        assert_eq!(config.rate_limit.window, Duration::from_millis(500));
        assert!(!config.rate_limit.trust_forwarded_for);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn malformed_values_name_the_variable() {
        let err = from_map(&[("URA_DB_MAX_CONNECTIONS", "ten")]).unwrap_err();
        let ConfigError::Invalid { var, value, .. } = err;
        assert_eq!(var, "URA_DB_MAX_CONNECTIONS");
        assert_eq!(value, "ten");

        assert!(from_map(&[("URA_SESSION_TTL_MINUTES", "0")]).is_err());
        assert!(from_map(&[("URA_LOG_FORMAT", "xml")]).is_err());
        assert!(from_map(&[("URA_BIND_ADDR", "nowhere")]).is_err());
    }
}
