//! # Service Configuration Module
//!
//! Environment-variable based configuration for the review endpoint.
//!
//! ## Overview
//!
//! Configuration is read once at process start into an immutable
//! [`ServiceConfig`] that is shared by reference with every request. Missing
//! required values do **not** abort start-up: they are kept as `None` and every
//! request is answered with a `400` configuration error until the process is
//! restarted with the value set.
//!
//! ## Environment Variables
//!
//! ### `REVIEW_TABLE_NAME` (required)
//!
//! Identifier of the table reviews are written to.
//!
//! ### `TOKEN_VALIDATION_ENDPOINT` (required)
//!
//! URL the caller's credential is POSTed to. `200` means the token is valid.
//!
//! ### `LOG_LEVEL` / `LOG_FORMAT`
//!
//! Log verbosity (default `DEBUG`) and output format (`json` or `pretty`).
//!
//! ### `REVIEW_ALLOWED_ORIGIN_PATTERN` / `REVIEW_FALLBACK_ORIGIN`
//!
//! Allow-list regex for the `Origin` header and the origin echoed when a
//! request's origin is not allowed.
//!
//! ### `REVIEW_TOKEN_TIMEOUT_MS`
//!
//! Timeout of the token validation call. Accepts decimal milliseconds.
//! Default: `5000`.
//!
//! ### `REVIEW_DATA_DIR` / `REVIEW_BIND_ADDR`
//!
//! Directory of the file-backed store (in-memory when unset) and the HTTP
//! listen address (default `0.0.0.0:8080`).
//!
//! ## Usage
//!
//! ```rust
//! use review_gate::config::ServiceConfig;
//!
//! let config = ServiceConfig::from_env();
//! println!("table: {:?}", config.table_name);
//! ```

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default allow-list: HTTPS subdomains of `testdevops.com`, optional port.
pub const DEFAULT_ALLOWED_ORIGIN_PATTERN: &str =
    r"^https://([a-zA-Z0-9-]+\.)*testdevops\.com(:\d+)?$";
/// Origin echoed in `Access-Control-Allow-Origin` for untrusted callers.
pub const DEFAULT_FALLBACK_ORIGIN: &str = "https://api.testdevops.com";
/// Token validation timeout.
pub const DEFAULT_TOKEN_TIMEOUT_MS: u64 = 5000;
/// HTTP listen address for `serve`.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

const TABLE_NAME_VAR: &str = "REVIEW_TABLE_NAME";
const TOKEN_ENDPOINT_VAR: &str = "TOKEN_VALIDATION_ENDPOINT";

/// A required setting that was not provided.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No table identifier.
    #[error("REVIEW_TABLE_NAME environment variable is required")]
    MissingTableName,
    /// No token validator address.
    #[error("TOKEN_VALIDATION_ENDPOINT environment variable is required")]
    MissingTokenEndpoint,
}

/// Immutable service configuration, loaded once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Store table identifier
    pub table_name: Option<String>,
    /// Token validator URL
    pub token_validation_endpoint: Option<String>,
    /// Log verbosity (`trace` .. `error`)
    pub log_level: String,
    /// Log output format (`json` or `pretty`)
    pub log_format: String,
    /// Regex the `Origin` header must match
    pub allowed_origin_pattern: String,
    /// `Access-Control-Allow-Origin` value for untrusted origins
    pub fallback_origin: String,
    /// Timeout for the token validation call
    pub token_timeout: Duration,
    /// File store directory; in-memory store when `None`
    pub data_dir: Option<PathBuf>,
    /// HTTP listen address
    pub bind_addr: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            table_name: None,
            token_validation_endpoint: None,
            log_level: "debug".to_string(),
            log_format: "json".to_string(),
            allowed_origin_pattern: DEFAULT_ALLOWED_ORIGIN_PATTERN.to_string(),
            fallback_origin: DEFAULT_FALLBACK_ORIGIN.to_string(),
            token_timeout: Duration::from_millis(DEFAULT_TOKEN_TIMEOUT_MS),
            data_dir: None,
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
        }
    }
}

impl ServiceConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let token_timeout = get("REVIEW_TOKEN_TIMEOUT_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.token_timeout);

        Self {
            table_name: get(TABLE_NAME_VAR),
            token_validation_endpoint: get(TOKEN_ENDPOINT_VAR),
            log_level: get("LOG_LEVEL")
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.log_level),
            log_format: get("LOG_FORMAT")
                .map(|v| v.to_lowercase())
                .unwrap_or(defaults.log_format),
            allowed_origin_pattern: get("REVIEW_ALLOWED_ORIGIN_PATTERN")
                .unwrap_or(defaults.allowed_origin_pattern),
            fallback_origin: get("REVIEW_FALLBACK_ORIGIN").unwrap_or(defaults.fallback_origin),
            token_timeout,
            data_dir: get("REVIEW_DATA_DIR").map(PathBuf::from),
            bind_addr: get("REVIEW_BIND_ADDR").unwrap_or(defaults.bind_addr),
        }
    }

    /// Check that both required settings are present.
    ///
    /// The table identifier is checked first.
    pub fn require(&self) -> Result<(&str, &str), ConfigError> {
        let table = self
            .table_name
            .as_deref()
            .ok_or(ConfigError::MissingTableName)?;
        let endpoint = self
            .token_validation_endpoint
            .as_deref()
            .ok_or(ConfigError::MissingTokenEndpoint)?;
        Ok((table, endpoint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ServiceConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.token_timeout, Duration::from_secs(5));
        assert_eq!(config.fallback_origin, "https://api.testdevops.com");
    }

    #[test]
    fn test_reads_all_values() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("REVIEW_TABLE_NAME", "Reviews"),
            ("TOKEN_VALIDATION_ENDPOINT", "http://auth.local/validate"),
            ("LOG_LEVEL", "INFO"),
            ("LOG_FORMAT", "Pretty"),
            ("REVIEW_TOKEN_TIMEOUT_MS", "250"),
            ("REVIEW_DATA_DIR", "/var/lib/reviews"),
            ("REVIEW_BIND_ADDR", "127.0.0.1:9000"),
        ]));
        assert_eq!(config.table_name.as_deref(), Some("Reviews"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, "pretty");
        assert_eq!(config.token_timeout, Duration::from_millis(250));
        assert_eq!(config.data_dir, Some(PathBuf::from("/var/lib/reviews")));
        assert_eq!(config.bind_addr, "127.0.0.1:9000");
        assert_eq!(config.require(), Ok(("Reviews", "http://auth.local/validate")));
    }

    #[test]
    fn test_empty_values_count_as_missing() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("REVIEW_TABLE_NAME", ""),
            ("TOKEN_VALIDATION_ENDPOINT", "  "),
        ]));
        assert_eq!(config.table_name, None);
        assert_eq!(config.token_validation_endpoint, None);
    }

    #[test]
    fn test_require_checks_table_first() {
        let config = ServiceConfig::default();
        assert_eq!(config.require(), Err(ConfigError::MissingTableName));

        let config = ServiceConfig {
            table_name: Some("Reviews".into()),
            ..ServiceConfig::default()
        };
        let err = config.require().unwrap_err();
        assert_eq!(err, ConfigError::MissingTokenEndpoint);
        assert_eq!(
            err.to_string(),
            "TOKEN_VALIDATION_ENDPOINT environment variable is required"
        );
    }

    #[test]
    fn test_bad_timeout_falls_back() {
        let config =
            ServiceConfig::from_lookup(lookup(&[("REVIEW_TOKEN_TIMEOUT_MS", "soon")]));
        assert_eq!(config.token_timeout, Duration::from_millis(5000));
    }
}
