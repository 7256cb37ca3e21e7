// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Configuration loader for [`DecisionEngine`](crate::engine::DecisionEngine).
//!
//! Supports two load strategies:
//!
//! 1. **TOML file** - [`load_config`] reads and deserialises a TOML file into
//!    an [`EngineConfig`].
//! 2. **Environment variables** - [`load_config_from_env`] reads
//!    `ARBITER_`-prefixed environment variables on top of the defaults.
//!
//! # File format
//!
//! ```toml
//! environment        = "production"
//! log_level          = "warn"
//! default_timeout_ms = 10000
//!
//! [caching]
//! enabled  = true
//! ttl_ms   = 60000
//! max_size = 500
//!
//! [rate_limiting]
//! requests_per_minute = 120
//! requests_per_hour   = 5000
//!
//! [features]
//! learning_enabled = false
//! ```
//!
//! # Environment variables
//!
//! | Variable                      | Type    | Default       |
//! |-------------------------------|---------|---------------|
//! | `ARBITER_ENVIRONMENT`         | string  | "development" |
//! | `ARBITER_LOG_LEVEL`           | string  | "info"        |
//! | `ARBITER_CACHE_ENABLED`       | boolean | true          |
//! | `ARBITER_CACHE_TTL_MS`        | integer | 300000        |
//! | `ARBITER_CACHE_MAX_SIZE`      | integer | 1000          |
//! | `ARBITER_RATE_LIMIT_ENABLED`  | boolean | true          |
//! | `ARBITER_REQUESTS_PER_MINUTE` | integer | 60            |
//! | `ARBITER_REQUESTS_PER_HOUR`   | integer | 1000          |
//! | `ARBITER_LEARNING_ENABLED`    | boolean | true          |
//! | `ARBITER_FALLBACK_ENABLED`    | boolean | true          |
//! | `ARBITER_DEFAULT_TIMEOUT_MS`  | integer | 30000         |

// Only compile this module when the "config-loader" feature is enabled.
#![cfg(feature = "config-loader")]

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::{EngineConfig, Environment, LogLevel};

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Errors that can occur while loading or parsing engine configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file \"{path}\": {source}")]
    FileRead { path: String, source: std::io::Error },

    #[error("Failed to parse TOML config: {source}")]
    TomlParse {
        #[from]
        source: toml::de::Error,
    },

    #[error("Field \"{field}\": cannot parse \"{value}\" - {reason}")]
    ParseField { field: String, value: String, reason: String },

    #[error("Field \"{field}\": value \"{value}\" out of range - {reason}")]
    InvalidRange { field: String, value: String, reason: String },
}

// ---------------------------------------------------------------------------
// TOML loader
// ---------------------------------------------------------------------------

/// Load an [`EngineConfig`] from a TOML file.  Missing keys take their
/// defaults.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read, the TOML does not
/// match the schema, or a limit is zero.
///
/// # Example
///
/// ```rust,no_run
/// use arbiter_core::config_loader::load_config;
///
/// let config = load_config("/etc/arbiter/engine.toml").unwrap();
/// println!("Requests per minute: {}", config.rate_limiting.requests_per_minute);
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig, ConfigError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| ConfigError::FileRead {
        path: path.display().to_string(),
        source,
    })?;
    parse_config(&content)
}

/// Parse an [`EngineConfig`] from TOML text.
pub fn parse_config(content: &str) -> Result<EngineConfig, ConfigError> {
    let config: EngineConfig = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Environment variable loader
// ---------------------------------------------------------------------------

/// Load an [`EngineConfig`] from `ARBITER_`-prefixed environment variables.
///
/// Unset variables fall back to their defaults.
///
/// # Errors
///
/// Returns [`ConfigError::ParseField`] for unparseable values and
/// [`ConfigError::InvalidRange`] for zero limits.
pub fn load_config_from_env() -> Result<EngineConfig, ConfigError> {
    load_config_with(|key| std::env::var(key).ok())
}

/// Same as [`load_config_from_env`] with an injectable variable source.
pub fn load_config_with<F>(lookup: F) -> Result<EngineConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = EngineConfig::default();

    if let Some(value) = lookup("ARBITER_ENVIRONMENT") {
        config.environment = parse_environment(&value)?;
    }
    if let Some(value) = lookup("ARBITER_LOG_LEVEL") {
        config.log_level = parse_log_level(&value)?;
    }

    let caching = &mut config.caching;
    caching.enabled = read_bool(&lookup, "ARBITER_CACHE_ENABLED", caching.enabled)?;
    caching.ttl_ms = read_number(&lookup, "ARBITER_CACHE_TTL_MS", caching.ttl_ms)?;
    caching.max_size = read_number(&lookup, "ARBITER_CACHE_MAX_SIZE", caching.max_size)?;

    let limits = &mut config.rate_limiting;
    limits.enabled = read_bool(&lookup, "ARBITER_RATE_LIMIT_ENABLED", limits.enabled)?;
    limits.requests_per_minute =
        read_number(&lookup, "ARBITER_REQUESTS_PER_MINUTE", limits.requests_per_minute)?;
    limits.requests_per_hour =
        read_number(&lookup, "ARBITER_REQUESTS_PER_HOUR", limits.requests_per_hour)?;

    let features = &mut config.features;
    features.learning_enabled =
        read_bool(&lookup, "ARBITER_LEARNING_ENABLED", features.learning_enabled)?;
    features.fallback_enabled =
        read_bool(&lookup, "ARBITER_FALLBACK_ENABLED", features.fallback_enabled)?;

    config.default_timeout_ms =
        read_number(&lookup, "ARBITER_DEFAULT_TIMEOUT_MS", config.default_timeout_ms)?;

    validate(&config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Private helpers
// ---------------------------------------------------------------------------

fn validate(config: &EngineConfig) -> Result<(), ConfigError> {
    let checks: [(&str, u64); 4] = [
        ("requests_per_minute", config.rate_limiting.requests_per_minute as u64),
        ("requests_per_hour", config.rate_limiting.requests_per_hour as u64),
        ("max_size", config.caching.max_size as u64),
        ("default_timeout_ms", config.default_timeout_ms),
    ];
    for (field, value) in checks {
        if value == 0 {
            return Err(ConfigError::InvalidRange {
                field: field.into(),
                value: value.to_string(),
                reason: "must be greater than zero".into(),
            });
        }
    }
    Ok(())
}

fn parse_environment(value: &str) -> Result<Environment, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "development" => Ok(Environment::Development),
        "staging"     => Ok(Environment::Staging),
        "production"  => Ok(Environment::Production),
        other => Err(ConfigError::ParseField {
            field: "ARBITER_ENVIRONMENT".into(),
            value: other.into(),
            reason: "expected one of: development, staging, production".into(),
        }),
    }
}

fn parse_log_level(value: &str) -> Result<LogLevel, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "debug" => Ok(LogLevel::Debug),
        "info"  => Ok(LogLevel::Info),
        "warn"  => Ok(LogLevel::Warn),
        "error" => Ok(LogLevel::Error),
        other => Err(ConfigError::ParseField {
            field: "ARBITER_LOG_LEVEL".into(),
            value: other.into(),
            reason: "expected one of: debug, info, warn, error".into(),
        }),
    }
}

fn read_number<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(val) => val.trim().parse::<T>().map_err(|source| ConfigError::ParseField {
            field: key.to_owned(),
            value: val.clone(),
            reason: source.to_string(),
        }),
        None => Ok(default),
    }
}

fn read_bool<F>(lookup: &F, key: &str, default: bool) -> Result<bool, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(val) => match val.trim().to_ascii_lowercase().as_str() {
            "true"  | "1" | "yes" | "on"  => Ok(true),
            "false" | "0" | "no"  | "off" => Ok(false),
            other => Err(ConfigError::ParseField {
                field: key.to_owned(),
                value: other.to_owned(),
                reason: "expected one of: true/false, 1/0, yes/no, on/off".into(),
            }),
        },
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashbrown::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_parse_toml_overrides_defaults() {
        let config = parse_config(
            r#"
            environment = "staging"
            [caching]
            ttl_ms = 1000
            [rate_limiting]
            requests_per_minute = 7
            "#,
        )
        .expect("should parse");
        assert_eq!(config.environment, Environment::Staging);
        assert_eq!(config.caching.ttl_ms, 1_000);
        assert_eq!(config.caching.max_size, 1_000);
        assert_eq!(config.rate_limiting.requests_per_minute, 7);
    }

    #[test]
    fn test_zero_limit_is_out_of_range() {
        let error = parse_config("[rate_limiting]\nrequests_per_minute = 0").unwrap_err();
        assert!(matches!(error, ConfigError::InvalidRange { .. }));
    }

    #[test]
    fn test_env_values_are_applied() {
        let config = load_config_with(lookup_from(&[
            ("ARBITER_LOG_LEVEL", "DEBUG"),
            ("ARBITER_CACHE_ENABLED", "off"),
            ("ARBITER_REQUESTS_PER_HOUR", "42"),
        ]))
        .expect("should load");
        assert_eq!(config.log_level, LogLevel::Debug);
        assert!(!config.caching.enabled);
        assert_eq!(config.rate_limiting.requests_per_hour, 42);
    }

    #[test]
    fn test_env_parse_errors() {
        let error = load_config_with(lookup_from(&[("ARBITER_CACHE_TTL_MS", "soon")])).unwrap_err();
        assert!(matches!(error, ConfigError::ParseField { ref field, .. } if field == "ARBITER_CACHE_TTL_MS"));

        let error = load_config_with(lookup_from(&[("ARBITER_ENVIRONMENT", "moon")])).unwrap_err();
        assert!(matches!(error, ConfigError::ParseField { .. }));
    }
}
