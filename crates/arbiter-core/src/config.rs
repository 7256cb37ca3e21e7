// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Engine-level configuration.
//!
//! [`EngineConfig`] is the single entry point for tuning the decision engine
//! at construction time.  Every field has a sensible default so that
//! `EngineConfig::default()` is always a valid starting point, and every
//! field is optional when deserialising.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Staging     => write!(f, "staging"),
            Environment::Production  => write!(f, "production"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info  => "info",
            LogLevel::Warn  => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachingConfig {
    pub enabled: bool,
    /// Lifetime of a cached result.
    pub ttl_ms: u64,
    /// Maximum number of cached results.
    pub max_size: usize,
    /// Interval of the background task that purges expired entries.
    pub purge_interval_ms: u64,
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_ms: 300_000,
            max_size: 1_000,
            purge_interval_ms: 60_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitingConfig {
    pub enabled: bool,
    pub requests_per_minute: u32,
    pub requests_per_hour: u32,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_minute: 60,
            requests_per_hour: 1_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    /// When `false`, `record_learning` is rejected.
    pub learning_enabled: bool,
    /// When `false`, the `basic` fallback strategy behaves like `skip`.
    pub fallback_enabled: bool,
    /// Accepted for configuration compatibility; no streaming surface exists.
    pub streaming_enabled: bool,
    /// When `false`, only the first matching analyzer is tried.
    pub multi_provider_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            learning_enabled: true,
            fallback_enabled: true,
            streaming_enabled: false,
            multi_provider_enabled: true,
        }
    }
}

/// Thresholds for [`PerformanceMonitor`](crate::monitor::PerformanceMonitor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Warn when a single analysis exceeds this latency.
    pub slow_analysis_ms: u64,
    /// Warn when a type's rolling average exceeds this latency.
    pub slow_average_ms: u64,
    /// Warn when the global success rate drops below this fraction.
    pub min_success_rate: f64,
    /// Samples required before the success-rate check applies.
    pub min_samples: u64,
    /// Capacity of each rolling latency buffer.
    pub window_size: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            slow_analysis_ms: 5_000,
            slow_average_ms: 2_000,
            min_success_rate: 0.8,
            min_samples: 20,
            window_size: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Hard cap on retained learning records.
    pub max_records: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self { max_records: 10_000 }
    }
}

/// Top-level configuration for [`DecisionEngine`](crate::engine::DecisionEngine).
///
/// # Examples
///
/// ```rust
/// use arbiter_core::config::{EngineConfig, RateLimitingConfig};
///
/// let config = EngineConfig {
///     rate_limiting: RateLimitingConfig {
///         requests_per_minute: 10,
///         ..RateLimitingConfig::default()
///     },
///     ..EngineConfig::default()
/// };
/// assert!(config.caching.enabled);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub environment: Environment,
    pub log_level: LogLevel,
    pub caching: CachingConfig,
    pub rate_limiting: RateLimitingConfig,
    pub features: FeatureFlags,
    /// Deadline for one analyzer call when the request does not set one.
    pub default_timeout_ms: u64,
    pub performance: PerformanceConfig,
    pub learning: LearningConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            log_level: LogLevel::Info,
            caching: CachingConfig::default(),
            rate_limiting: RateLimitingConfig::default(),
            features: FeatureFlags::default(),
            default_timeout_ms: 30_000,
            performance: PerformanceConfig::default(),
            learning: LearningConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let json = r#"{
            "environment": "production",
            "rate_limiting": { "requests_per_minute": 5 },
            "features": { "learning_enabled": false }
        }"#;
        let config: EngineConfig = serde_json::from_str(json).expect("should parse");
        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.rate_limiting.requests_per_minute, 5);
        assert_eq!(config.rate_limiting.requests_per_hour, 1_000);
        assert!(!config.features.learning_enabled);
        assert!(config.features.fallback_enabled);
        assert_eq!(config.default_timeout_ms, 30_000);
    }
}
