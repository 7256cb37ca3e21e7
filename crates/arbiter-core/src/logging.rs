// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Structured logging setup and span helpers.
//!
//! The engine only emits `tracing` events; installing a subscriber is the
//! host's choice.  [`init_logging`] is a convenience for binaries and demos.

use std::io;

use tracing::Span;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter,
};

use crate::config::{EngineConfig, Environment};

/// Install a global subscriber for `config`.
///
/// `RUST_LOG` wins over `config.log_level` when set.  Production
/// environments get JSON lines on stderr; everything else gets the
/// human-readable formatter.
///
/// # Errors
///
/// Fails when a global subscriber is already installed.
pub fn init_logging(config: &EngineConfig) -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},arbiter_core={level},arbiter_analyzers={level}",
            level = config.log_level.as_directive()
        ))
    });

    let registry = tracing_subscriber::registry().with(env_filter);

    let result = match config.environment {
        Environment::Production => registry
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_writer(io::stderr),
            )
            .try_init(),
        Environment::Development | Environment::Staging => registry
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .try_init(),
    };

    if result.is_ok() {
        tracing::info!(environment = %config.environment, "arbiter logging initialized");
    }
    result
}

/// Span wrapping one pass through the analysis pipeline.  `provider`,
/// `success` and `processing_time_ms` are recorded when the pass ends.
pub fn analysis_span(request_id: &str, request_type: &str) -> Span {
    tracing::info_span!(
        "analysis",
        request_id = %request_id,
        request_type = %request_type,
        provider = tracing::field::Empty,
        success = tracing::field::Empty,
        processing_time_ms = tracing::field::Empty,
    )
}

/// Span wrapping a single analyzer invocation.
pub fn plugin_span(plugin: &str, timeout_ms: u64) -> Span {
    tracing::debug_span!("plugin_call", plugin = %plugin, timeout_ms = timeout_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_fails_without_panicking() {
        let config = EngineConfig::default();
        // Another test in this binary may have installed a subscriber first.
        let _ = init_logging(&config);
        assert!(init_logging(&config).is_err());
    }

    #[test]
    fn test_spans_can_be_created_without_subscriber() {
        let span = analysis_span("req-1", "sentiment");
        span.record("provider", "sentiment");
        let _guard = span.enter();
        let _plugin = plugin_span("sentiment", 100);
    }
}
