// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Error taxonomy for the decision engine.
//!
//! Errors never cross the public `analyze*` boundary: the engine converts
//! them into failed [`AnalysisResult`](crate::types::AnalysisResult)s whose
//! `error` field is the display string of the variant.  Registry and
//! learning calls return them directly.

use thiserror::Error;

/// Main error type for the decision engine.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Malformed request: empty type, non-object input, wrong field types.
    #[error("invalid request: {reason}")]
    Validation { reason: String },

    /// Either the per-minute or the per-hour quota is exhausted.
    #[error("rate limit exceeded")]
    RateLimited,

    /// No registered plugin accepts the request type / blockchain.
    #[error("no analyzer available for request type '{request_type}'")]
    NoAnalyzer { request_type: String },

    /// An analyzer did not resolve within its deadline.
    #[error("analysis timeout")]
    Timeout { plugin: String, timeout_ms: u64 },

    /// An analyzer returned a failure or panicked.  Displays the analyzer's
    /// own reason so it can be surfaced verbatim.
    #[error("{reason}")]
    Plugin { plugin: String, reason: String },

    /// Non-fatal cache problem; logged and bypassed.
    #[error("cache error: {0}")]
    Cache(String),

    #[error("plugin '{name}' is already registered")]
    DuplicatePlugin { name: String },

    #[error("invalid plugin '{name}': {reason}")]
    InvalidPlugin { name: String, reason: String },

    #[error("engine is shut down")]
    ShutDown,

    #[error("learning is disabled")]
    LearningDisabled,
}

impl EngineError {
    /// Name of the analyzer responsible for the error, if any.
    pub fn provider(&self) -> Option<&str> {
        match self {
            EngineError::Timeout { plugin, .. } | EngineError::Plugin { plugin, .. } => {
                Some(plugin.as_str())
            }
            _ => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_strings_match_public_contract() {
        assert!(EngineError::Validation { reason: "x".into() }
            .to_string()
            .starts_with("invalid request"));
        assert_eq!(EngineError::RateLimited.to_string(), "rate limit exceeded");
        assert_eq!(
            EngineError::Timeout { plugin: "p".into(), timeout_ms: 5 }.to_string(),
            "analysis timeout"
        );
        assert_eq!(
            EngineError::Plugin { plugin: "p".into(), reason: "missing text input".into() }
                .to_string(),
            "missing text input"
        );
    }

    #[test]
    fn test_provider_only_for_plugin_errors() {
        let timeout = EngineError::Timeout { plugin: "slow".into(), timeout_ms: 10 };
        assert_eq!(timeout.provider(), Some("slow"));
        assert_eq!(EngineError::RateLimited.provider(), None);
        assert_eq!(EngineError::NoAnalyzer { request_type: "t".into() }.provider(), None);
    }
}
