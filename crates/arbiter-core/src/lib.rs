// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # arbiter-core
//!
//! Decision orchestration engine for the Arbiter analysis protocol.
//!
//! A caller submits a typed analysis request (free text, a governance
//! proposal, ...).  The engine validates it, routes it to a pluggable
//! analyzer, and returns a standardised, explainable [`Decision`]: an
//! action, a confidence score, reasoning, and a risk classification.
//!
//! ## Architecture
//!
//! ```text
//! DecisionEngine
//!   ├── PluginRegistry      - ordered, name-keyed analyzer plugins
//!   ├── ResultCache         - bounded key → result store with TTL
//!   ├── RateLimiter         - per-minute / per-hour admission control
//!   ├── PerformanceMonitor  - rolling latency / success metrics
//!   ├── LearningStore       - append-only outcome / feedback log
//!   ├── EventBus            - synchronous event listeners
//!   └── rules::evaluate_rules - pure keyword-rule evaluation path
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use arbiter_core::{config::EngineConfig, engine::DecisionEngine, types::Rule};
//! use serde_json::json;
//!
//! let engine = DecisionEngine::new(EngineConfig::default());
//!
//! let rules = vec![Rule::natural_language(
//!     "rule-1",
//!     "Fund builders",
//!     "developer grants ecosystem funding",
//!     json!("YES"),
//! )];
//!
//! let result = engine.analyze_with_rules(
//!     json!({ "text": "This proposal will fund developer grants for ecosystem growth" }),
//!     &rules,
//!     None,
//! );
//! assert!(result.success);
//! ```

pub mod cache;
pub mod clock;
pub mod config;
#[cfg(feature = "config-loader")]
pub mod config_loader;
pub mod engine;
pub mod error;
pub mod events;
pub mod fallback;
pub mod learning;
pub mod logging;
pub mod monitor;
pub mod plugin;
pub mod rate_limit;
pub mod rules;
pub mod types;

// Re-export the most commonly used items at the crate root so consumers can
// write `use arbiter_core::DecisionEngine;` instead of the fully qualified
// path.
pub use config::EngineConfig;
pub use engine::DecisionEngine;
pub use error::{EngineError, EngineResult};
pub use events::{EngineEvent, EventKind, ListenerId};
pub use plugin::{AnalyzerPlugin, PluginRegistry};
pub use types::{
    Action, AnalysisInput, AnalysisRequest, AnalysisResult, Decision, EngineStatus,
    FallbackStrategy, LearningInsights, LearningRecord, RequestContext, RequestOptions,
    RiskAssessment, RiskLevel, Rule,
};
