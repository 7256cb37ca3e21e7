// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Shared data contracts used across the engine, its components, and
//! analyzer plugins.
//!
//! All types implement [`Clone`], [`Debug`], [`serde::Serialize`], and
//! [`serde::Deserialize`] so they can be cached, logged, and handed to
//! controller code as JSON without additional conversion steps.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clock::current_time_ms;
use crate::error::{EngineError, EngineResult};

/// Provider label used for results produced by the built-in fallback.
pub const FALLBACK_PROVIDER: &str = "fallback";

/// Provider label used for results produced by the rule evaluator.
pub const RULES_PROVIDER: &str = "rules";

/// Provider label used for failures raised by the engine before any
/// analyzer was consulted.
pub const ENGINE_PROVIDER: &str = "engine";

/// Upper bound of the confidence scale.
pub const MAX_CONFIDENCE: f64 = 100.0;

// ---------------------------------------------------------------------------
// Decision
// ---------------------------------------------------------------------------

/// The recommended downstream action.
///
/// # Examples
///
/// ```rust
/// use arbiter_core::types::Action;
///
/// let json = serde_json::to_string(&Action::Delegate).unwrap();
/// assert_eq!(json, "\"DELEGATE\"");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    /// Proceed with the action unattended.
    Execute,
    /// Hold and re-evaluate later.
    Wait,
    /// Do nothing.
    Skip,
    /// Hand the decision to a human or another system.
    Delegate,
    /// Raise an alert.
    Alert,
}

impl Action {
    /// Wire name of the action.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Execute  => "EXECUTE",
            Action::Wait     => "WAIT",
            Action::Skip     => "SKIP",
            Action::Delegate => "DELEGATE",
            Action::Alert    => "ALERT",
        }
    }
}

/// Four-step risk scale.  Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    /// The next level up, saturating at [`RiskLevel::Critical`].
    ///
    /// ```rust
    /// use arbiter_core::types::RiskLevel;
    /// assert_eq!(RiskLevel::High.raised(), RiskLevel::Critical);
    /// assert_eq!(RiskLevel::Critical.raised(), RiskLevel::Critical);
    /// ```
    pub fn raised(self) -> Self {
        match self {
            RiskLevel::Low      => RiskLevel::Medium,
            RiskLevel::Medium   => RiskLevel::High,
            RiskLevel::High     => RiskLevel::Critical,
            RiskLevel::Critical => RiskLevel::Critical,
        }
    }
}

/// Risk classification attached to every [`Decision`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub level: RiskLevel,
    /// Human-readable factors that contributed to `level`.
    #[serde(default)]
    pub factors: Vec<String>,
}

impl RiskAssessment {
    pub fn new(level: RiskLevel) -> Self {
        Self { level, factors: Vec::new() }
    }

    pub fn with_factor(mut self, factor: impl Into<String>) -> Self {
        self.factors.push(factor.into());
        self
    }
}

impl Default for RiskAssessment {
    fn default() -> Self {
        Self::new(RiskLevel::Medium)
    }
}

/// An action that was considered but not chosen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub action: Action,
    pub confidence: f64,
    pub reasoning: String,
}

/// Ordered steps a downstream executor should follow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    pub steps: Vec<String>,
    /// Whether a human must confirm before the first step runs.
    #[serde(default)]
    pub requires_confirmation: bool,
}

/// The standardised, explainable recommendation.
///
/// Confidence always lies in `[0, 100]`; the constructor and
/// [`Decision::normalized`] clamp out-of-range values.
///
/// # Examples
///
/// ```rust
/// use arbiter_core::types::{Action, Decision};
///
/// let decision = Decision::new(Action::Execute, 140.0, vec!["strong signal".into()]);
/// assert_eq!(decision.confidence, 100.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub action: Action,
    pub confidence: f64,
    /// Ordered explanation of how the decision was reached.
    pub reasoning: Vec<String>,
    /// Open key/value bag for analyzer-specific details.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub risk_assessment: RiskAssessment,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Alternative>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_plan: Option<ExecutionPlan>,
}

impl Decision {
    pub fn new(action: Action, confidence: f64, reasoning: Vec<String>) -> Self {
        Self {
            action,
            confidence: clamp_confidence(confidence),
            reasoning,
            metadata: Map::new(),
            risk_assessment: RiskAssessment::default(),
            alternatives: Vec::new(),
            execution_plan: None,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn with_risk(mut self, risk: RiskAssessment) -> Self {
        self.risk_assessment = risk;
        self
    }

    pub fn with_alternative(mut self, alternative: Alternative) -> Self {
        self.alternatives.push(Alternative {
            confidence: clamp_confidence(alternative.confidence),
            ..alternative
        });
        self
    }

    pub fn with_execution_plan(mut self, plan: ExecutionPlan) -> Self {
        self.execution_plan = Some(plan);
        self
    }

    /// Re-apply the confidence bounds.  Used on every decision a plugin
    /// hands back, since plugins may build the struct literally.
    pub fn normalized(mut self) -> Self {
        self.confidence = clamp_confidence(self.confidence);
        for alternative in &mut self.alternatives {
            alternative.confidence = clamp_confidence(alternative.confidence);
        }
        self
    }
}

/// Clamp a confidence score into `[0, 100]`.  `NaN` maps to `0`.
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, MAX_CONFIDENCE)
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// The analysable payload of a request.
///
/// Well-known fields are typed; anything else a domain needs is kept in
/// `extra`.  Parsed once at the engine boundary by
/// [`AnalysisInput::from_value`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Self::default() }
    }

    /// Parse a loosely-typed JSON value into an [`AnalysisInput`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Validation`] when `value` is not a JSON object
    /// or when a well-known field has the wrong type.
    ///
    /// ```rust
    /// use arbiter_core::types::AnalysisInput;
    /// use serde_json::json;
    ///
    /// assert!(AnalysisInput::from_value(json!({ "text": "hello" })).is_ok());
    /// assert!(AnalysisInput::from_value(json!(null)).is_err());
    /// assert!(AnalysisInput::from_value(json!({ "text": 42 })).is_err());
    /// ```
    pub fn from_value(value: Value) -> EngineResult<Self> {
        if !value.is_object() {
            return Err(EngineError::Validation {
                reason: "input must be a JSON object".into(),
            });
        }
        serde_json::from_value(value).map_err(|error| EngineError::Validation {
            reason: format!("malformed input: {error}"),
        })
    }

    /// The text an analyzer should read: `text` when present, otherwise the
    /// non-empty parts of `title` and `description` joined by a blank line.
    pub fn text_content(&self) -> Option<String> {
        if let Some(text) = self.text.as_deref().filter(|text| !text.trim().is_empty()) {
            return Some(text.to_owned());
        }
        let parts: Vec<&str> = [self.title.as_deref(), self.description.as_deref()]
            .into_iter()
            .flatten()
            .filter(|part| !part.trim().is_empty())
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n\n"))
        }
    }
}

/// Environmental hints about where a decision will be acted upon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blockchain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_history: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RequestContext {
    pub fn for_blockchain(blockchain: impl Into<String>) -> Self {
        Self { blockchain: Some(blockchain.into()), ..Self::default() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

/// What to do once every candidate analyzer has failed (or none matched).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackStrategy {
    /// Run the built-in heuristic and return a low-confidence `DELEGATE`.
    Basic,
    /// Surface the last error.
    Skip,
}

/// Per-request tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default)]
    pub priority: Priority,
    /// Deadline for a single analyzer call.  Falls back to the engine default.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub fallback_strategy: Option<FallbackStrategy>,
    /// Per-request opt-out of the result cache.
    #[serde(default = "default_caching")]
    pub caching: bool,
}

fn default_caching() -> bool { true }

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            priority: Priority::Normal,
            timeout_ms: None,
            fallback_strategy: None,
            caching: default_caching(),
        }
    }
}

impl RequestOptions {
    pub fn with_fallback(strategy: FallbackStrategy) -> Self {
        Self { fallback_strategy: Some(strategy), ..Self::default() }
    }
}

/// A single analysis request, built per call and discarded after the
/// response is produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub id: String,
    /// Routing key matched against each plugin's supported types.
    #[serde(rename = "type")]
    pub request_type: String,
    pub input: AnalysisInput,
    #[serde(default)]
    pub context: RequestContext,
    #[serde(default)]
    pub options: RequestOptions,
    pub timestamp_ms: u64,
}

impl AnalysisRequest {
    /// Build a request with a fresh UUID v4 id and the current time.
    pub fn new(request_type: impl Into<String>, input: AnalysisInput) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            request_type: request_type.into(),
            input,
            context: RequestContext::default(),
            options: RequestOptions::default(),
            timestamp_ms: current_time_ms(),
        }
    }

    pub fn with_context(mut self, context: RequestContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }
}

// ---------------------------------------------------------------------------
// Result
// ---------------------------------------------------------------------------

/// Outcome of an analysis.
///
/// `success` is `true` exactly when `decision` is present and `error` is
/// absent.  Build instances with [`AnalysisResult::success`] or
/// [`AnalysisResult::failure`] to keep that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processing_time_ms: u64,
    /// Plugin name, or one of [`FALLBACK_PROVIDER`], [`RULES_PROVIDER`],
    /// [`ENGINE_PROVIDER`].
    pub provider: String,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Set when the result was served from the engine cache.
    #[serde(default)]
    pub from_cache: bool,
}

impl AnalysisResult {
    pub fn success(decision: Decision, provider: impl Into<String>) -> Self {
        Self {
            success: true,
            decision: Some(decision),
            error: None,
            processing_time_ms: 0,
            provider: provider.into(),
            metadata: Map::new(),
            from_cache: false,
        }
    }

    pub fn failure(error: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            success: false,
            decision: None,
            error: Some(error.into()),
            processing_time_ms: 0,
            provider: provider.into(),
            metadata: Map::new(),
            from_cache: false,
        }
    }

    pub fn with_processing_time(mut self, processing_time_ms: u64) -> Self {
        self.processing_time_ms = processing_time_ms;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Whether the success / decision / error fields agree with each other.
    pub fn is_consistent(&self) -> bool {
        self.success == self.decision.is_some() && self.success != self.error.is_some()
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionType {
    /// Keyword expression matched against the input text.
    NaturalLanguage,
    /// Any condition type this engine does not evaluate.  Such rules never
    /// trigger.
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleCondition {
    #[serde(rename = "type")]
    pub condition_type: ConditionType,
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleAction {
    #[serde(rename = "type")]
    pub action_type: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl RuleAction {
    /// The `vote` parameter, or `null` when the rule does not carry one.
    pub fn vote(&self) -> Value {
        self.parameters.get("vote").cloned().unwrap_or(Value::Null)
    }
}

/// A user-authored keyword-expression-to-action mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    pub name: String,
    pub condition: RuleCondition,
    pub action: RuleAction,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Higher values are evaluated first.
    #[serde(default)]
    pub priority: i32,
}

fn default_enabled() -> bool { true }

impl Rule {
    /// Convenience constructor for an enabled, priority-0 `vote` rule.
    pub fn natural_language(
        id: impl Into<String>,
        name: impl Into<String>,
        expression: impl Into<String>,
        vote: Value,
    ) -> Self {
        let mut parameters = Map::new();
        parameters.insert("vote".into(), vote);
        Self {
            id: id.into(),
            name: name.into(),
            condition: RuleCondition {
                condition_type: ConditionType::NaturalLanguage,
                expression: expression.into(),
            },
            action: RuleAction { action_type: "vote".into(), parameters },
            enabled: true,
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

// ---------------------------------------------------------------------------
// Learning
// ---------------------------------------------------------------------------

/// What actually happened after a decision was acted upon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActualOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
    pub timestamp_ms: u64,
}

/// Explicit user rating of a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFeedback {
    /// 1–5 star rating.
    pub rating: u8,
    /// Whether the user judged the recommendation correct.
    pub correctness: bool,
    /// 1–5 usefulness of the reasoning.
    pub helpfulness: u8,
}

/// An immutable (decision, outcome, feedback) tuple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningRecord {
    pub user_id: String,
    pub session_id: String,
    pub request_id: String,
    pub decision: Decision,
    pub actual_outcome: ActualOutcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_feedback: Option<UserFeedback>,
    pub timestamp_ms: u64,
    #[serde(default)]
    pub context: RequestContext,
}

impl LearningRecord {
    /// Records with feedback or a failed outcome are retained in preference
    /// to plain successes when the store overflows.
    pub fn is_informative(&self) -> bool {
        self.user_feedback.is_some() || !self.actual_outcome.success
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    pub reason: String,
    pub count: usize,
}

/// Aggregate view over the learning store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningInsights {
    /// Total number of retained records.
    pub total_sessions: usize,
    pub avg_confidence: f64,
    /// Fraction of records whose outcome succeeded, in `[0, 1]`.
    pub success_rate: f64,
    /// Most frequent outcome errors, most common first.
    pub top_failure_reasons: Vec<FailureReason>,
}

// ---------------------------------------------------------------------------
// Status snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub keys: usize,
    pub hits: u64,
    pub misses: u64,
}

/// Client-facing view of one rate-limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowStatus {
    pub count: u32,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitStatus {
    pub minute: WindowStatus,
    pub hour: WindowStatus,
}

/// Rolling latency statistics for one request type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeStats {
    pub samples: usize,
    pub average_ms: f64,
    pub min_ms: u64,
    pub max_ms: u64,
    pub median_ms: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    pub total_analyses: u64,
    pub successful_analyses: u64,
    pub failed_analyses: u64,
    /// `successful / total`, or `1.0` before any sample was recorded.
    pub success_rate: f64,
    /// Mean over the rolling global buffer.
    pub average_ms: f64,
    /// Maximum over the rolling global buffer.
    pub peak_ms: u64,
    pub by_type: BTreeMap<String, TypeStats>,
}

/// Point-in-time engine status returned by
/// [`DecisionEngine::get_status`](crate::engine::DecisionEngine::get_status).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStatus {
    pub initialized: bool,
    pub plugins_loaded: usize,
    pub cache_size: CacheStats,
    /// `None` when rate limiting is disabled.
    pub rate_limit_status: Option<RateLimitStatus>,
    pub learning_data_points: usize,
    pub performance: PerformanceSnapshot,
}
