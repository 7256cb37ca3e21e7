// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! The [`DecisionEngine`] orchestrator.
//!
//! # Pipeline
//!
//! Every call to [`DecisionEngine::analyze`] runs the same sequence:
//!
//! 1. Lifecycle and request validation
//! 2. Rate-limit admission (skipped when rate limiting is disabled)
//! 3. Cache lookup (skipped when caching is disabled for the engine or the request)
//! 4. Candidate selection and plugin invocation under a deadline
//! 5. Fallback (`basic` heuristic, or surface the last error)
//! 6. Performance sample, cache write, completion event
//!
//! Errors never escape: each stage returns [`EngineResult`] internally and
//! the boundary turns the error into a failed [`AnalysisResult`].
//!
//! # Concurrency
//!
//! The engine is `Send + Sync` and meant to be shared behind an `Arc`.
//! There is no request-wide lock.  Each component sits behind its own
//! `parking_lot` lock which is taken for a single update and released
//! before any `.await`.  Plugin calls run on their own Tokio task, so a
//! panicking plugin is reported as a plugin failure and a timed-out one is
//! aborted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn, Instrument, Span};

use crate::cache::{cache_key, ResultCache};
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::events::{EngineEvent, EventBus, EventKind, ListenerId};
use crate::fallback::basic_decision;
use crate::learning::LearningStore;
use crate::logging::{analysis_span, plugin_span};
use crate::monitor::PerformanceMonitor;
use crate::plugin::{select_candidates, AnalyzerPlugin, PluginRegistry, RegisteredPlugin};
use crate::rate_limit::RateLimiter;
use crate::rules::evaluate_rules;
use crate::types::{
    AnalysisInput, AnalysisRequest, AnalysisResult, EngineStatus, FallbackStrategy,
    LearningInsights, LearningRecord, PerformanceSnapshot, RequestContext, RequestOptions, Rule,
    ENGINE_PROVIDER, FALLBACK_PROVIDER, RULES_PROVIDER,
};

/// Request type recorded for calls to [`DecisionEngine::analyze_with_rules`].
pub const RULES_REQUEST_TYPE: &str = "rules";

// ---------------------------------------------------------------------------
// DecisionEngine
// ---------------------------------------------------------------------------

/// Composes the plugin registry, cache, rate limiter, performance monitor,
/// learning store and event bus into the analysis pipeline.
///
/// Each engine owns its own component instances, so several engines can
/// coexist in one process.
pub struct DecisionEngine {
    config:       EngineConfig,
    clock:        Arc<dyn Clock>,
    registry:     RwLock<PluginRegistry>,
    cache:        Arc<Mutex<ResultCache>>,
    rate_limiter: Mutex<RateLimiter>,
    monitor:      Mutex<PerformanceMonitor>,
    learning:     RwLock<LearningStore>,
    events:       EventBus,
    shut_down:    AtomicBool,
    maintenance:  Mutex<Option<JoinHandle<()>>>,
}

impl DecisionEngine {
    /// Build an engine that reads wall-clock time.
    ///
    /// When called inside a Tokio runtime with caching enabled, a
    /// maintenance task is spawned that purges expired cache entries every
    /// `caching.purge_interval_ms`.
    pub fn new(config: EngineConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Build an engine that reads time from `clock`.
    pub fn with_clock(config: EngineConfig, clock: Arc<dyn Clock>) -> Self {
        let now_ms = clock.now_ms();
        let cache = Arc::new(Mutex::new(ResultCache::new(config.caching.max_size)));
        let maintenance = spawn_maintenance(&config, Arc::clone(&cache), Arc::clone(&clock));

        info!(
            environment = %config.environment,
            caching = config.caching.enabled,
            rate_limiting = config.rate_limiting.enabled,
            "decision engine initialized"
        );

        Self {
            rate_limiter: Mutex::new(RateLimiter::new(
                config.rate_limiting.requests_per_minute,
                config.rate_limiting.requests_per_hour,
                now_ms,
            )),
            monitor: Mutex::new(PerformanceMonitor::new(config.performance.clone())),
            learning: RwLock::new(LearningStore::new(config.learning.max_records)),
            registry: RwLock::new(PluginRegistry::new()),
            events: EventBus::default(),
            shut_down: AtomicBool::new(false),
            maintenance: Mutex::new(maintenance),
            cache,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// `true` until [`shutdown`](Self::shutdown) is called.
    pub fn is_initialized(&self) -> bool {
        !self.shut_down.load(Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Analysis
    // -----------------------------------------------------------------------

    /// Analyze a loosely-typed request.
    ///
    /// `input` must be a JSON object.  Always resolves; failures are
    /// reported through `success` / `error`.
    ///
    /// Must be awaited inside a Tokio runtime.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use arbiter_core::{DecisionEngine, EngineConfig};
    /// use serde_json::json;
    ///
    /// # #[tokio::main(flavor = "current_thread")]
    /// # async fn main() {
    /// let engine = DecisionEngine::new(EngineConfig::default());
    /// let result = engine.analyze("sentiment", json!({ "text": "hello" }), None, None).await;
    /// // No analyzer loaded and no fallback requested.
    /// assert!(!result.success);
    /// assert_eq!(
    ///     result.error.as_deref(),
    ///     Some("no analyzer available for request type 'sentiment'")
    /// );
    /// # }
    /// ```
    pub async fn analyze(
        &self,
        request_type: &str,
        input: Value,
        context: Option<RequestContext>,
        options: Option<RequestOptions>,
    ) -> AnalysisResult {
        let request = match self.ensure_running().and_then(|()| AnalysisInput::from_value(input)) {
            Ok(input) => AnalysisRequest::new(request_type, input)
                .with_context(context.unwrap_or_default())
                .with_options(options.unwrap_or_default()),
            Err(error) => return rejected(error),
        };
        self.analyze_request(request).await
    }

    /// Analyze an already-typed request.
    pub async fn analyze_request(&self, request: AnalysisRequest) -> AnalysisResult {
        let span = analysis_span(&request.id, &request.request_type);
        self.run_pipeline(request).instrument(span).await
    }

    async fn run_pipeline(&self, request: AnalysisRequest) -> AnalysisResult {
        if let Err(error) = self.ensure_running().and_then(|()| validate_request(&request)) {
            debug!(%error, "request rejected");
            return rejected(error);
        }

        if let Err(error) = self.admit(&request) {
            return rejected(error);
        }

        let key = self.cache_key_for(&request);
        if let Some(hit) = key.as_deref().and_then(|key| self.cached(key)) {
            debug!(provider = %hit.provider, "served from cache");
            self.events.emit(EngineEvent::CacheHit {
                request_id: request.id.clone(),
                request_type: request.request_type.clone(),
            });
            return hit;
        }

        self.events.emit(EngineEvent::AnalysisStarted {
            request_id: request.id.clone(),
            request_type: request.request_type.clone(),
        });

        let started = Instant::now();
        let outcome = self.route(&request).await;
        let elapsed_ms = elapsed_since(started);

        let result = match outcome {
            Ok(result) => result.with_processing_time(elapsed_ms),
            Err(error) => {
                let provider = error.provider().unwrap_or(ENGINE_PROVIDER).to_owned();
                AnalysisResult::failure(error.to_string(), provider).with_processing_time(elapsed_ms)
            }
        };

        self.monitor
            .lock()
            .record_analysis(&request.request_type, elapsed_ms, result.success);

        if result.success && result.provider != FALLBACK_PROVIDER {
            if let Some(key) = key {
                self.store(key, &result);
            }
        }

        self.finish(&request, &result);
        result
    }

    /// Evaluate user-authored `rules` against `input.text`.
    ///
    /// Bypasses plugin routing, the cache and the rate limiter.
    pub fn analyze_with_rules(
        &self,
        input: Value,
        rules: &[Rule],
        context: Option<RequestContext>,
    ) -> AnalysisResult {
        let request = match self.ensure_running().and_then(|()| AnalysisInput::from_value(input)) {
            Ok(input) => AnalysisRequest::new(RULES_REQUEST_TYPE, input)
                .with_context(context.unwrap_or_default()),
            Err(error) => return rejected(error),
        };
        let _span = analysis_span(&request.id, &request.request_type).entered();

        let text = match request.input.text.as_deref().filter(|text| !text.trim().is_empty()) {
            Some(text) => text,
            None => {
                return rejected(EngineError::Validation {
                    reason: "input.text is required for rule evaluation".into(),
                })
            }
        };

        self.events.emit(EngineEvent::AnalysisStarted {
            request_id: request.id.clone(),
            request_type: request.request_type.clone(),
        });

        let started = Instant::now();
        let decision = evaluate_rules(text, rules);
        let result = AnalysisResult::success(decision, RULES_PROVIDER)
            .with_processing_time(elapsed_since(started))
            .with_metadata("rulesEvaluated", Value::from(rules.len()));

        self.finish(&request, &result);
        result
    }

    // -----------------------------------------------------------------------
    // Plugins
    // -----------------------------------------------------------------------

    /// Register `plugin` under `name` and emit `plugin_loaded`.
    ///
    /// # Errors
    ///
    /// [`EngineError::DuplicatePlugin`] or [`EngineError::InvalidPlugin`]
    /// leave the registry untouched.  [`EngineError::ShutDown`] after
    /// [`shutdown`](Self::shutdown).
    pub fn load_plugin(&self, name: &str, plugin: Arc<dyn AnalyzerPlugin>) -> EngineResult<()> {
        self.ensure_running()?;
        let version = plugin.version().to_owned();

        self.registry.write().register(name, plugin)?;

        info!(plugin = name, %version, "analyzer plugin loaded");
        self.events.emit(EngineEvent::PluginLoaded { name: name.to_owned(), version });
        Ok(())
    }

    /// Remove the plugin registered under `name`.  Returns whether one was
    /// removed.
    pub fn unload_plugin(&self, name: &str) -> bool {
        if !self.is_initialized() {
            return false;
        }
        let removed = self.registry.write().unregister(name);
        if removed {
            info!(plugin = name, "analyzer plugin unloaded");
        }
        removed
    }

    /// Registered plugin names in registration order.
    pub fn get_loaded_plugins(&self) -> Vec<String> {
        self.registry.read().names()
    }

    // -----------------------------------------------------------------------
    // Learning
    // -----------------------------------------------------------------------

    /// Append a (decision, outcome, feedback) record and emit
    /// `learning_updated`.
    ///
    /// # Errors
    ///
    /// [`EngineError::LearningDisabled`] when `features.learning_enabled`
    /// is off, [`EngineError::ShutDown`] after shutdown.
    pub fn record_learning(&self, record: LearningRecord) -> EngineResult<()> {
        self.ensure_running()?;
        if !self.config.features.learning_enabled {
            return Err(EngineError::LearningDisabled);
        }

        let user_id = record.user_id.clone();
        let total_records = self.learning.write().append(record);

        debug!(user_id = %user_id, total_records, "learning record appended");
        self.events.emit(EngineEvent::LearningUpdated { user_id, total_records });
        Ok(())
    }

    pub fn get_user_learning_data(&self, user_id: &str) -> Vec<LearningRecord> {
        self.learning.read().user_records(user_id)
    }

    pub fn get_system_learning_insights(&self) -> LearningInsights {
        self.learning.read().insights()
    }

    // -----------------------------------------------------------------------
    // Status, events, lifecycle
    // -----------------------------------------------------------------------

    pub fn get_status(&self) -> EngineStatus {
        let now_ms = self.clock.now_ms();
        let rate_limit_status = if self.config.rate_limiting.enabled {
            Some(self.rate_limiter.lock().status(now_ms))
        } else {
            None
        };

        let plugins_loaded = self.registry.read().len();
        let cache_size = self.cache.lock().stats();
        let learning_data_points = self.learning.read().len();

        EngineStatus {
            initialized: self.is_initialized(),
            plugins_loaded,
            cache_size,
            rate_limit_status,
            learning_data_points,
            performance: self.performance_snapshot(),
        }
    }

    pub fn performance_snapshot(&self) -> PerformanceSnapshot {
        self.monitor.lock().snapshot()
    }

    /// Drop every cached result.  Hit and miss counters are kept.
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Register `handler` for events of `kind`.
    pub fn add_event_listener<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        self.events.subscribe(kind, handler)
    }

    pub fn remove_event_listener(&self, id: ListenerId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Stop the maintenance task and reject every later call.  Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        self.stop_maintenance();
        info!("decision engine shut down");
    }

    // -----------------------------------------------------------------------
    // Pipeline stages
    // -----------------------------------------------------------------------

    fn ensure_running(&self) -> EngineResult<()> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(EngineError::ShutDown)
        }
    }

    fn admit(&self, request: &AnalysisRequest) -> EngineResult<()> {
        if !self.config.rate_limiting.enabled {
            return Ok(());
        }

        let now_ms = self.clock.now_ms();
        let allowed = self.rate_limiter.lock().is_allowed(now_ms);
        if allowed {
            return Ok(());
        }

        warn!("rate limit exceeded");
        self.events.emit(EngineEvent::RateLimitExceeded {
            request_id: request.id.clone(),
            request_type: request.request_type.clone(),
        });
        Err(EngineError::RateLimited)
    }

    fn cache_key_for(&self, request: &AnalysisRequest) -> Option<String> {
        if !(self.config.caching.enabled && request.options.caching) {
            return None;
        }
        match cache_key(request) {
            Ok(key) => Some(key),
            Err(error) => {
                warn!(%error, "bypassing cache");
                None
            }
        }
    }

    fn cached(&self, key: &str) -> Option<AnalysisResult> {
        let now_ms = self.clock.now_ms();
        let mut hit = self.cache.lock().get(key, now_ms)?;
        hit.from_cache = true;
        Some(hit)
    }

    fn store(&self, key: String, result: &AnalysisResult) {
        let now_ms = self.clock.now_ms();
        let stored = self
            .cache
            .lock()
            .set(key, result.clone(), self.config.caching.ttl_ms, now_ms);
        if let Err(error) = stored {
            warn!(%error, "result not cached");
        }
    }

    async fn route(&self, request: &AnalysisRequest) -> EngineResult<AnalysisResult> {
        let plugins = self.registry.read().snapshot();
        let mut candidates = select_candidates(plugins, request);
        if !self.config.features.multi_provider_enabled {
            candidates.truncate(1);
        }

        let timeout_ms = request.options.timeout_ms.unwrap_or(self.config.default_timeout_ms);
        let mut last_error = EngineError::NoAnalyzer { request_type: request.request_type.clone() };

        for candidate in candidates {
            match invoke(&candidate, request, timeout_ms).await {
                Ok(result) => return Ok(result),
                Err(error) => {
                    warn!(plugin = %candidate.name, %error, "analyzer failed");
                    self.events.emit(EngineEvent::PluginError {
                        request_id: request.id.clone(),
                        name: candidate.name.clone(),
                        error: error.to_string(),
                    });
                    last_error = error;
                }
            }
        }

        self.apply_fallback(request, last_error)
    }

    fn apply_fallback(
        &self,
        request: &AnalysisRequest,
        error: EngineError,
    ) -> EngineResult<AnalysisResult> {
        let strategy = request.options.fallback_strategy.unwrap_or(FallbackStrategy::Skip);
        if strategy != FallbackStrategy::Basic || !self.config.features.fallback_enabled {
            return Err(error);
        }

        let reason = error.to_string();
        debug!(%reason, "using basic fallback");
        let decision = basic_decision(request, &reason);
        Ok(AnalysisResult::success(decision, FALLBACK_PROVIDER)
            .with_metadata("fallbackReason", Value::String(reason)))
    }

    fn finish(&self, request: &AnalysisRequest, result: &AnalysisResult) {
        let span = Span::current();
        span.record("provider", result.provider.as_str());
        span.record("success", result.success);
        span.record("processing_time_ms", result.processing_time_ms);

        let event = match &result.error {
            None => EngineEvent::AnalysisCompleted {
                request_id: request.id.clone(),
                request_type: request.request_type.clone(),
                provider: result.provider.clone(),
                processing_time_ms: result.processing_time_ms,
            },
            Some(error) => EngineEvent::AnalysisFailed {
                request_id: request.id.clone(),
                request_type: request.request_type.clone(),
                error: error.clone(),
            },
        };
        self.events.emit(event);
    }

    fn stop_maintenance(&self) {
        let handle = self.maintenance.lock().take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for DecisionEngine {
    fn drop(&mut self) {
        self.stop_maintenance();
    }
}

impl std::fmt::Debug for DecisionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecisionEngine")
            .field("initialized", &self.is_initialized())
            .field("plugins", &self.get_loaded_plugins())
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_request(request: &AnalysisRequest) -> EngineResult<()> {
    if request.request_type.trim().is_empty() {
        return Err(EngineError::Validation { reason: "request type must not be empty".into() });
    }
    if request.options.timeout_ms == Some(0) {
        return Err(EngineError::Validation { reason: "timeout must be greater than zero".into() });
    }
    Ok(())
}

fn rejected(error: EngineError) -> AnalysisResult {
    AnalysisResult::failure(error.to_string(), ENGINE_PROVIDER)
}

fn elapsed_since(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// Run one candidate on its own task under `timeout_ms`.
async fn invoke(
    candidate: &RegisteredPlugin,
    request: &AnalysisRequest,
    timeout_ms: u64,
) -> EngineResult<AnalysisResult> {
    let plugin = Arc::clone(&candidate.plugin);
    let owned = request.clone();
    let mut handle = tokio::spawn(
        async move { plugin.analyze(&owned).await }
            .instrument(plugin_span(&candidate.name, timeout_ms)),
    );

    let joined = match tokio::time::timeout(Duration::from_millis(timeout_ms), &mut handle).await {
        Ok(joined) => joined,
        Err(_) => {
            // Best effort: a plugin blocking its worker thread keeps running.
            handle.abort();
            return Err(EngineError::Timeout { plugin: candidate.name.clone(), timeout_ms });
        }
    };

    let result = joined.map_err(|join_error| EngineError::Plugin {
        plugin: candidate.name.clone(),
        reason: if join_error.is_panic() {
            "plugin panicked".to_owned()
        } else {
            "plugin task cancelled".to_owned()
        },
    })?;

    let AnalysisResult { success, decision, error, metadata, .. } = result;
    match (success, decision) {
        (true, Some(decision)) => {
            let mut accepted = AnalysisResult::success(decision.normalized(), candidate.name.clone());
            accepted.metadata = metadata;
            Ok(accepted)
        }
        _ => Err(EngineError::Plugin {
            plugin: candidate.name.clone(),
            reason: error
                .filter(|reason| !reason.is_empty())
                .unwrap_or_else(|| "analyzer returned no decision".to_owned()),
        }),
    }
}

fn spawn_maintenance(
    config: &EngineConfig,
    cache: Arc<Mutex<ResultCache>>,
    clock: Arc<dyn Clock>,
) -> Option<JoinHandle<()>> {
    let interval_ms = config.caching.purge_interval_ms;
    if !config.caching.enabled || interval_ms == 0 {
        return None;
    }
    let runtime = Handle::try_current().ok()?;

    Some(runtime.spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_millis(interval_ms));
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let purged = cache.lock().purge_expired(clock.now_ms());
            if purged > 0 {
                debug!(purged, "expired cache entries purged");
            }
        }
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{Action, Decision};
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl AnalyzerPlugin for Echo {
        fn name(&self) -> &str { "echo" }
        fn version(&self) -> &str { "0.1.0" }
        fn supported_types(&self) -> &[String] {
            static TYPES: std::sync::OnceLock<Vec<String>> = std::sync::OnceLock::new();
            TYPES.get_or_init(|| vec!["echo".to_owned()])
        }
        async fn analyze(&self, _request: &AnalysisRequest) -> AnalysisResult {
            let decision = Decision { confidence: 250.0, ..Decision::new(Action::Wait, 0.0, vec![]) };
            AnalysisResult::success(decision, "whatever-the-plugin-says")
        }
    }

    fn engine() -> DecisionEngine {
        DecisionEngine::with_clock(EngineConfig::default(), Arc::new(ManualClock::new(0)))
    }

    #[tokio::test]
    async fn test_provider_is_registry_name_and_confidence_is_clamped() {
        let engine = engine();
        engine.load_plugin("echo-1", Arc::new(Echo)).unwrap();

        let result = engine.analyze("echo", json!({ "text": "x" }), None, None).await;
        assert!(result.success);
        assert_eq!(result.provider, "echo-1");
        assert_eq!(result.decision.unwrap().confidence, 100.0);
    }

    #[tokio::test]
    async fn test_empty_type_is_rejected_before_routing() {
        let engine = engine();
        let result = engine.analyze("  ", json!({ "text": "x" }), None, None).await;
        assert!(!result.success);
        assert!(result.error.unwrap().starts_with("invalid request"));
        assert_eq!(result.provider, ENGINE_PROVIDER);
        assert_eq!(engine.performance_snapshot().total_analyses, 0);
    }

    #[tokio::test]
    async fn test_maintenance_task_is_stopped_on_shutdown() {
        let engine = engine();
        assert!(engine.maintenance.lock().is_some());
        engine.shutdown();
        assert!(engine.maintenance.lock().is_none());
        assert!(!engine.get_status().initialized);
    }

    #[test]
    fn test_no_maintenance_task_outside_runtime() {
        let engine = engine();
        assert!(engine.maintenance.lock().is_none());
    }

    #[test]
    fn test_rules_require_text() {
        let engine = engine();
        let result = engine.analyze_with_rules(json!({ "title": "t" }), &[], None);
        assert!(!result.success);
        assert!(result.error.unwrap().contains("input.text"));
    }
}
