// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Engine events and the listener registry.
//!
//! Handlers run synchronously on the emitting task.  The listener list is
//! copied out under a short read lock, so a handler may itself register or
//! remove listeners without deadlocking.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    AnalysisStarted,
    AnalysisCompleted,
    AnalysisFailed,
    PluginLoaded,
    PluginError,
    CacheHit,
    RateLimitExceeded,
    LearningUpdated,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::AnalysisStarted   => "analysis_started",
            EventKind::AnalysisCompleted => "analysis_completed",
            EventKind::AnalysisFailed    => "analysis_failed",
            EventKind::PluginLoaded      => "plugin_loaded",
            EventKind::PluginError       => "plugin_error",
            EventKind::CacheHit          => "cache_hit",
            EventKind::RateLimitExceeded => "rate_limit_exceeded",
            EventKind::LearningUpdated   => "learning_updated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload delivered to listeners.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    AnalysisStarted {
        request_id: String,
        request_type: String,
    },
    AnalysisCompleted {
        request_id: String,
        request_type: String,
        provider: String,
        processing_time_ms: u64,
    },
    AnalysisFailed {
        request_id: String,
        request_type: String,
        error: String,
    },
    PluginLoaded {
        name: String,
        version: String,
    },
    PluginError {
        request_id: String,
        name: String,
        error: String,
    },
    CacheHit {
        request_id: String,
        request_type: String,
    },
    RateLimitExceeded {
        request_id: String,
        request_type: String,
    },
    LearningUpdated {
        user_id: String,
        total_records: usize,
    },
}

impl EngineEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            EngineEvent::AnalysisStarted { .. }   => EventKind::AnalysisStarted,
            EngineEvent::AnalysisCompleted { .. } => EventKind::AnalysisCompleted,
            EngineEvent::AnalysisFailed { .. }    => EventKind::AnalysisFailed,
            EngineEvent::PluginLoaded { .. }      => EventKind::PluginLoaded,
            EngineEvent::PluginError { .. }       => EventKind::PluginError,
            EngineEvent::CacheHit { .. }          => EventKind::CacheHit,
            EngineEvent::RateLimitExceeded { .. } => EventKind::RateLimitExceeded,
            EngineEvent::LearningUpdated { .. }   => EventKind::LearningUpdated,
        }
    }
}

pub type EventHandler = Arc<dyn Fn(&EngineEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Listener {
    id: ListenerId,
    kind: EventKind,
    handler: EventHandler,
}

/// Registry of event listeners.
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use arbiter_core::events::{EngineEvent, EventBus, EventKind};
///
/// let bus = EventBus::default();
/// let seen = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&seen);
/// bus.subscribe(EventKind::PluginLoaded, move |_| {
///     counter.fetch_add(1, Ordering::SeqCst);
/// });
///
/// bus.emit(EngineEvent::PluginLoaded { name: "p".into(), version: "1".into() });
/// bus.emit(EngineEvent::LearningUpdated { user_id: "u".into(), total_records: 1 });
/// assert_eq!(seen.load(Ordering::SeqCst), 1);
/// ```
#[derive(Default)]
pub struct EventBus {
    listeners: RwLock<Vec<Listener>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&EngineEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.write().push(Listener {
            id,
            kind,
            handler: Arc::new(handler),
        });
        id
    }

    /// Remove a listener.  Returns whether it was registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|listener| listener.id != id);
        listeners.len() != before
    }

    pub fn emit(&self, event: EngineEvent) {
        let kind = event.kind();
        let handlers: Vec<EventHandler> = self
            .listeners
            .read()
            .iter()
            .filter(|listener| listener.kind == kind)
            .map(|listener| Arc::clone(&listener.handler))
            .collect();

        for handler in handlers {
            handler(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}
