// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Bounded result cache with lazy TTL expiry.
//!
//! [`ResultCache`] exposes two core operations:
//!
//! * [`get`](ResultCache::get) - look up a live entry (expired hits count as misses)
//! * [`set`](ResultCache::set) - insert, evicting the oldest insertion at capacity
//!
//! Eviction is by insertion order, not recency: reading an entry does not
//! protect it.  Re-setting an existing key counts as a fresh insertion.
//!
//! [`cache_key`] derives the deterministic key for a request.

use std::collections::VecDeque;
use std::fmt::Write as _;

use hashbrown::HashMap;
use serde_json::Value;

use crate::error::{EngineError, EngineResult};
use crate::types::{AnalysisRequest, AnalysisResult, CacheStats};

/// A stored result together with its insertion time and lifetime.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub key: String,
    pub value: AnalysisResult,
    pub inserted_at_ms: u64,
    pub ttl_ms: u64,
}

impl CacheEntry {
    /// An entry is live for `ttl_ms` after insertion.
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms >= self.inserted_at_ms.saturating_add(self.ttl_ms)
    }
}

/// Insertion-ordered, capacity-bounded cache of successful analysis results.
///
/// # Examples
///
/// ```rust
/// use arbiter_core::cache::ResultCache;
/// use arbiter_core::types::{Action, AnalysisResult, Decision};
///
/// let mut cache = ResultCache::new(2);
/// let result = AnalysisResult::success(Decision::new(Action::Wait, 40.0, vec![]), "p");
///
/// cache.set("a", result.clone(), 1_000, 0).unwrap();
/// assert!(cache.get("a", 500).is_some());
/// // Expired on read: counted as a miss and removed.
/// assert!(cache.get("a", 1_000).is_none());
/// assert_eq!(cache.stats().keys, 0);
/// ```
#[derive(Debug)]
pub struct ResultCache {
    max_size: usize,
    entries: HashMap<String, CacheEntry>,
    /// Keys oldest-first.
    order: VecDeque<String>,
    hits: u64,
    misses: u64,
}

impl ResultCache {
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size,
            entries: HashMap::new(),
            order: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Return a clone of the live value for `key`.
    ///
    /// A missing or expired entry increments the miss counter; an expired
    /// entry is removed.
    pub fn get(&mut self, key: &str, now_ms: u64) -> Option<AnalysisResult> {
        let expired = match self.entries.get(key) {
            None => {
                self.misses += 1;
                return None;
            }
            Some(entry) => entry.is_expired(now_ms),
        };

        if expired {
            self.remove(key);
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Insert `value` under `key` for `ttl_ms`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Cache`] when the cache has zero capacity.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: AnalysisResult,
        ttl_ms: u64,
        now_ms: u64,
    ) -> EngineResult<()> {
        if self.max_size == 0 {
            return Err(EngineError::Cache("cache capacity is zero".into()));
        }

        let key = key.into();
        if self.entries.contains_key(&key) {
            self.remove(&key);
        }

        while self.entries.len() >= self.max_size {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(
            key.clone(),
            CacheEntry { key, value, inserted_at_ms: now_ms, ttl_ms },
        );
        Ok(())
    }

    /// Drop every expired entry.  Returns how many were removed.
    pub fn purge_expired(&mut self, now_ms: u64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now_ms));
        let entries = &self.entries;
        self.order.retain(|key| entries.contains_key(key));
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            keys: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }

    fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|existing| existing != key);
        }
    }
}

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

/// Derive the cache key for `request`.
///
/// The key covers the request type, input, context and fallback strategy.
/// Request id, timestamp, timeout and priority are excluded so logically
/// identical requests share a key.  Object keys are emitted in sorted order,
/// so field order in the caller's JSON never matters.
///
/// # Errors
///
/// Returns [`EngineError::Cache`] if part of the request cannot be
/// serialised.
pub fn cache_key(request: &AnalysisRequest) -> EngineResult<String> {
    let to_value = |part: &str, value: Result<Value, serde_json::Error>| {
        value.map_err(|error| EngineError::Cache(format!("cannot serialise {part}: {error}")))
    };

    let input = to_value("input", serde_json::to_value(&request.input))?;
    let context = to_value("context", serde_json::to_value(&request.context))?;
    let fallback = to_value(
        "options",
        serde_json::to_value(request.options.fallback_strategy),
    )?;

    let mut key = String::with_capacity(128);
    key.push_str(&request.request_type);
    key.push('|');
    write_canonical(&input, &mut key);
    key.push('|');
    write_canonical(&context, &mut key);
    key.push('|');
    write_canonical(&fallback, &mut key);
    Ok(key)
}

/// Serialise `value` as compact JSON with object keys sorted.
fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            out.push('{');
            for (index, key) in keys.into_iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                let _ = write!(out, "{}", Value::String(key.clone()));
                out.push(':');
                write_canonical(&map[key], out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => {
            let _ = write!(out, "{scalar}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, AnalysisInput, Decision, FallbackStrategy, RequestOptions};
    use serde_json::json;

    fn result(confidence: f64) -> AnalysisResult {
        AnalysisResult::success(Decision::new(Action::Execute, confidence, vec![]), "test")
    }

    #[test]
    fn test_hit_and_miss_counters() {
        let mut cache = ResultCache::new(4);
        assert!(cache.get("missing", 0).is_none());
        cache.set("k", result(10.0), 1_000, 0).unwrap();
        assert!(cache.get("k", 10).is_some());
        assert!(cache.get("k", 20).is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.keys, 1);
    }

    #[test]
    fn test_expired_entry_counts_as_miss_and_is_removed() {
        let mut cache = ResultCache::new(4);
        cache.set("k", result(10.0), 100, 0).unwrap();
        assert!(cache.get("k", 150).is_none());
        assert_eq!(cache.stats(), CacheStats { keys: 0, hits: 0, misses: 1 });
    }

    #[test]
    fn test_evicts_oldest_insertion_not_least_recent() {
        let mut cache = ResultCache::new(2);
        cache.set("first", result(1.0), 10_000, 0).unwrap();
        cache.set("second", result(2.0), 10_000, 1).unwrap();
        // Reading "first" does not protect it.
        assert!(cache.get("first", 2).is_some());
        cache.set("third", result(3.0), 10_000, 3).unwrap();

        assert!(cache.get("first", 4).is_none());
        assert!(cache.get("second", 4).is_some());
        assert!(cache.get("third", 4).is_some());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_reinsert_moves_key_to_back() {
        let mut cache = ResultCache::new(2);
        cache.set("a", result(1.0), 10_000, 0).unwrap();
        cache.set("b", result(2.0), 10_000, 1).unwrap();
        cache.set("a", result(3.0), 10_000, 2).unwrap();
        cache.set("c", result(4.0), 10_000, 3).unwrap();

        assert!(cache.get("b", 4).is_none());
        let a = cache.get("a", 4).unwrap();
        assert_eq!(a.decision.unwrap().confidence, 3.0);
    }

    #[test]
    fn test_zero_capacity_is_a_cache_error() {
        let mut cache = ResultCache::new(0);
        assert!(matches!(cache.set("k", result(1.0), 10, 0), Err(EngineError::Cache(_))));
    }

    #[test]
    fn test_purge_expired() {
        let mut cache = ResultCache::new(8);
        cache.set("short", result(1.0), 10, 0).unwrap();
        cache.set("long", result(1.0), 1_000, 0).unwrap();
        assert_eq!(cache.purge_expired(50), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_key_ignores_field_order_and_request_identity() {
        let first = AnalysisRequest::new(
            "sentiment",
            AnalysisInput::from_value(json!({ "text": "hi", "extra": { "a": 1, "b": 2 } })).unwrap(),
        );
        let second = AnalysisRequest::new(
            "sentiment",
            AnalysisInput::from_value(json!({ "extra": { "b": 2, "a": 1 }, "text": "hi" })).unwrap(),
        );
        assert_ne!(first.id, second.id);
        assert_eq!(cache_key(&first).unwrap(), cache_key(&second).unwrap());
    }

    #[test]
    fn test_cache_key_distinguishes_type_and_fallback() {
        let input = AnalysisInput::from_text("hi");
        let base = AnalysisRequest::new("sentiment", input.clone());
        let other_type = AnalysisRequest::new("proposal", input.clone());
        let with_fallback = AnalysisRequest::new("sentiment", input)
            .with_options(RequestOptions::with_fallback(FallbackStrategy::Basic));

        let base_key = cache_key(&base).unwrap();
        assert_ne!(base_key, cache_key(&other_type).unwrap());
        assert_ne!(base_key, cache_key(&with_fallback).unwrap());
    }
}
