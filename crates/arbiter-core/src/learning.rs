// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Outcome and feedback log.
//!
//! [`LearningStore`] exposes three operations only:
//!
//! * [`append`](LearningStore::append)             - record a (decision, outcome, feedback) tuple
//! * [`user_records`](LearningStore::user_records) - every retained record for one user
//! * [`insights`](LearningStore::insights)         - aggregate statistics
//!
//! Records are immutable once appended.  Plain successes (no feedback,
//! successful outcome) and informative records (feedback or a failure) are
//! queued separately.  Informative records may fill at most
//! [`informative_capacity`] slots; past that the oldest informative record is
//! evicted, otherwise the oldest plain success goes first.  The record just
//! appended is never the victim while anything older remains.

use std::collections::VecDeque;
use std::sync::Arc;

use hashbrown::HashMap;

use crate::types::{FailureReason, LearningInsights, LearningRecord};

/// How many failure reasons [`LearningStore::insights`] reports.
pub const TOP_FAILURE_REASONS: usize = 10;

/// Slots informative records may occupy out of `max_records`.  A quarter of
/// the capacity stays reserved for plain successes.
pub fn informative_capacity(max_records: usize) -> usize {
    max_records - max_records / 4
}

#[derive(Debug)]
pub struct LearningStore {
    max_records: usize,
    /// Plain successes, oldest first.
    plain: VecDeque<Arc<LearningRecord>>,
    /// Records with feedback or a failed outcome, oldest first.
    informative: VecDeque<Arc<LearningRecord>>,
    by_user: HashMap<String, Vec<Arc<LearningRecord>>>,
}

impl LearningStore {
    pub fn new(max_records: usize) -> Self {
        Self {
            max_records,
            plain: VecDeque::new(),
            informative: VecDeque::new(),
            by_user: HashMap::new(),
        }
    }

    /// Append `record` and enforce the capacity.  Returns the number of
    /// retained records.
    pub fn append(&mut self, record: LearningRecord) -> usize {
        let record = Arc::new(record);
        self.by_user
            .entry(record.user_id.clone())
            .or_default()
            .push(Arc::clone(&record));
        if record.is_informative() {
            self.informative.push_back(Arc::clone(&record));
        } else {
            self.plain.push_back(Arc::clone(&record));
        }

        while self.len() > self.max_records {
            let evict_informative = self.informative.len() > informative_capacity(self.max_records)
                || self.plain.is_empty();
            let (chosen, other) = if evict_informative {
                (&mut self.informative, &mut self.plain)
            } else {
                (&mut self.plain, &mut self.informative)
            };
            let newest_first = chosen.front().is_some_and(|front| Arc::ptr_eq(front, &record));
            let queue = if newest_first && !other.is_empty() { other } else { chosen };
            if let Some(evicted) = queue.pop_front() {
                self.unindex(&evicted);
            }
        }
        self.len()
    }

    /// Every retained record for `user_id`, oldest first.
    pub fn user_records(&self, user_id: &str) -> Vec<LearningRecord> {
        self.by_user
            .get(user_id)
            .map(|records| records.iter().map(|record| (**record).clone()).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.plain.len() + self.informative.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate statistics over every retained record.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use arbiter_core::learning::LearningStore;
    ///
    /// let insights = LearningStore::new(10).insights();
    /// assert_eq!(insights.total_sessions, 0);
    /// assert_eq!(insights.success_rate, 0.0);
    /// ```
    pub fn insights(&self) -> LearningInsights {
        let total = self.len();
        if total == 0 {
            return LearningInsights {
                total_sessions: 0,
                avg_confidence: 0.0,
                success_rate: 0.0,
                top_failure_reasons: Vec::new(),
            };
        }

        let confidence_sum: f64 = self.records().map(|record| record.decision.confidence).sum();
        let successes = self.records().filter(|record| record.actual_outcome.success).count();

        let mut reasons: HashMap<&str, usize> = HashMap::new();
        for error in self.records().flat_map(|record| record.actual_outcome.errors.iter()) {
            *reasons.entry(error.as_str()).or_insert(0) += 1;
        }
        let mut top_failure_reasons: Vec<FailureReason> = reasons
            .into_iter()
            .map(|(reason, count)| FailureReason { reason: reason.to_owned(), count })
            .collect();
        top_failure_reasons.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.reason.cmp(&b.reason)));
        top_failure_reasons.truncate(TOP_FAILURE_REASONS);

        LearningInsights {
            total_sessions: total,
            avg_confidence: confidence_sum / total as f64,
            success_rate: successes as f64 / total as f64,
            top_failure_reasons,
        }
    }

    fn records(&self) -> impl Iterator<Item = &Arc<LearningRecord>> {
        self.plain.iter().chain(self.informative.iter())
    }

    fn unindex(&mut self, evicted: &Arc<LearningRecord>) {
        if let Some(records) = self.by_user.get_mut(&evicted.user_id) {
            records.retain(|record| !Arc::ptr_eq(record, evicted));
            if records.is_empty() {
                self.by_user.remove(&evicted.user_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, ActualOutcome, Decision, RequestContext, UserFeedback};

    fn record(user: &str, success: bool, confidence: f64, errors: &[&str]) -> LearningRecord {
        LearningRecord {
            user_id: user.into(),
            session_id: "session".into(),
            request_id: format!("req-{user}-{confidence}"),
            decision: Decision::new(Action::Execute, confidence, vec![]),
            actual_outcome: ActualOutcome {
                success,
                errors: errors.iter().map(|e| e.to_string()).collect(),
                timestamp_ms: 0,
            },
            user_feedback: None,
            timestamp_ms: 0,
            context: RequestContext::default(),
        }
    }

    #[test]
    fn test_success_rate_and_confidence() {
        let mut store = LearningStore::new(100);
        for _ in 0..3 {
            store.append(record("alice", true, 80.0, &[]));
        }
        store.append(record("bob", false, 40.0, &["slippage"]));

        let insights = store.insights();
        assert_eq!(insights.total_sessions, 4);
        assert!((insights.success_rate - 0.75).abs() < 1e-9);
        assert!((insights.avg_confidence - 70.0).abs() < 1e-9);
        assert_eq!(
            insights.top_failure_reasons,
            vec![FailureReason { reason: "slippage".into(), count: 1 }]
        );
    }

    #[test]
    fn test_failure_reasons_are_ranked() {
        let mut store = LearningStore::new(100);
        store.append(record("a", false, 10.0, &["gas", "timeout"]));
        store.append(record("a", false, 10.0, &["gas"]));
        store.append(record("a", false, 10.0, &["auth"]));

        let reasons = store.insights().top_failure_reasons;
        assert_eq!(reasons[0], FailureReason { reason: "gas".into(), count: 2 });
        assert_eq!(reasons[1].reason, "auth");
        assert_eq!(reasons[2].reason, "timeout");
    }

    #[test]
    fn test_user_index() {
        let mut store = LearningStore::new(100);
        store.append(record("alice", true, 10.0, &[]));
        store.append(record("bob", true, 20.0, &[]));
        store.append(record("alice", false, 30.0, &[]));

        let alice = store.user_records("alice");
        assert_eq!(alice.len(), 2);
        assert_eq!(alice[1].decision.confidence, 30.0);
        assert!(store.user_records("carol").is_empty());
    }

    #[test]
    fn test_eviction_prefers_plain_successes() {
        let mut store = LearningStore::new(2);
        store.append(record("failed", false, 10.0, &["boom"]));
        store.append(record("plain", true, 20.0, &[]));
        store.append(record("late", false, 30.0, &[]));

        assert_eq!(store.len(), 2);
        assert!(store.user_records("plain").is_empty());
        assert_eq!(store.user_records("failed").len(), 1);
        assert_eq!(store.user_records("late").len(), 1);
    }

    #[test]
    fn test_new_successes_survive_a_store_full_of_failures() {
        let mut store = LearningStore::new(4);
        for n in 0..4 {
            store.append(record("failed", false, n as f64, &["reverted"]));
        }
        assert_eq!(store.insights().success_rate, 0.0);

        for n in 0..100 {
            let mut success = record("fresh", true, 50.0, &[]);
            success.request_id = format!("fresh-{n}");
            assert_eq!(store.append(success), 4);
            assert!(!store.user_records("fresh").is_empty());
        }

        let fresh = store.user_records("fresh");
        assert_eq!(fresh.len(), 4 - informative_capacity(4));
        assert_eq!(fresh[0].request_id, "fresh-99");
        assert_eq!(store.user_records("failed").len(), informative_capacity(4));
        assert!(store.insights().success_rate > 0.0);
    }

    #[test]
    fn test_newest_record_is_kept_at_capacity_one() {
        let mut store = LearningStore::new(1);
        store.append(record("old", false, 1.0, &[]));
        store.append(record("new", true, 2.0, &[]));
        assert_eq!(store.len(), 1);
        assert_eq!(store.user_records("new").len(), 1);
        assert!(store.user_records("old").is_empty());
    }

    #[test]
    fn test_eviction_hard_cap_when_all_informative() {
        let mut store = LearningStore::new(2);
        let mut with_feedback = record("first", true, 10.0, &[]);
        with_feedback.user_feedback = Some(UserFeedback { rating: 5, correctness: true, helpfulness: 4 });
        store.append(with_feedback);
        store.append(record("second", false, 20.0, &[]));
        store.append(record("third", false, 30.0, &[]));

        assert_eq!(store.len(), 2);
        assert!(store.user_records("first").is_empty());
    }
}
