// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Rolling latency and success metrics.
//!
//! [`PerformanceMonitor::record_analysis`] updates global totals, a capped
//! buffer of recent latencies, and a capped per-type buffer.  Threshold
//! breaches are reported as [`PerformanceWarning`]s and logged at `warn`.
//! They never alter analysis results.

use std::collections::{BTreeMap, VecDeque};
use std::fmt;

use hashbrown::HashMap;
use tracing::warn;

use crate::config::PerformanceConfig;
use crate::types::{PerformanceSnapshot, TypeStats};

/// A non-fatal threshold breach.
#[derive(Debug, Clone, PartialEq)]
pub enum PerformanceWarning {
    /// A single call exceeded the absolute latency threshold.
    SlowAnalysis { request_type: String, elapsed_ms: u64, threshold_ms: u64 },
    /// A type's rolling average exceeded its threshold.
    SlowAverage { request_type: String, average_ms: f64, threshold_ms: u64 },
    /// Global success rate fell below the floor after enough samples.
    LowSuccessRate { success_rate: f64, threshold: f64, samples: u64 },
}

impl fmt::Display for PerformanceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceWarning::SlowAnalysis { request_type, elapsed_ms, threshold_ms } => write!(
                f,
                "analysis of type '{request_type}' took {elapsed_ms}ms (threshold {threshold_ms}ms)"
            ),
            PerformanceWarning::SlowAverage { request_type, average_ms, threshold_ms } => write!(
                f,
                "rolling average for type '{request_type}' is {average_ms:.1}ms (threshold {threshold_ms}ms)"
            ),
            PerformanceWarning::LowSuccessRate { success_rate, threshold, samples } => write!(
                f,
                "success rate {:.1}% over {samples} analyses is below {:.1}%",
                success_rate * 100.0,
                threshold * 100.0
            ),
        }
    }
}

#[derive(Debug)]
pub struct PerformanceMonitor {
    config: PerformanceConfig,
    total: u64,
    succeeded: u64,
    failed: u64,
    recent: VecDeque<u64>,
    by_type: HashMap<String, VecDeque<u64>>,
}

impl PerformanceMonitor {
    pub fn new(config: PerformanceConfig) -> Self {
        Self {
            config,
            total: 0,
            succeeded: 0,
            failed: 0,
            recent: VecDeque::new(),
            by_type: HashMap::new(),
        }
    }

    /// Record one terminal analysis outcome and return any warnings it
    /// triggered.
    pub fn record_analysis(
        &mut self,
        request_type: &str,
        elapsed_ms: u64,
        success: bool,
    ) -> Vec<PerformanceWarning> {
        self.total += 1;
        if success {
            self.succeeded += 1;
        } else {
            self.failed += 1;
        }

        let window = self.config.window_size.max(1);
        push_capped(&mut self.recent, elapsed_ms, window);
        let samples = self
            .by_type
            .entry_ref(request_type)
            .or_insert_with(VecDeque::new);
        push_capped(samples, elapsed_ms, window);
        let type_average = mean(samples);

        let mut warnings = Vec::new();
        if elapsed_ms > self.config.slow_analysis_ms {
            warnings.push(PerformanceWarning::SlowAnalysis {
                request_type: request_type.to_owned(),
                elapsed_ms,
                threshold_ms: self.config.slow_analysis_ms,
            });
        }
        if type_average > self.config.slow_average_ms as f64 {
            warnings.push(PerformanceWarning::SlowAverage {
                request_type: request_type.to_owned(),
                average_ms: type_average,
                threshold_ms: self.config.slow_average_ms,
            });
        }
        if self.total >= self.config.min_samples {
            let success_rate = self.success_rate();
            if success_rate < self.config.min_success_rate {
                warnings.push(PerformanceWarning::LowSuccessRate {
                    success_rate,
                    threshold: self.config.min_success_rate,
                    samples: self.total,
                });
            }
        }

        for warning in &warnings {
            warn!(request_type, %warning, "performance threshold breached");
        }
        warnings
    }

    pub fn total_analyses(&self) -> u64 {
        self.total
    }

    fn success_rate(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.succeeded as f64 / self.total as f64
        }
    }

    pub fn snapshot(&self) -> PerformanceSnapshot {
        let by_type: BTreeMap<String, TypeStats> = self
            .by_type
            .iter()
            .filter(|(_, samples)| !samples.is_empty())
            .map(|(request_type, samples)| (request_type.clone(), type_stats(samples)))
            .collect();

        PerformanceSnapshot {
            total_analyses: self.total,
            successful_analyses: self.succeeded,
            failed_analyses: self.failed,
            success_rate: self.success_rate(),
            average_ms: mean(&self.recent),
            peak_ms: self.recent.iter().copied().max().unwrap_or(0),
            by_type,
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn push_capped(buffer: &mut VecDeque<u64>, value: u64, capacity: usize) {
    buffer.push_back(value);
    while buffer.len() > capacity {
        buffer.pop_front();
    }
}

fn mean(samples: &VecDeque<u64>) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    samples.iter().sum::<u64>() as f64 / samples.len() as f64
}

fn type_stats(samples: &VecDeque<u64>) -> TypeStats {
    let mut sorted: Vec<u64> = samples.iter().copied().collect();
    sorted.sort_unstable();
    let len = sorted.len();
    let median_ms = if len % 2 == 0 {
        (sorted[len / 2 - 1] + sorted[len / 2]) as f64 / 2.0
    } else {
        sorted[len / 2] as f64
    };
    TypeStats {
        samples: len,
        average_ms: mean(samples),
        min_ms: sorted[0],
        max_ms: sorted[len - 1],
        median_ms,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> PerformanceMonitor {
        PerformanceMonitor::new(PerformanceConfig {
            slow_analysis_ms: 1_000,
            slow_average_ms: 500,
            min_success_rate: 0.5,
            min_samples: 4,
            window_size: 3,
        })
    }

    #[test]
    fn test_totals_and_rolling_buffers() {
        let mut monitor = monitor();
        for elapsed in [10, 20, 30, 40] {
            monitor.record_analysis("sentiment", elapsed, true);
        }
        monitor.record_analysis("proposal", 5, false);

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.total_analyses, 5);
        assert_eq!(snapshot.successful_analyses, 4);
        assert_eq!(snapshot.failed_analyses, 1);
        // Global window holds the last three samples: 30, 40, 5.
        assert_eq!(snapshot.peak_ms, 40);
        assert_eq!(snapshot.average_ms, 25.0);

        let sentiment = &snapshot.by_type["sentiment"];
        assert_eq!(sentiment.samples, 3);
        assert_eq!(sentiment.min_ms, 20);
        assert_eq!(sentiment.max_ms, 40);
        assert_eq!(sentiment.median_ms, 30.0);
    }

    #[test]
    fn test_slow_call_and_slow_average_warnings() {
        let mut monitor = monitor();
        let warnings = monitor.record_analysis("proposal", 1_500, true);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, PerformanceWarning::SlowAnalysis { .. })));
        assert!(warnings
            .iter()
            .any(|w| matches!(w, PerformanceWarning::SlowAverage { .. })));
    }

    #[test]
    fn test_success_rate_warning_waits_for_min_samples() {
        let mut monitor = monitor();
        for _ in 0..3 {
            let warnings = monitor.record_analysis("t", 1, false);
            assert!(warnings.is_empty());
        }
        let warnings = monitor.record_analysis("t", 1, false);
        assert!(matches!(
            warnings.as_slice(),
            [PerformanceWarning::LowSuccessRate { samples: 4, .. }]
        ));
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = monitor().snapshot();
        assert_eq!(snapshot.total_analyses, 0);
        assert_eq!(snapshot.success_rate, 1.0);
        assert!(snapshot.by_type.is_empty());
    }
}
