// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Fixed-window admission control.
//!
//! [`RateLimiter`] keeps two independent windows, one minute and one hour.
//! A request is admitted only when **both** windows have headroom, in which
//! case both counters are incremented together.  A denied request touches
//! neither counter.
//!
//! Windows reset only when the clock crosses their boundary; counts never go
//! negative.

use serde::{Deserialize, Serialize};

use crate::types::{RateLimitStatus, WindowStatus};

pub const MINUTE_MS: u64 = 60_000;
pub const HOUR_MS: u64 = 3_600_000;

/// One fixed counting window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateWindow {
    pub count: u32,
    pub reset_at_ms: u64,
    pub length_ms: u64,
    pub limit: u32,
}

impl RateWindow {
    pub fn new(limit: u32, length_ms: u64, now_ms: u64) -> Self {
        Self {
            count: 0,
            reset_at_ms: now_ms.saturating_add(length_ms),
            length_ms,
            limit,
        }
    }

    /// Reset the count if `now_ms` has reached the boundary.  The boundary
    /// advances by whole window lengths so it always lands in the future.
    fn roll(&mut self, now_ms: u64) {
        if now_ms < self.reset_at_ms {
            return;
        }
        self.count = 0;
        let length = self.length_ms.max(1);
        let elapsed_windows = (now_ms - self.reset_at_ms) / length + 1;
        self.reset_at_ms = self
            .reset_at_ms
            .saturating_add(elapsed_windows.saturating_mul(length));
    }

    fn has_capacity(&self) -> bool {
        self.count < self.limit
    }

    /// Status as of `now_ms`, without mutating the window.
    fn status(&self, now_ms: u64) -> WindowStatus {
        let (count, reset_at_ms) = if now_ms >= self.reset_at_ms {
            let length = self.length_ms.max(1);
            let elapsed_windows = (now_ms - self.reset_at_ms) / length + 1;
            (0, self.reset_at_ms.saturating_add(elapsed_windows.saturating_mul(length)))
        } else {
            (self.count, self.reset_at_ms)
        };
        WindowStatus {
            count,
            limit: self.limit,
            remaining: self.limit.saturating_sub(count),
            reset_at_ms,
        }
    }
}

/// Per-minute / per-hour limiter.
///
/// # Examples
///
/// ```rust
/// use arbiter_core::rate_limit::{RateLimiter, MINUTE_MS};
///
/// let mut limiter = RateLimiter::new(2, 100, 0);
/// assert!(limiter.is_allowed(0));
/// assert!(limiter.is_allowed(1));
/// assert!(!limiter.is_allowed(2));
///
/// // The minute window has elapsed.
/// assert!(limiter.is_allowed(MINUTE_MS));
/// ```
#[derive(Debug, Clone)]
pub struct RateLimiter {
    minute: RateWindow,
    hour: RateWindow,
}

impl RateLimiter {
    pub fn new(requests_per_minute: u32, requests_per_hour: u32, now_ms: u64) -> Self {
        Self {
            minute: RateWindow::new(requests_per_minute, MINUTE_MS, now_ms),
            hour: RateWindow::new(requests_per_hour, HOUR_MS, now_ms),
        }
    }

    /// Admit or deny one request at `now_ms`.
    pub fn is_allowed(&mut self, now_ms: u64) -> bool {
        self.minute.roll(now_ms);
        self.hour.roll(now_ms);

        if !(self.minute.has_capacity() && self.hour.has_capacity()) {
            return false;
        }

        self.minute.count += 1;
        self.hour.count += 1;
        true
    }

    pub fn status(&self, now_ms: u64) -> RateLimitStatus {
        RateLimitStatus {
            minute: self.minute.status(now_ms),
            hour: self.hour.status(now_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_denied_requests_do_not_increment() {
        let mut limiter = RateLimiter::new(1, 10, 0);
        assert!(limiter.is_allowed(0));
        assert!(!limiter.is_allowed(1));
        assert!(!limiter.is_allowed(2));

        let status = limiter.status(3);
        assert_eq!(status.minute.count, 1);
        assert_eq!(status.hour.count, 1);
        assert_eq!(status.minute.remaining, 0);
        assert_eq!(status.hour.remaining, 9);
    }

    #[test]
    fn test_hour_window_blocks_without_partial_admission() {
        let mut limiter = RateLimiter::new(10, 2, 0);
        assert!(limiter.is_allowed(0));
        assert!(limiter.is_allowed(MINUTE_MS));
        // Minute window rolled and has room, hour window is full.
        assert!(!limiter.is_allowed(2 * MINUTE_MS));

        let status = limiter.status(2 * MINUTE_MS);
        assert_eq!(status.minute.count, 0);
        assert_eq!(status.hour.count, 2);
    }

    #[test]
    fn test_window_resets_only_at_boundary() {
        let mut limiter = RateLimiter::new(1, 100, 0);
        assert!(limiter.is_allowed(0));
        assert!(!limiter.is_allowed(MINUTE_MS - 1));
        assert!(limiter.is_allowed(MINUTE_MS));
    }

    #[test]
    fn test_boundary_advances_past_long_idle_periods() {
        let mut limiter = RateLimiter::new(1, 1_000, 0);
        assert!(limiter.is_allowed(0));
        // Idle for several windows.
        assert!(limiter.is_allowed(5 * MINUTE_MS + 10));
        let status = limiter.status(5 * MINUTE_MS + 10);
        assert_eq!(status.minute.reset_at_ms, 6 * MINUTE_MS);
        assert!(!limiter.is_allowed(6 * MINUTE_MS - 1));
    }

    #[test]
    fn test_status_reports_reset_without_mutation() {
        let mut limiter = RateLimiter::new(1, 1_000, 0);
        assert!(limiter.is_allowed(0));
        let status = limiter.status(MINUTE_MS + 5);
        assert_eq!(status.minute.count, 0);
        assert_eq!(status.minute.remaining, 1);
        assert_eq!(status.minute.reset_at_ms, 2 * MINUTE_MS);
    }
}
