//! Per-identifier login throttling
//!
//! Tracks consecutive failed login attempts per normalized identifier in a
//! sliding window measured from the first failure of the current streak.
//! Once the configured threshold is reached, further attempts are rejected
//! before any store lookup or hash work happens, until the window elapses.
//!
//! State is process-local and injected through AppState; a multi-instance
//! deployment needs a shared counter store behind the same interface.

use crate::config::ThrottleConfig;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Map size at which `record_failure` sweeps out expired entries. Without
/// the sweep, failures spread across unique identifiers would grow the map
/// without bound, since an entry is otherwise only evicted when its own key
/// is checked again.
const SWEEP_THRESHOLD: usize = 1024;

/// Outcome of a throttle check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleDecision {
    Allowed,
    Blocked { retry_after_secs: u64 },
}

/// Failure streak for one identifier
struct FailureWindow {
    count: u32,
    first_failure: Instant,
}

/// Login attempt throttle
///
/// All operations take the single map lock, so check-and-increment is
/// atomic: concurrent failures for one identifier cannot race past the
/// threshold, and a success cannot lose its reset.
pub struct LoginThrottle {
    max_failures: u32,
    window: Duration,
    entries: Mutex<HashMap<String, FailureWindow>>,
}

impl LoginThrottle {
    pub fn new(config: &ThrottleConfig) -> Self {
        Self {
            max_failures: config.max_failures,
            window: Duration::from_secs(config.window_secs),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the counter map, recovering from poisoning
    ///
    /// The map holds discardable counters, so a panic elsewhere while the
    /// lock was held must not take logins down with it.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, FailureWindow>> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether a login attempt for `key` may proceed
    ///
    /// An entry whose window has elapsed is removed, reverting the
    /// identifier to the clear state.
    pub fn check(&self, key: &str) -> ThrottleDecision {
        let mut entries = self.lock_entries();

        let Some(entry) = entries.get(key) else {
            return ThrottleDecision::Allowed;
        };

        let elapsed = entry.first_failure.elapsed();
        if elapsed >= self.window {
            entries.remove(key);
            return ThrottleDecision::Allowed;
        }

        if entry.count >= self.max_failures {
            let remaining = self.window - elapsed;
            // Round up so a client that waits retry_after is really clear
            let retry_after_secs = (remaining.as_secs()
                + if remaining.subsec_nanos() > 0 { 1 } else { 0 })
            .max(1);
            return ThrottleDecision::Blocked { retry_after_secs };
        }

        ThrottleDecision::Allowed
    }

    /// Record a failed verification for `key`
    ///
    /// Starts a new streak when none exists or the previous window elapsed.
    /// The count saturates at the threshold; the window keeps its original
    /// starting point so the block expires relative to the first failure.
    /// Once the map is large enough, expired entries for other identifiers
    /// are swept out so unique-identifier sprays cannot grow it unbounded.
    pub fn record_failure(&self, key: &str) {
        let mut entries = self.lock_entries();

        if entries.len() >= SWEEP_THRESHOLD {
            let window = self.window;
            entries.retain(|_, entry| entry.first_failure.elapsed() < window);
        }

        match entries.get_mut(key) {
            Some(entry) if entry.first_failure.elapsed() < self.window => {
                entry.count = entry.count.saturating_add(1).min(self.max_failures);
            }
            _ => {
                entries.insert(
                    key.to_string(),
                    FailureWindow {
                        count: 1,
                        first_failure: Instant::now(),
                    },
                );
            }
        }
    }

    /// Record a successful verification for `key`, clearing its streak
    pub fn record_success(&self, key: &str) {
        self.lock_entries().remove(key);
    }

    /// Current failure count for `key` (diagnostics and tests)
    pub fn failure_count(&self, key: &str) -> u32 {
        self.lock_entries().get(key).map(|e| e.count).unwrap_or(0)
    }

    /// Number of identifiers currently tracked (diagnostics and tests)
    pub fn tracked_identifiers(&self) -> usize {
        self.lock_entries().len()
    }
}
