// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time handling.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// A clock that provides the current wall-clock time as Unix seconds.
///
/// Wall-clock rather than `Instant` because the planner and pause-reason
/// writer persist timestamps to disk and compare them across process
/// restarts; a monotonic `Instant` cannot survive that.
pub trait Clock: Clone + Send + Sync {
    fn now_unix(&self) -> i64;
}

/// Real system clock.
#[derive(Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_unix(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

/// Fake clock for testing with controllable time.
#[derive(Clone)]
pub struct FakeClock {
    now: Arc<Mutex<i64>>,
}

impl FakeClock {
    pub fn new(now_unix: i64) -> Self {
        Self {
            now: Arc::new(Mutex::new(now_unix)),
        }
    }

    pub fn advance(&self, duration: Duration) {
        *self.now.lock() += duration.as_secs() as i64;
    }

    pub fn set(&self, now_unix: i64) {
        *self.now.lock() = now_unix;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new(1_700_000_000)
    }
}

impl Clock for FakeClock {
    fn now_unix(&self) -> i64 {
        *self.now.lock()
    }
}
