// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Game-time tracking.
//!
//! The upstream reports total in-game seconds only on the slow
//! session-info cadence; between probes the current game time is
//! interpolated from the wall clock. A reported total that runs behind
//! the interpolated expectation (beyond tolerance) means the server
//! restored an older save.

use std::time::Instant;

/// Emitted when the upstream play duration regressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rollback {
    pub expected: i64,
    pub reported: i64,
    pub delta: i64,
}

#[derive(Debug)]
pub struct GameTimeTracker {
    offset_secs: i64,
    probed_at: Instant,
    tolerance_secs: i64,
    probed: bool,
}

impl GameTimeTracker {
    pub fn new(tolerance_secs: i64) -> Self {
        Self { offset_secs: 0, probed_at: Instant::now(), tolerance_secs, probed: false }
    }

    /// Whether any probe has landed yet. Before the first probe,
    /// `current()` is 0 and history writes are suppressed.
    pub fn probed(&self) -> bool {
        self.probed
    }

    /// Interpolated current game time in seconds.
    pub fn current(&self) -> i64 {
        if !self.probed {
            return 0;
        }
        self.offset_secs + self.probed_at.elapsed().as_secs() as i64
    }

    /// Fold in a fresh `totalPlayDuration` probe. Returns the rollback
    /// signal when the reported total runs behind the interpolated
    /// expectation by more than the tolerance.
    pub fn update(&mut self, total_secs: i64) -> Option<Rollback> {
        let rollback = if self.probed {
            let expected = self.current();
            (total_secs < expected - self.tolerance_secs).then(|| Rollback {
                expected,
                reported: total_secs,
                delta: expected - total_secs,
            })
        } else {
            None
        };
        self.offset_secs = total_secs;
        self.probed_at = Instant::now();
        self.probed = true;
        rollback
    }
}

#[cfg(test)]
#[path = "gametime_tests.rs"]
mod tests;
