//! Process-wide collector of finished test cases
//!
//! The collector is the only state shared between concurrently running tests.
//! Recorded cases and the source-order counter live behind a single lock, so
//! an order handed out by [`Collector::next_order`] and a case pushed by
//! [`Collector::record`] never race with each other or with a drain.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::sync::Arc;
use stories_core::{now_epoch_ms, TestCase};
use tracing::debug;

// =============================================================================
// Global Collector
// =============================================================================
//
// Created on first use. Stories default to this instance; tests that need
// isolation construct their own and pass it through `StoryOptions`.

static GLOBAL: Lazy<Arc<Collector>> = Lazy::new(|| Arc::new(Collector::new()));

#[derive(Debug, Default)]
struct CollectorState {
    cases: Vec<TestCase>,
    next_order: u64,
}

/// Append-only sink for finished test cases
#[derive(Debug)]
pub struct Collector {
    state: Mutex<CollectorState>,
    created_at_ms: u64,
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

impl Collector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CollectorState::default()),
            created_at_ms: now_epoch_ms(),
        }
    }

    /// The process-wide collector
    pub fn global() -> Arc<Collector> {
        Arc::clone(&GLOBAL)
    }

    /// Epoch milliseconds at which this collector was created
    pub fn created_at_ms(&self) -> u64 {
        self.created_at_ms
    }

    /// Append a finished test case
    pub fn record(&self, case: TestCase) {
        let mut state = self.state.lock();
        debug!(
            target: "stories::collector",
            title = %case.title,
            status = %case.status,
            recorded = state.cases.len() + 1,
            "Test case recorded"
        );
        state.cases.push(case);
    }

    /// Snapshot of all recorded cases in collection order
    ///
    /// The returned vector is independent of the collector; later records do
    /// not show up in it.
    pub fn drain_all(&self) -> Vec<TestCase> {
        self.state.lock().cases.clone()
    }

    /// Return the current source order and advance the counter
    pub fn next_order(&self) -> u64 {
        let mut state = self.state.lock();
        let order = state.next_order;
        state.next_order += 1;
        order
    }

    /// Drop all recorded cases and restart source order at zero
    ///
    /// Meant for test isolation. Calling this while stories are live breaks
    /// source-order uniqueness.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.cases.clear();
        state.next_order = 0;
    }

    /// Number of recorded cases
    pub fn len(&self) -> usize {
        self.state.lock().cases.len()
    }

    /// Check if no case has been recorded
    pub fn is_empty(&self) -> bool {
        self.state.lock().cases.is_empty()
    }
}
