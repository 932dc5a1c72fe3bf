//! Shared test utilities for all integration test suites.
//!
//! Import via `mod common;` from any test file.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::cell::{Cell, RefCell};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Once};
use tempfile::TempDir;

pub use executable_stories::{
    Collector, Finalizer, Keyword, ReportConfig, Reporter, Run, Status, Story, StoryOptions,
    TestCase, TestContext,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Install a test-friendly tracing subscriber once per process.
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("off")),
            )
            .with_test_writer()
            .try_init();
    });
}

// ============================================================================
// MockContext - scripted host for a single test
// ============================================================================

/// Host double: flags are set by the test, cleanups run on demand.
pub struct MockContext {
    name: String,
    failed: Cell<bool>,
    skipped: Cell<bool>,
    helper_calls: Cell<usize>,
    cleanups: RefCell<Vec<Finalizer>>,
}

impl MockContext {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            failed: Cell::new(false),
            skipped: Cell::new(false),
            helper_calls: Cell::new(0),
            cleanups: RefCell::new(Vec::new()),
        }
    }

    pub fn set_failed(&self) {
        self.failed.set(true);
    }

    pub fn set_skipped(&self) {
        self.skipped.set(true);
    }

    pub fn helper_calls(&self) -> usize {
        self.helper_calls.get()
    }

    pub fn pending_cleanups(&self) -> usize {
        self.cleanups.borrow().len()
    }

    /// Run registered cleanups in LIFO order.
    pub fn run_cleanups(&self) {
        loop {
            let next = self.cleanups.borrow_mut().pop();
            match next {
                Some(finalizer) => finalizer(self),
                None => break,
            }
        }
    }
}

impl TestContext for MockContext {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn failed(&self) -> bool {
        self.failed.get()
    }

    fn skipped(&self) -> bool {
        self.skipped.get()
    }

    fn cleanup(&self, finalizer: Finalizer) {
        self.cleanups.borrow_mut().push(finalizer);
    }

    fn helper(&self) {
        self.helper_calls.set(self.helper_calls.get() + 1);
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Fresh private collector.
pub fn private_collector() -> Arc<Collector> {
    Arc::new(Collector::new())
}

/// Story options recording into `collector`.
pub fn options_for(collector: &Arc<Collector>) -> StoryOptions {
    StoryOptions::new().collector(Arc::clone(collector))
}

/// Start a story on `ctx` that records into `collector`.
pub fn story_in(ctx: &MockContext, scenario: &str, collector: &Arc<Collector>) -> Story {
    Story::init_with(ctx, scenario, options_for(collector))
}

/// Reporter rooted in a temp dir, with no CI or git metadata.
pub fn temp_reporter() -> (TempDir, Reporter) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let reporter = Reporter::new(ReportConfig {
        project_root: dir.path().to_path_buf(),
        ..ReportConfig::default()
    });
    (dir, reporter)
}

/// Default report location under `root`.
pub fn default_report_path(root: &Path) -> PathBuf {
    root.join(".executable-stories").join("raw-run.json")
}

/// Parse a written run report.
pub fn read_run(path: &Path) -> Run {
    let content = std::fs::read_to_string(path).expect("Failed to read report");
    serde_json::from_str(&content).expect("Failed to parse report")
}

/// Parse a written run report as untyped JSON.
pub fn read_run_json(path: &Path) -> serde_json::Value {
    let content = std::fs::read_to_string(path).expect("Failed to read report");
    serde_json::from_str(&content).expect("Failed to parse report")
}

/// Collect a single story: build it with `body`, run cleanups, return the case.
pub fn collect_one<F>(name: &str, scenario: &str, body: F) -> TestCase
where
    F: FnOnce(&Story, &MockContext),
{
    let collector = private_collector();
    let ctx = MockContext::new(name);
    let story = story_in(&ctx, scenario, &collector);
    body(&story, &ctx);
    ctx.run_cleanups();
    let mut cases = collector.drain_all();
    assert_eq!(cases.len(), 1, "expected exactly one recorded case");
    cases.remove(0)
}
