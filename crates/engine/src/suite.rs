//! Minimal suite runner for `harness = false` test targets
//!
//! ```ignore
//! fn main() {
//!     let summary = Suite::new("calculator")
//!         .test("adds", |t| { /* ... */ })
//!         .test("divides", |t| { /* ... */ })
//!         .run();
//!     std::process::exit(summary.exit_code());
//! }
//! ```
//!
//! Each test gets its own [`TestHandle`] named `suite/test`. Panics are caught
//! and turn into failures carrying the panic message. Finalizers run before
//! the test's result is reported, so stories are recorded by the time
//! [`Suite::run`] returns.

use crate::host::{panic_message, TestContext, TestHandle};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread;
use std::time::{Duration, Instant};
use stories_core::Status;
use tracing::{debug, warn};

type TestFn = Box<dyn FnOnce(&TestHandle) + Send>;

/// Exit code libtest uses for a failing run
pub const FAILURE_EXIT_CODE: i32 = 101;

/// Result of one test
#[derive(Debug, Clone, PartialEq)]
pub struct TestOutcome {
    /// Full test name
    pub name: String,
    /// Outcome
    pub status: Status,
    /// Failure message, if any
    pub message: Option<String>,
    /// Wall time including finalizers
    pub duration: Duration,
}

/// Results of a suite run, in registration order
#[derive(Debug, Clone, Default)]
pub struct SuiteSummary {
    /// Per-test outcomes
    pub outcomes: Vec<TestOutcome>,
    /// Wall time of the whole run
    pub elapsed: Duration,
}

impl SuiteSummary {
    fn count(&self, status: Status) -> usize {
        self.outcomes.iter().filter(|o| o.status == status).count()
    }

    /// Number of passed tests
    pub fn passed(&self) -> usize {
        self.count(Status::Pass)
    }

    /// Number of failed tests
    pub fn failed(&self) -> usize {
        self.count(Status::Fail)
    }

    /// Number of skipped tests
    pub fn skipped(&self) -> usize {
        self.count(Status::Skip)
    }

    /// Check if no test failed
    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    /// Process exit code: 0 on success, 101 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            FAILURE_EXIT_CODE
        }
    }
}

/// A named set of tests
pub struct Suite {
    name: String,
    tests: Vec<(String, TestFn)>,
    threads: usize,
    quiet: bool,
}

impl Suite {
    /// Create an empty suite
    ///
    /// Test names are prefixed with `name/`; an empty name adds no prefix.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tests: Vec::new(),
            threads: 1,
            quiet: false,
        }
    }

    /// Register a test
    pub fn test<F>(mut self, name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(&TestHandle) + Send + 'static,
    {
        let name = name.into();
        let full = if self.name.is_empty() {
            name
        } else {
            format!("{}/{}", self.name, name)
        };
        self.tests.push((full, Box::new(body)));
        self
    }

    /// Number of worker threads (at least one)
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Suppress the libtest-style console report
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Number of registered tests
    pub fn len(&self) -> usize {
        self.tests.len()
    }

    /// Check if no test is registered
    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    /// Run every test and print a summary
    pub fn run(self) -> SuiteSummary {
        let started = Instant::now();
        let total = self.tests.len();
        let workers = self.threads.min(total.max(1));
        let quiet = self.quiet;

        if !quiet {
            let _ = print_header(&mut io::stdout().lock(), total);
        }
        debug!(target: "stories::suite", suite = %self.name, tests = total, workers, "Suite started");

        let queue: Mutex<VecDeque<(usize, String, TestFn)>> = Mutex::new(
            self.tests
                .into_iter()
                .enumerate()
                .map(|(i, (name, body))| (i, name, body))
                .collect(),
        );
        let results: Mutex<Vec<(usize, TestOutcome)>> = Mutex::new(Vec::with_capacity(total));

        thread::scope(|scope| {
            for worker in 0..workers {
                let spawned = thread::Builder::new()
                    .name(format!("stories-worker-{}", worker))
                    .spawn_scoped(scope, || loop {
                        let next = queue.lock().pop_front();
                        let Some((index, name, body)) = next else {
                            break;
                        };
                        let outcome = run_one(name, body);
                        if !quiet {
                            let _ = print_outcome(&mut io::stdout().lock(), &outcome);
                        }
                        results.lock().push((index, outcome));
                    });
                if let Err(e) = spawned {
                    warn!(target: "stories::suite", worker, error = %e, "Failed to spawn worker");
                }
            }
        });

        // Anything left means no worker could be spawned; run it here.
        let leftover: Vec<_> = queue.into_inner().into_iter().collect();
        let mut results = results.into_inner();
        for (index, name, body) in leftover {
            let outcome = run_one(name, body);
            if !quiet {
                let _ = print_outcome(&mut io::stdout().lock(), &outcome);
            }
            results.push((index, outcome));
        }
        results.sort_by_key(|(index, _)| *index);

        let summary = SuiteSummary {
            outcomes: results.into_iter().map(|(_, outcome)| outcome).collect(),
            elapsed: started.elapsed(),
        };
        if !quiet {
            let _ = print_summary(&mut io::stdout().lock(), &summary);
        }
        summary
    }
}

fn run_one(name: String, body: TestFn) -> TestOutcome {
    let started = Instant::now();
    let handle = TestHandle::new(name.clone());
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| body(&handle))) {
        handle.fail_with(panic_message(payload.as_ref()));
    }
    handle.finish();

    let status = Status::from_flags(handle.failed(), handle.skipped());
    debug!(target: "stories::suite", test = %name, status = %status, "Test finished");
    TestOutcome {
        name,
        status,
        message: handle.failure_message(),
        duration: started.elapsed(),
    }
}

// Console output is best effort: a closed stdout must not abort the run.

fn print_header(out: &mut impl Write, total: usize) -> io::Result<()> {
    writeln!(out)?;
    writeln!(out, "running {} test{}", total, if total == 1 { "" } else { "s" })
}

fn print_outcome(out: &mut impl Write, outcome: &TestOutcome) -> io::Result<()> {
    let label = match outcome.status {
        Status::Pass => "ok",
        Status::Fail => "FAILED",
        Status::Skip => "ignored",
    };
    writeln!(out, "test {} ... {}", outcome.name, label)
}

fn print_summary(out: &mut impl Write, summary: &SuiteSummary) -> io::Result<()> {
    let failures: Vec<_> = summary
        .outcomes
        .iter()
        .filter(|o| o.status == Status::Fail)
        .collect();

    if !failures.is_empty() {
        writeln!(out)?;
        writeln!(out, "failures:")?;
        for failure in &failures {
            writeln!(out)?;
            writeln!(out, "---- {} ----", failure.name)?;
            writeln!(out, "{}", failure.message.as_deref().unwrap_or("test failed"))?;
        }
        writeln!(out)?;
        writeln!(out, "failures:")?;
        for failure in &failures {
            writeln!(out, "    {}", failure.name)?;
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "test result: {}. {} passed; {} failed; {} ignored; finished in {:.2}s",
        if summary.success() { "ok" } else { "FAILED" },
        summary.passed(),
        summary.failed(),
        summary.skipped(),
        summary.elapsed.as_secs_f64()
    )?;
    writeln!(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::Collector;
    use crate::options::StoryOptions;
    use crate::story::Story;
    use std::sync::Arc;

    #[test]
    fn test_outcomes_follow_registration_order() {
        let summary = Suite::new("unit")
            .quiet(true)
            .threads(4)
            .test("passes", |_| {})
            .test("fails", |_| panic!("nope"))
            .test("skips", |t| t.skip())
            .run();

        let names: Vec<_> = summary.outcomes.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, vec!["unit/passes", "unit/fails", "unit/skips"]);
        assert_eq!(summary.passed(), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.outcomes[1].message.as_deref(), Some("nope"));
        assert_eq!(summary.exit_code(), FAILURE_EXIT_CODE);
    }

    #[test]
    fn test_all_pass_exits_zero() {
        let summary = Suite::new("").quiet(true).test("only", |_| {}).run();
        assert_eq!(summary.outcomes[0].name, "only");
        assert_eq!(summary.exit_code(), 0);
    }

    #[test]
    fn test_empty_suite() {
        let suite = Suite::new("empty").quiet(true);
        assert!(suite.is_empty());
        let summary = suite.run();
        assert!(summary.outcomes.is_empty());
        assert!(summary.success());
    }

    #[test]
    fn test_stories_are_recorded_before_run_returns() {
        let collector = Arc::new(Collector::new());
        let mut suite = Suite::new("stories").quiet(true).threads(3);
        for i in 0..6 {
            let collector = Arc::clone(&collector);
            suite = suite.test(format!("case_{}", i), move |t| {
                let s = Story::init_with(t, format!("scenario {}", i), StoryOptions::new().collector(collector));
                s.given("a step");
                if i == 5 {
                    panic!("last one fails");
                }
            });
        }
        let summary = suite.run();

        assert_eq!(collector.len(), 6);
        assert_eq!(summary.failed(), 1);
        let failed: Vec<_> = collector
            .drain_all()
            .into_iter()
            .filter(|c| c.status == Status::Fail)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].title, "stories/case_5");
        assert_eq!(failed[0].error.as_ref().unwrap().message, "last one fails");
    }

    /// Writer standing in for a closed stdout
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdout closed"))
        }
    }

    fn outcome(name: &str, status: Status) -> TestOutcome {
        TestOutcome {
            name: name.to_string(),
            status,
            message: (status == Status::Fail).then(|| "boom".to_string()),
            duration: Duration::from_millis(3),
        }
    }

    #[test]
    fn test_console_output_format() {
        let summary = SuiteSummary {
            outcomes: vec![outcome("s/ok", Status::Pass), outcome("s/bad", Status::Fail)],
            elapsed: Duration::from_millis(10),
        };
        let mut out = Vec::new();
        print_header(&mut out, 2).unwrap();
        for o in &summary.outcomes {
            print_outcome(&mut out, o).unwrap();
        }
        print_summary(&mut out, &summary).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("running 2 tests"));
        assert!(text.contains("test s/ok ... ok"));
        assert!(text.contains("test s/bad ... FAILED"));
        assert!(text.contains("---- s/bad ----\nboom"));
        assert!(text.contains("test result: FAILED. 1 passed; 1 failed; 0 ignored"));
    }

    #[test]
    fn test_closed_stdout_is_reported_not_raised() {
        let summary = SuiteSummary {
            outcomes: vec![outcome("s/bad", Status::Fail), outcome("s/skip", Status::Skip)],
            elapsed: Duration::ZERO,
        };
        assert!(print_header(&mut ClosedPipe, 2).is_err());
        assert!(print_outcome(&mut ClosedPipe, &summary.outcomes[0]).is_err());
        assert!(print_summary(&mut ClosedPipe, &summary).is_err());
    }
}
