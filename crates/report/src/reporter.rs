//! Run assembly and emission
//!
//! The reporter runs once, after every test has finished. It snapshots the
//! collector, stamps run metadata and writes the report. An empty collector
//! writes nothing and creates no directories.
//!
//! ```ignore
//! fn main() {
//!     run_and_report(|| {
//!         Suite::new("calculator")
//!             .test("adds", |t| { /* ... */ })
//!             .run()
//!             .exit_code()
//!     })
//! }
//! ```

use crate::ci::detect_ci;
use crate::config::{process_env, ReportConfig};
use crate::error::ReportResult;
use crate::git::read_git_sha;
use crate::writer::write_run;
use std::path::PathBuf;
use stories_core::{now_epoch_ms, CiInfo, Run, TestCase};
use stories_engine::Collector;
use tracing::{debug, info, warn};

/// Assembles and writes the run report
#[derive(Debug, Clone)]
pub struct Reporter {
    config: ReportConfig,
    ci: Option<CiInfo>,
    git_sha: Option<String>,
    package_version: Option<String>,
}

impl Reporter {
    /// Reporter for `config` with no run metadata
    pub fn new(config: ReportConfig) -> Self {
        Self {
            config,
            ci: None,
            git_sha: None,
            package_version: None,
        }
    }

    /// Reporter for the current directory and process environment
    ///
    /// Resolves config, then detects CI and the git SHA unless the config
    /// turns them off. The package version comes from `CARGO_PKG_VERSION`,
    /// which cargo sets for test and run targets.
    pub fn from_env() -> Self {
        let config = ReportConfig::resolve();
        let ci = if config.include_ci { detect_ci() } else { None };
        let git_sha = if config.include_git {
            read_git_sha(&config.project_root, process_env)
        } else {
            None
        };
        Self {
            package_version: process_env("CARGO_PKG_VERSION"),
            config,
            ci,
            git_sha,
        }
    }

    /// Set the CI descriptor
    pub fn with_ci(mut self, ci: Option<CiInfo>) -> Self {
        self.ci = ci;
        self
    }

    /// Set the git SHA
    pub fn with_git_sha(mut self, sha: Option<String>) -> Self {
        self.git_sha = sha;
        self
    }

    /// Set the package version
    pub fn with_package_version(mut self, version: Option<String>) -> Self {
        self.package_version = version;
        self
    }

    /// Active configuration
    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Build the run from collected cases
    ///
    /// A finish time earlier than the start (clock adjustment) is clamped to
    /// the start.
    pub fn assemble(&self, cases: Vec<TestCase>, started_at_ms: u64, finished_at_ms: u64) -> Run {
        let mut run = Run::new(
            cases,
            self.config.project_root.display().to_string(),
            started_at_ms,
            finished_at_ms.max(started_at_ms),
        );
        run.package_version = self.package_version.clone();
        run.git_sha = self.git_sha.clone();
        run.ci = self.ci.clone();
        run.meta = self.config.meta.clone();
        run
    }

    /// Write the report for everything in `collector`
    ///
    /// Returns the written path, or `None` when reporting is disabled or the
    /// collector is empty.
    pub fn report(&self, collector: &Collector, started_at_ms: u64) -> ReportResult<Option<PathBuf>> {
        if !self.config.enabled {
            debug!(target: "stories::report", "Report emission disabled");
            return Ok(None);
        }
        let cases = collector.drain_all();
        if cases.is_empty() {
            debug!(target: "stories::report", "No test cases collected; nothing to write");
            return Ok(None);
        }

        let count = cases.len();
        let run = self.assemble(cases, started_at_ms, now_epoch_ms());
        let path = self.config.output_path();
        write_run(&run, &path)?;

        info!(
            target: "stories::report",
            path = %path.display(),
            tests = count,
            "Run report written"
        );
        Ok(Some(path))
    }

    /// Like [`Reporter::report`], logging failures instead of returning them
    pub fn emit(&self, collector: &Collector, started_at_ms: u64) -> Option<PathBuf> {
        match self.report(collector, started_at_ms) {
            Ok(path) => path,
            Err(e) => {
                warn!(
                    target: "stories::report",
                    path = %self.config.output_path().display(),
                    error = %e,
                    "Failed to write run report"
                );
                None
            }
        }
    }
}

/// Run `suite`, then report `collector`, returning the suite's exit code
///
/// Report failures never change the exit code.
pub fn run_and_report_with<F>(reporter: &Reporter, collector: &Collector, suite: F) -> i32
where
    F: FnOnce() -> i32,
{
    run_then_report(collector, suite, || reporter.clone())
}

/// Run `suite`, then build the reporter and report `collector`
///
/// Output path, CI and git metadata are resolved only after the last test.
fn run_then_report<F, R>(collector: &Collector, suite: F, reporter: R) -> i32
where
    F: FnOnce() -> i32,
    R: FnOnce() -> Reporter,
{
    let started_at_ms = now_epoch_ms();
    let code = suite();
    reporter().emit(collector, started_at_ms);
    code
}

/// Run `suite`, report the process-wide collector and exit with the suite's code
///
/// Configuration and environment are read after the suite returns.
pub fn run_and_report<F>(suite: F) -> !
where
    F: FnOnce() -> i32,
{
    let code = run_then_report(&Collector::global(), suite, Reporter::from_env);
    std::process::exit(code)
}

/// Report the process-wide collector now
///
/// For targets that cannot wrap `main`. The run's start time is the moment
/// the collector was first used.
pub fn write_results() -> Option<PathBuf> {
    let collector = Collector::global();
    Reporter::from_env().emit(&collector, collector.created_at_ms())
}
