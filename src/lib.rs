//! executable-stories - BDD-style story annotations for Rust tests
//!
//! A test documents itself as a story: Given/When/Then steps, notes, tables,
//! links and attachments. When the test finishes its story is recorded; when
//! the suite finishes every story is written as one JSON run report that
//! downstream formatters turn into living documentation.
//!
//! # Quick Start
//!
//! ```ignore
//! use executable_stories::{Keyword, Story, TestHandle};
//!
//! #[test]
//! fn adds_two_numbers() {
//!     let t = TestHandle::current();
//!     let s = Story::init(&t, "Adds two numbers");
//!
//!     s.given("a calculator");
//!     let sum = s.timed_value(Keyword::When, "I add 2 and 3", || 2 + 3);
//!     s.then("the result is 5").kv("sum", sum);
//!     assert_eq!(sum, 5);
//! }
//! ```
//!
//! For a `harness = false` target, wrap the suite so the report is written
//! when it finishes:
//!
//! ```ignore
//! fn main() {
//!     executable_stories::run_and_report(|| {
//!         Suite::new("calculator").test("adds", adds_two_numbers).run().exit_code()
//!     })
//! }
//! ```
//!
//! # Architecture
//!
//! - `stories-core`: report data model and doc entries
//! - `stories-engine`: story builder, collector, host capability, suite runner
//! - `stories-report`: config, CI/git metadata, run assembly and file output

pub use serde_json::{json, Value};

pub use stories_core::{
    now_epoch_ms, split_title_path, Attachment, CiInfo, DocEntry, DocKind, DocPhase, Keyword, Run, Status, Step,
    StoryError, StoryRecord, StoryResult, TestCase, TestError, DEFAULT_OUTPUT_PATH, OUTPUT_ENV,
    SCHEMA_VERSION,
};
pub use stories_engine::{
    Collector, Finalizer, Story, StoryOptions, Suite, SuiteSummary, TestContext, TestHandle,
    TestOutcome,
};
pub use stories_engine::otel::{TRACE_ID_PLACEHOLDER, TRACE_URL_TEMPLATE_ENV};
pub use stories_report::{
    detect_ci, detect_ci_from, read_git_sha, run_and_report, run_and_report_with, write_results,
    ReportConfig, ReportError, ReportResult, Reporter, CONFIG_FILE_NAME, DISABLE_ENV,
};
