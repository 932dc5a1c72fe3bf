//! Story engine for executable stories
//!
//! This crate drives story recording at test time:
//! - Story: per-test builder for steps, docs, tags and attachments
//! - Collector: process-wide, thread-safe sink for finished test cases
//! - TestContext: the capability a host test runner must provide
//! - TestHandle / Suite: a minimal host for targets without one
//! - otel: links stories to the active OpenTelemetry span (`otel` feature)
//!
//! A story registers a finalizer with its host. When the host runs it, the
//! story is frozen into a `TestCase` and pushed into its collector.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod collector;
pub mod host;
pub mod options;
pub mod otel;
pub mod story;
pub mod suite;

pub use collector::Collector;
pub use host::{Finalizer, TestContext, TestHandle};
pub use options::StoryOptions;
pub use story::Story;
pub use suite::{Suite, SuiteSummary, TestOutcome};
