//! Story builder
//!
//! One [`Story`] documents one executing test. Calls chain fluently:
//!
//! ```ignore
//! let s = Story::init(&t, "Adds two numbers");
//! s.given("a calculator")
//!     .when("I add 2 and 3")
//!     .then("the result is 5")
//!     .kv("result", 5);
//! ```
//!
//! # Keyword normalization
//!
//! A primary keyword (Given, When, Then) is stored verbatim the first time it
//! appears in a story and as `And` on every later use, consecutive or not.
//! `And` and `But` are never rewritten.
//!
//! # Targeting
//!
//! Docs and attachments go to the most recent step, or to the story itself
//! while no step exists.
//!
//! # Finalization
//!
//! `init` registers a finalizer with the host. When it runs, the story is
//! frozen into a [`TestCase`] and recorded into the collector. Finalization
//! never panics; problems are logged and the case is dropped.

use crate::collector::Collector;
use crate::host::{Finalizer, TestContext};
use crate::options::StoryOptions;
use crate::otel;
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt::Debug;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;
use stories_core::{
    split_title_path, Attachment, DocEntry, Keyword, Status, Step, StoryError, StoryRecord,
    StoryResult, TestCase, TestError,
};
use tracing::{debug, warn};

/// Elapsed milliseconds with sub-millisecond precision
fn elapsed_ms(since: Instant) -> f64 {
    since.elapsed().as_secs_f64() * 1000.0
}

struct StoryState {
    record: StoryRecord,
    seen_primary: HashSet<Keyword>,
    attachments: Vec<Attachment>,
    started: Instant,
    retry: u32,
    retries: u32,
    finalized: bool,
}

impl StoryState {
    fn push_step(&mut self, keyword: Keyword, text: String, wrapped: bool) -> usize {
        let effective = if keyword.is_primary() && !self.seen_primary.insert(keyword) {
            Keyword::And
        } else {
            keyword
        };
        let index = self.record.steps.len();
        let mut step = Step::new(index, effective, text);
        step.wrapped = wrapped;
        self.record.steps.push(step);
        index
    }

    fn push_doc(&mut self, entry: DocEntry) {
        match self.record.steps.last_mut() {
            Some(step) => step.docs.push(entry),
            None => self.record.docs.push(entry),
        }
    }

    fn push_attachment(&mut self, attachment: Attachment) {
        let attachment = match self.record.steps.last() {
            Some(step) => attachment.with_step(self.record.steps.len() - 1, step.id.clone()),
            None => attachment,
        };
        self.attachments.push(attachment);
    }

    fn freeze(&self, t: &dyn TestContext) -> TestCase {
        let title = t.name();
        let status = Status::from_flags(t.failed(), t.skipped());
        let error = match status {
            Status::Fail => t.failure_message().map(|message| TestError {
                message,
                stack: None,
            }),
            _ => None,
        };
        TestCase {
            title_path: split_title_path(&title),
            title,
            story: self.record.clone(),
            status,
            duration_ms: elapsed_ms(self.started),
            error,
            retry: self.retry,
            retries: self.retries,
            attachments: self.attachments.clone(),
        }
    }
}

/// Freeze the story into a test case exactly once
fn finalize(state: &RefCell<StoryState>, t: &dyn TestContext) -> StoryResult<Option<TestCase>> {
    let mut state = state
        .try_borrow_mut()
        .map_err(|_| StoryError::invalid_state("story is borrowed during finalization"))?;
    if state.finalized {
        return Ok(None);
    }
    state.finalized = true;
    Ok(Some(state.freeze(t)))
}

/// Stamps a wrapped step's duration when dropped, including during unwinding
struct StepTimer<'a> {
    story: &'a Story,
    index: usize,
    started: Instant,
}

impl Drop for StepTimer<'_> {
    fn drop(&mut self) {
        let duration = elapsed_ms(self.started);
        let index = self.index;
        self.story.with_state(|state| {
            if let Some(step) = state.record.steps.get_mut(index) {
                step.duration_ms = Some(duration);
            }
        });
    }
}

/// Builder for the story of one executing test
///
/// A story belongs to its test's thread and is not `Send`.
pub struct Story {
    state: Rc<RefCell<StoryState>>,
    collector: Arc<Collector>,
}

impl Story {
    /// Start a story for `t` recording into the process-wide collector
    pub fn init<T>(t: &T, scenario: impl Into<String>) -> Self
    where
        T: TestContext + ?Sized,
    {
        Self::init_with(t, scenario, StoryOptions::default())
    }

    /// Start a story with options
    pub fn init_with<T>(t: &T, scenario: impl Into<String>, options: StoryOptions) -> Self
    where
        T: TestContext + ?Sized,
    {
        t.helper();

        let collector = options.resolve_collector();
        let source_order = collector.next_order();
        let mut record = StoryRecord::new(scenario, source_order);
        record.tags = options.tags;
        record.tickets = options.tickets;
        record.meta = options.meta;
        otel::bridge(&mut record, options.trace_url_template.as_deref());

        debug!(
            target: "stories::story",
            test = %t.name(),
            scenario = %record.scenario,
            source_order,
            "Story started"
        );

        let state = Rc::new(RefCell::new(StoryState {
            record,
            seen_primary: HashSet::new(),
            attachments: Vec::new(),
            started: Instant::now(),
            retry: options.retry,
            retries: options.retries,
            finalized: false,
        }));

        let finalizer: Finalizer = {
            let state = Rc::clone(&state);
            let collector = Arc::clone(&collector);
            Box::new(move |t: &dyn TestContext| match finalize(&state, t) {
                Ok(Some(case)) => {
                    debug!(
                        target: "stories::story",
                        test = %case.title,
                        status = %case.status,
                        steps = case.story.steps.len(),
                        "Story finalized"
                    );
                    collector.record(case);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(target: "stories::story", test = %t.name(), error = %e, "Story dropped");
                }
            })
        };
        t.cleanup(finalizer);

        Story { state, collector }
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut StoryState) -> R) -> Option<R> {
        match self.state.try_borrow_mut() {
            Ok(mut state) => Some(f(&mut state)),
            Err(_) => {
                warn!(target: "stories::story", "Story is busy; call ignored");
                None
            }
        }
    }

    // =========================================================================
    // Steps
    // =========================================================================

    /// Add a step with an explicit keyword
    pub fn step(&self, keyword: Keyword, text: impl Into<String>) -> &Self {
        self.with_state(|state| state.push_step(keyword, text.into(), false));
        self
    }

    /// Add a `Given` step
    pub fn given(&self, text: impl Into<String>) -> &Self {
        self.step(Keyword::Given, text)
    }

    /// Add a `When` step
    pub fn when(&self, text: impl Into<String>) -> &Self {
        self.step(Keyword::When, text)
    }

    /// Add a `Then` step
    pub fn then(&self, text: impl Into<String>) -> &Self {
        self.step(Keyword::Then, text)
    }

    /// Add an `And` step
    pub fn and(&self, text: impl Into<String>) -> &Self {
        self.step(Keyword::And, text)
    }

    /// Add a `But` step
    pub fn but(&self, text: impl Into<String>) -> &Self {
        self.step(Keyword::But, text)
    }

    /// Alias for [`Story::given`]
    pub fn arrange(&self, text: impl Into<String>) -> &Self {
        self.given(text)
    }

    /// Alias for [`Story::given`]
    pub fn setup(&self, text: impl Into<String>) -> &Self {
        self.given(text)
    }

    /// Alias for [`Story::given`]
    pub fn context(&self, text: impl Into<String>) -> &Self {
        self.given(text)
    }

    /// Alias for [`Story::when`]
    pub fn act(&self, text: impl Into<String>) -> &Self {
        self.when(text)
    }

    /// Alias for [`Story::when`]
    pub fn execute(&self, text: impl Into<String>) -> &Self {
        self.when(text)
    }

    /// Alias for [`Story::when`]
    pub fn action(&self, text: impl Into<String>) -> &Self {
        self.when(text)
    }

    /// Alias for [`Story::then`]
    pub fn assert_that(&self, text: impl Into<String>) -> &Self {
        self.then(text)
    }

    /// Alias for [`Story::then`]
    pub fn verify(&self, text: impl Into<String>) -> &Self {
        self.then(text)
    }

    /// Add a wrapped step and run `body` inside it
    ///
    /// The step's duration is recorded even if `body` panics; the panic then
    /// continues unchanged.
    pub fn timed<F>(&self, keyword: Keyword, text: impl Into<String>, body: F) -> &Self
    where
        F: FnOnce(),
    {
        self.timed_value(keyword, text, body);
        self
    }

    /// Like [`Story::timed`], returning the body's value
    ///
    /// ```ignore
    /// let total = s.timed_value(Keyword::When, "I sum the cart", || cart.total());
    /// ```
    pub fn timed_value<F, R>(&self, keyword: Keyword, text: impl Into<String>, body: F) -> R
    where
        F: FnOnce() -> R,
    {
        let index = self.with_state(|state| state.push_step(keyword, text.into(), true));
        // No borrow is held while the body runs, so it may use the story.
        let _timer = index.map(|index| StepTimer {
            story: self,
            index,
            started: Instant::now(),
        });
        body()
    }

    /// A timed `Then` step
    pub fn expect<F>(&self, text: impl Into<String>, body: F) -> &Self
    where
        F: FnOnce(),
    {
        self.timed(Keyword::Then, text, body)
    }

    // =========================================================================
    // Docs
    // =========================================================================

    /// Attach a prebuilt doc entry
    pub fn doc(&self, entry: DocEntry) -> &Self {
        self.with_state(|state| state.push_doc(entry));
        self
    }

    /// Attach a note
    pub fn note(&self, text: impl Into<String>) -> &Self {
        self.doc(DocEntry::note(text))
    }

    /// Attach a tag doc entry
    pub fn tag<I, S>(&self, names: I) -> &Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.doc(DocEntry::tag(names))
    }

    /// Attach a key/value pair
    pub fn kv(&self, label: impl Into<String>, value: impl Into<Value>) -> &Self {
        self.doc(DocEntry::kv(label, value))
    }

    /// Attach a value as pretty-printed JSON
    pub fn json<T>(&self, label: impl Into<String>, value: &T) -> &Self
    where
        T: Serialize + Debug + ?Sized,
    {
        self.doc(DocEntry::json(label, value))
    }

    /// Attach a code block
    pub fn code(
        &self,
        label: impl Into<String>,
        content: impl Into<String>,
        lang: Option<&str>,
    ) -> &Self {
        self.doc(DocEntry::code(label, content, lang))
    }

    /// Attach a table
    pub fn table<C, S, R, Row, Cell>(&self, label: impl Into<String>, columns: C, rows: R) -> &Self
    where
        C: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = Row>,
        Row: IntoIterator<Item = Cell>,
        Cell: Into<String>,
    {
        self.doc(DocEntry::table(label, columns, rows))
    }

    /// Attach a link
    pub fn link(&self, label: impl Into<String>, url: impl Into<String>) -> &Self {
        self.doc(DocEntry::link(label, url))
    }

    /// Attach a markdown section
    pub fn section(&self, title: impl Into<String>, markdown: impl Into<String>) -> &Self {
        self.doc(DocEntry::section(title, markdown))
    }

    /// Attach a mermaid diagram
    pub fn mermaid(&self, code: impl Into<String>, title: Option<&str>) -> &Self {
        self.doc(DocEntry::mermaid(code, title))
    }

    /// Attach a screenshot reference
    pub fn screenshot(&self, path: impl Into<String>, alt: Option<&str>) -> &Self {
        self.doc(DocEntry::screenshot(path, alt))
    }

    /// Attach a user-defined entry
    pub fn custom(&self, type_name: impl Into<String>, data: impl Into<Value>) -> &Self {
        self.doc(DocEntry::custom(type_name, data))
    }

    // =========================================================================
    // Attachments
    // =========================================================================

    /// Attach a file by path
    pub fn attach(
        &self,
        name: impl Into<String>,
        media_type: impl Into<String>,
        path: impl Into<String>,
    ) -> &Self {
        let attachment = Attachment::file(name, media_type, path);
        self.with_state(|state| state.push_attachment(attachment));
        self
    }

    /// Attach an inline body with an explicit encoding
    pub fn attach_inline(
        &self,
        name: impl Into<String>,
        media_type: impl Into<String>,
        body: impl Into<String>,
        encoding: &str,
    ) -> &Self {
        let attachment = Attachment::inline(name, media_type, body, encoding);
        self.with_state(|state| state.push_attachment(attachment));
        self
    }

    /// Attach binary content, base64-encoded
    pub fn attach_bytes(
        &self,
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: &[u8],
    ) -> &Self {
        let attachment = Attachment::bytes(name, media_type, bytes);
        self.with_state(|state| state.push_attachment(attachment));
        self
    }

    // =========================================================================
    // Inspection
    // =========================================================================

    /// Snapshot of the story as it would be recorded now
    pub fn record(&self) -> StoryRecord {
        self.state.borrow().record.clone()
    }

    /// Snapshot of the attachments so far
    pub fn attachments(&self) -> Vec<Attachment> {
        self.state.borrow().attachments.clone()
    }

    /// Process-wide creation order of this story
    pub fn source_order(&self) -> u64 {
        self.state.borrow().record.source_order
    }

    /// Collector this story records into
    pub fn collector(&self) -> &Arc<Collector> {
        &self.collector
    }
}

impl Debug for Story {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.state.try_borrow() {
            Ok(state) => f
                .debug_struct("Story")
                .field("scenario", &state.record.scenario)
                .field("steps", &state.record.steps.len())
                .field("source_order", &state.record.source_order)
                .finish(),
            Err(_) => f.write_str("Story { <busy> }"),
        }
    }
}
