//! Host test-runner capability
//!
//! A story needs four things from the test it documents: the test's
//! hierarchical name, whether it failed or was skipped, and a way to run code
//! after the test body. [`TestContext`] captures exactly that.
//!
//! libtest exposes none of these hooks, so [`TestHandle`] provides a small
//! host of its own: finalizers run in LIFO order when the handle is finished
//! or dropped, and a drop during unwinding marks the test failed.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;

/// Deferred work registered with a host, run after the test body
pub type Finalizer = Box<dyn FnOnce(&dyn TestContext)>;

/// What a story needs from the test that owns it
pub trait TestContext {
    /// Hierarchical test name, levels separated by `/`
    fn name(&self) -> String;

    /// Check if the test has failed so far
    fn failed(&self) -> bool;

    /// Check if the test was skipped
    fn skipped(&self) -> bool;

    /// Register a finalizer
    ///
    /// The host must run it exactly once after the test body, whatever the
    /// outcome, after any finalizer registered later.
    fn cleanup(&self, finalizer: Finalizer);

    /// Mark the caller as a helper frame. No-op unless the host reports
    /// source locations.
    fn helper(&self) {}

    /// Failure message, if the host captured one
    fn failure_message(&self) -> Option<String> {
        None
    }
}

/// Extract a printable message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "test panicked".to_string()
    }
}

/// Built-in host for a single test
///
/// ```ignore
/// #[test]
/// fn adds_numbers() {
///     let t = TestHandle::current();
///     let s = Story::init(&t, "Adds two numbers");
///     s.given("a calculator").when("I add 2 and 3").then("the result is 5");
/// }
/// ```
///
/// The handle is tied to the thread that created it.
pub struct TestHandle {
    name: String,
    failed: Rc<Cell<bool>>,
    ancestors: Vec<Rc<Cell<bool>>>,
    skipped: Cell<bool>,
    message: RefCell<Option<String>>,
    cleanups: RefCell<Vec<Finalizer>>,
    finished: Cell<bool>,
}

impl TestHandle {
    /// Create a handle for a named test
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_ancestors(name.into(), Vec::new())
    }

    fn with_ancestors(name: String, ancestors: Vec<Rc<Cell<bool>>>) -> Self {
        Self {
            name,
            failed: Rc::new(Cell::new(false)),
            ancestors,
            skipped: Cell::new(false),
            message: RefCell::new(None),
            cleanups: RefCell::new(Vec::new()),
            finished: Cell::new(false),
        }
    }

    /// Handle named after the current libtest thread
    ///
    /// libtest names each test thread after the test path, so
    /// `calc::tests::adds` becomes the title `calc/tests/adds`.
    pub fn current() -> Self {
        let name = thread::current()
            .name()
            .map(|n| n.replace("::", "/"))
            .unwrap_or_else(|| "unnamed".to_string());
        Self::new(name)
    }

    /// Mark the test failed
    pub fn fail(&self) {
        self.failed.set(true);
        for ancestor in &self.ancestors {
            ancestor.set(true);
        }
    }

    /// Mark the test failed with a message. The first message wins.
    pub fn fail_with(&self, message: impl Into<String>) {
        self.fail();
        let mut slot = self.message.borrow_mut();
        if slot.is_none() {
            *slot = Some(message.into());
        }
    }

    /// Mark the test skipped
    pub fn skip(&self) {
        self.skipped.set(true);
    }

    /// Run a named child test
    ///
    /// The child is named `parent/child`. A panic in `body` fails the child
    /// and every ancestor but does not unwind into the caller. The child's
    /// finalizers run before this returns. Returns true if the child passed.
    pub fn subtest<F>(&self, name: &str, body: F) -> bool
    where
        F: FnOnce(&TestHandle),
    {
        let mut ancestors = self.ancestors.clone();
        ancestors.push(Rc::clone(&self.failed));
        let child = Self::with_ancestors(format!("{}/{}", self.name, name), ancestors);

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| body(&child)));
        if let Err(payload) = outcome {
            child.fail_with(panic_message(payload.as_ref()));
        }
        child.finish();
        !child.failed()
    }

    /// Run registered finalizers, most recent first
    ///
    /// Only the first call does anything. Dropping the handle calls this.
    pub fn finish(&self) {
        if self.finished.replace(true) {
            return;
        }
        // Pop one at a time so a finalizer may register another.
        loop {
            let next = self.cleanups.borrow_mut().pop();
            match next {
                Some(finalizer) => finalizer(self),
                None => break,
            }
        }
    }

    /// Check if finalizers have run
    pub fn is_finished(&self) -> bool {
        self.finished.get()
    }
}

impl TestContext for TestHandle {
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

    fn failure_message(&self) -> Option<String> {
        self.message.borrow().clone()
    }
}

impl Drop for TestHandle {
    fn drop(&mut self) {
        if thread::panicking() && !self.finished.get() {
            self.fail_with("test panicked");
        }
        self.finish();
    }
}

impl std::fmt::Debug for TestHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestHandle")
            .field("name", &self.name)
            .field("failed", &self.failed.get())
            .field("skipped", &self.skipped.get())
            .field("pending_cleanups", &self.cleanups.borrow().len())
            .finish()
    }
}
