//! Fixture lifecycle and the context a test body runs in.
//!
//! Two levels of state exist per case:
//!
//! - [`SharedState`]: created once per case from the case params, initialized
//!   before the first subcase and finalized after the last.
//! - [`Fixture`]: created per subcase from the shared state and the merged
//!   `case ⊕ subcase` params, then `init` → body → `finalize`. `finalize`
//!   runs whenever `create` succeeded, whatever happened in between.
//!
//! The body receives a [`TestContext`], which dereferences to the fixture and
//! carries the params, a log buffer and the cleanup/eventual lists.

use crate::check::CheckError;
use crate::errors::{TestError, TestResult};
use crate::params::{FromParam, ParamRecord};
use crate::recorder::{LogEntry, LogSeverity};
use futures::future::{self, LocalBoxFuture};
use futures::Future;
use std::fmt;
use std::ops::{Deref, DerefMut};

fn ready_ok<'a>() -> LocalBoxFuture<'a, TestResult> {
    Box::pin(future::ready(Ok(())))
}

/// Case-level state shared by every subcase of one case.
pub trait SharedState: Sized + 'static {
    fn create(params: &ParamRecord) -> Result<Self, TestError>;

    fn init(&mut self) -> LocalBoxFuture<'_, TestResult> {
        ready_ok()
    }

    fn finalize(&mut self) -> LocalBoxFuture<'_, TestResult> {
        ready_ok()
    }
}

impl SharedState for () {
    fn create(_params: &ParamRecord) -> Result<Self, TestError> {
        Ok(())
    }
}

/// Per-subcase test state.
///
/// Hooks may log through the [`SubcaseLog`] they are given; what they log is
/// attributed to the subcase.
pub trait Fixture: Sized + 'static {
    type Shared: SharedState;

    fn create(shared: &Self::Shared, params: &ParamRecord) -> Result<Self, TestError>;

    fn init<'a>(&'a mut self, _log: &'a mut SubcaseLog) -> LocalBoxFuture<'a, TestResult> {
        ready_ok()
    }

    fn finalize<'a>(&'a mut self, _log: &'a mut SubcaseLog) -> LocalBoxFuture<'a, TestResult> {
        ready_ok()
    }
}

/// A fixture with no state of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct BasicFixture;

impl Fixture for BasicFixture {
    type Shared = ();

    fn create(_shared: &(), _params: &ParamRecord) -> Result<Self, TestError> {
        Ok(BasicFixture)
    }
}

// ============================================================================
// SUBCASE LOG
// ============================================================================

/// Messages logged during one subcase, handed to the recorder when it ends.
#[derive(Debug, Default)]
pub struct SubcaseLog {
    entries: Vec<LogEntry>,
    debugging: bool,
}

impl SubcaseLog {
    pub fn new(debugging: bool) -> Self {
        Self {
            entries: Vec::new(),
            debugging,
        }
    }

    pub fn is_debugging(&self) -> bool {
        self.debugging
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    #[track_caller]
    pub fn debug(&mut self, message: impl Into<String>) {
        if self.debugging {
            self.push(LogEntry::here(LogSeverity::NotRun, "DEBUG", message));
        }
    }

    #[track_caller]
    pub fn info(&mut self, message: impl Into<String>) {
        self.push(LogEntry::here(LogSeverity::NotRun, "INFO", message));
    }

    #[track_caller]
    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(LogEntry::here(LogSeverity::Warn, "WARN", message));
    }

    /// Records an expectation failure; the subcase keeps running.
    #[track_caller]
    pub fn fail(&mut self, message: impl Into<String>) {
        self.push(LogEntry::here(LogSeverity::ExpectFailed, "EXPECTATION FAILED", message));
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn take(&mut self) -> Vec<LogEntry> {
        std::mem::take(&mut self.entries)
    }
}

// ============================================================================
// TEST CONTEXT
// ============================================================================

/// What a test body receives: the fixture plus per-subcase helpers.
pub struct TestContext<F> {
    fixture: F,
    params: ParamRecord,
    log: SubcaseLog,
    cleanups: Vec<Box<dyn FnOnce()>>,
    eventual: Vec<LocalBoxFuture<'static, TestResult>>,
}

impl<F> TestContext<F> {
    pub fn new(fixture: F, params: ParamRecord, debugging: bool) -> Self {
        Self {
            fixture,
            params,
            log: SubcaseLog::new(debugging),
            cleanups: Vec::new(),
            eventual: Vec::new(),
        }
    }

    /// The merged `case ⊕ subcase` params, private keys included.
    pub fn params(&self) -> &ParamRecord {
        &self.params
    }

    /// Typed param lookup; a missing or mistyped key is an exception.
    #[track_caller]
    pub fn param<T: FromParam>(&self, key: &str) -> TestResult<T> {
        match self.params.value(key) {
            None => Err(TestError::exception("ParamError", format!("missing param '{}'", key))),
            Some(value) => T::from_param(value).ok_or_else(|| {
                TestError::exception(
                    "ParamError",
                    format!("param '{}' has unexpected type {}", key, value.type_name()),
                )
            }),
        }
    }

    pub fn fixture(&self) -> &F {
        &self.fixture
    }

    pub fn fixture_mut(&mut self) -> &mut F {
        &mut self.fixture
    }

    pub fn log(&mut self) -> &mut SubcaseLog {
        &mut self.log
    }

    /// A skip signal; return it to abort the subcase.
    #[track_caller]
    pub fn skip(&self, message: impl Into<String>) -> TestError {
        TestError::skip(message)
    }

    #[track_caller]
    pub fn skip_if(&self, condition: bool, message: impl Into<String>) -> TestResult {
        if condition {
            Err(TestError::skip(message))
        } else {
            Ok(())
        }
    }

    #[track_caller]
    pub fn debug(&mut self, message: impl Into<String>) {
        self.log.debug(message);
    }

    #[track_caller]
    pub fn info(&mut self, message: impl Into<String>) {
        self.log.info(message);
    }

    #[track_caller]
    pub fn warn(&mut self, message: impl Into<String>) {
        self.log.warn(message);
    }

    #[track_caller]
    pub fn fail(&mut self, message: impl Into<String>) {
        self.log.fail(message);
    }

    /// Records a failure if `condition` is false. Returns `condition`.
    #[track_caller]
    pub fn expect(&mut self, condition: bool, message: impl Into<String>) -> bool {
        if !condition {
            self.log.fail(message);
        }
        condition
    }

    /// Records a failed content check without aborting.
    #[track_caller]
    pub fn expect_ok(&mut self, result: Result<(), CheckError>) -> bool {
        match result {
            Ok(()) => true,
            Err(e) => {
                self.log.fail(e.to_string());
                false
            }
        }
    }

    /// Expects `result` to be an error; records a failure if it succeeded.
    #[track_caller]
    pub fn should_fail<T, E: fmt::Display>(&mut self, what: &str, result: Result<T, E>) -> bool {
        match result {
            Ok(_) => {
                self.log.fail(format!("{}: did not fail", what));
                false
            }
            Err(e) => {
                self.log.debug(format!("{}: failed as expected: {}", what, e));
                true
            }
        }
    }

    /// Runs `cleanup` at finalize time, most recent first.
    pub fn track_for_cleanup(&mut self, cleanup: impl FnOnce() + 'static) {
        self.cleanups.push(Box::new(cleanup));
    }

    /// Awaits `check` at finalize time; an error is recorded against the subcase.
    pub fn eventually(&mut self, check: impl Future<Output = TestResult> + 'static) {
        self.eventual.push(Box::pin(check));
    }

    /// Awaits eventual checks, then runs cleanups in reverse order.
    pub(crate) async fn finalize_tracked(&mut self) {
        for check in std::mem::take(&mut self.eventual) {
            if let Err(e) = check.await {
                self.log.push(LogEntry::from_error(&e));
            }
        }
        while let Some(cleanup) = self.cleanups.pop() {
            cleanup();
        }
    }

    pub(crate) fn into_log(self) -> SubcaseLog {
        self.log
    }
}

impl<F: Fixture> TestContext<F> {
    pub(crate) fn init_fixture(&mut self) -> LocalBoxFuture<'_, TestResult> {
        self.fixture.init(&mut self.log)
    }

    pub(crate) fn finalize_fixture(&mut self) -> LocalBoxFuture<'_, TestResult> {
        self.fixture.finalize(&mut self.log)
    }
}

impl<F> Deref for TestContext<F> {
    type Target = F;

    fn deref(&self) -> &F {
        &self.fixture
    }
}

impl<F> DerefMut for TestContext<F> {
    fn deref_mut(&mut self) -> &mut F {
        &mut self.fixture
    }
}
