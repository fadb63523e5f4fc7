//! Test registration and case execution.
//!
//! A test file builds one [`TestGroup`] per fixture type:
//!
//! ```ignore
//! let mut g = TestGroup::<BasicFixture>::new();
//! g.test("add,basic")?
//!     .desc("adds two numbers")
//!     .params(|u| u.combine("a", [1, 2]).combine("b", [3, 4]))?
//!     .body_sync(|t| {
//!         let (a, b): (i64, i64) = (t.param("a")?, t.param("b")?);
//!         t.expect(a + b > 0, "sum is positive");
//!         Ok(())
//!     })?;
//! ```
//!
//! Each test expands into [`RunCase`]s, one per case record. Running a case
//! drives the [`Fixture`] lifecycle once per subcase and reports everything
//! to a [`TestCaseRecorder`].

use crate::errors::{ErrorKind, HarnessError, TestError, TestResult};
use crate::expectations::{expected_status, ExpectedStatus, TestExpectation};
use crate::fixture::{Fixture, SharedState, TestContext};
use crate::params::{CaseParamsBuilder, ParamRecord, ParamsSource, SubcaseParamsBuilder};
use crate::query::{compare_queries, parser::is_valid_part, Ordering, TestQuery, PATH_SEPARATOR};
use crate::recorder::{LogSeverity, TestCaseRecorder};
use futures::future::{self, LocalBoxFuture};
use futures::FutureExt;
use once_cell::sync::Lazy;
use regex::Regex;
use std::any::Any;
use std::collections::HashSet;
use std::iter;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use tracing::{debug, trace};

/// An async test body.
pub type BodyFn<F> = Rc<dyn for<'a> Fn(&'a mut TestContext<F>) -> LocalBoxFuture<'a, TestResult>>;

/// A hook run on the shared state before the first subcase.
pub type BeforeAllFn<S> = Rc<dyn for<'a> Fn(&'a mut S) -> LocalBoxFuture<'a, TestResult>>;

static PERCENT_ESCAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"%[0-9A-Fa-f]{2}").unwrap());

fn boxed_body<F, B>(body: B) -> BodyFn<F>
where
    B: for<'a> Fn(&'a mut TestContext<F>) -> LocalBoxFuture<'a, TestResult> + 'static,
{
    Rc::new(body)
}

// ============================================================================
// TEST GROUP
// ============================================================================

/// The tests of one file, in registration order.
pub struct TestGroup<F: Fixture> {
    seen: HashSet<String>,
    tests: Vec<TestBuilder<F>>,
}

impl<F: Fixture> Default for TestGroup<F> {
    fn default() -> Self {
        Self {
            seen: HashSet::new(),
            tests: Vec::new(),
        }
    }
}

impl<F: Fixture> TestGroup<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a test. `name` is a `,`-separated test path.
    pub fn test(&mut self, name: &str) -> Result<&mut TestBuilder<F>, HarnessError> {
        if PERCENT_ESCAPE.is_match(name) {
            return Err(HarnessError::invalid_test_name(
                name,
                "name must read the same after percent-decoding",
            ));
        }
        let parts: Vec<String> = name.split(PATH_SEPARATOR).map(str::to_string).collect();
        if let Some(bad) = parts.iter().find(|p| !is_valid_part(p)) {
            return Err(HarnessError::invalid_test_name(
                name,
                format!("part '{}' must match [a-zA-Z0-9_]+", bad),
            ));
        }
        if !self.seen.insert(name.to_string()) {
            return Err(HarnessError::new(ErrorKind::DuplicateTestName {
                name: name.to_string(),
            }));
        }
        self.tests.push(TestBuilder::new(parts));
        let index = self.tests.len() - 1;
        Ok(&mut self.tests[index])
    }

    pub fn len(&self) -> usize {
        self.tests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }
}

/// A group as the loader sees it, with the fixture type erased.
pub trait TestGroupSource {
    fn validate(&self) -> Result<(), HarnessError>;

    fn tests(&self) -> Box<dyn Iterator<Item = &dyn RunnableTest> + '_>;
}

impl<F: Fixture> TestGroupSource for TestGroup<F> {
    fn validate(&self) -> Result<(), HarnessError> {
        self.tests.iter().try_for_each(RunnableTest::validate)
    }

    fn tests(&self) -> Box<dyn Iterator<Item = &dyn RunnableTest> + '_> {
        Box::new(self.tests.iter().map(|t| t as &dyn RunnableTest))
    }
}

// ============================================================================
// TEST BUILDER
// ============================================================================

enum Body<F> {
    Unset,
    Attached(BodyFn<F>),
    Unimplemented,
}

/// One named test: description, parameterization and body.
pub struct TestBuilder<F: Fixture> {
    test_path: Vec<String>,
    description: Option<String>,
    spec_url: Option<String>,
    params: Option<Rc<dyn ParamsSource>>,
    before_all: Option<BeforeAllFn<F::Shared>>,
    body: Body<F>,
}

impl<F: Fixture> TestBuilder<F> {
    fn new(test_path: Vec<String>) -> Self {
        Self {
            test_path,
            description: None,
            spec_url: None,
            params: None,
            before_all: None,
            body: Body::Unset,
        }
    }

    fn name(&self) -> String {
        self.test_path.join(",")
    }

    pub fn desc(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into().trim().to_string());
        self
    }

    pub fn spec_url(&mut self, url: impl Into<String>) -> &mut Self {
        self.spec_url = Some(url.into());
        self
    }

    fn set_params(&mut self, source: impl ParamsSource + 'static) -> Result<&mut Self, HarnessError> {
        if self.params.is_some() {
            return Err(HarnessError::new(ErrorKind::AlreadyParameterized { test: self.name() }));
        }
        self.params = Some(Rc::new(source));
        Ok(self)
    }

    /// Parameterizes the test from a fresh case builder.
    pub fn params<S, B>(&mut self, build: B) -> Result<&mut Self, HarnessError>
    where
        B: FnOnce(CaseParamsBuilder) -> S,
        S: ParamsSource + 'static,
    {
        self.set_params(build(CaseParamsBuilder::new()))
    }

    /// One case per literal record.
    pub fn params_simple(
        &mut self,
        cases: impl IntoIterator<Item = ParamRecord>,
    ) -> Result<&mut Self, HarnessError> {
        self.set_params(CaseParamsBuilder::new().combine_with_params(cases))
    }

    /// A single empty case whose subcases come from `build`.
    pub fn params_subcases_only<B>(&mut self, build: B) -> Result<&mut Self, HarnessError>
    where
        B: FnOnce(SubcaseParamsBuilder) -> SubcaseParamsBuilder,
    {
        self.set_params(build(CaseParamsBuilder::new().begin_subcases()))
    }

    /// Runs `hook` on the shared state once per case, before any subcase.
    pub fn before_all_subcases<H>(&mut self, hook: H) -> &mut Self
    where
        H: for<'a> Fn(&'a mut F::Shared) -> LocalBoxFuture<'a, TestResult> + 'static,
    {
        self.before_all = Some(Rc::new(hook));
        self
    }

    fn attach(&mut self, body: Body<F>) -> Result<&mut Self, HarnessError> {
        if !matches!(self.body, Body::Unset) {
            return Err(HarnessError::new(ErrorKind::BodyAlreadyAttached { test: self.name() }));
        }
        self.body = body;
        Ok(self)
    }

    /// Attaches an async body.
    pub fn body<B>(&mut self, body: B) -> Result<&mut Self, HarnessError>
    where
        B: for<'a> Fn(&'a mut TestContext<F>) -> LocalBoxFuture<'a, TestResult> + 'static,
    {
        self.attach(Body::Attached(boxed_body(body)))
    }

    /// Attaches a synchronous body.
    pub fn body_sync<B>(&mut self, body: B) -> Result<&mut Self, HarnessError>
    where
        B: Fn(&mut TestContext<F>) -> TestResult + 'static,
    {
        self.attach(Body::Attached(boxed_body(move |t| {
            Box::pin(future::ready(body(t)))
        })))
    }

    /// Marks the test as not yet written; every case skips.
    pub fn unimplemented(&mut self) -> Result<&mut Self, HarnessError> {
        self.attach(Body::Unimplemented)
    }

    fn params_source(&self) -> Rc<dyn ParamsSource> {
        match &self.params {
            Some(source) => Rc::clone(source),
            None => Rc::new(CaseParamsBuilder::new()),
        }
    }

    fn runnable_body(&self) -> Option<BodyFn<F>> {
        match &self.body {
            Body::Unset => None,
            Body::Attached(body) => Some(Rc::clone(body)),
            Body::Unimplemented => Some(boxed_body(|_| {
                Box::pin(future::ready(Err(TestError::skip("test unimplemented"))))
            })),
        }
    }
}

/// A registered test as the loader sees it.
pub trait RunnableTest {
    fn test_path(&self) -> &[String];

    fn description(&self) -> Option<&str>;

    fn spec_url(&self) -> Option<&str>;

    fn is_unimplemented(&self) -> bool;

    /// Checks that a body is attached and that no two case × subcase
    /// combinations share public params.
    fn validate(&self) -> Result<(), HarnessError>;

    /// The cases of this test, addressed under `suite` and `file_path`.
    fn cases(
        &self,
        suite: &str,
        file_path: &[String],
    ) -> Box<dyn Iterator<Item = Result<RunCase, HarnessError>>>;
}

impl<F: Fixture> RunnableTest for TestBuilder<F> {
    fn test_path(&self) -> &[String] {
        &self.test_path
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn spec_url(&self) -> Option<&str> {
        self.spec_url.as_deref()
    }

    fn is_unimplemented(&self) -> bool {
        matches!(self.body, Body::Unimplemented)
    }

    fn validate(&self) -> Result<(), HarnessError> {
        let name = self.name();
        if matches!(self.body, Body::Unset) {
            return Err(HarnessError::new(ErrorKind::MissingBody { test: name }));
        }

        let mut seen = HashSet::new();
        for entry in self.params_source().iterate_cases_with_subcases() {
            let entry = entry?;
            let subcases = entry.subcases.unwrap_or_else(|| vec![ParamRecord::new()]);
            for subcase in &subcases {
                let merged = entry.params.merge(subcase)?;
                merged.check_reserved()?;
                if !seen.insert(merged.stringify_public_uniquely()) {
                    return Err(HarnessError::new(ErrorKind::DuplicateCase {
                        test: name,
                        params: merged.stringify_public(),
                    }));
                }
            }
        }
        trace!(test = %name, cases = seen.len(), "validated");
        Ok(())
    }

    fn cases(
        &self,
        suite: &str,
        file_path: &[String],
    ) -> Box<dyn Iterator<Item = Result<RunCase, HarnessError>>> {
        let body = match self.runnable_body() {
            Some(body) => body,
            None => {
                let error = HarnessError::new(ErrorKind::MissingBody { test: self.name() });
                return Box::new(iter::once(Err(error)));
            }
        };
        let runner: Rc<dyn CaseRunner> = Rc::new(FixtureRunner::<F> {
            body,
            before_all: self.before_all.clone(),
        });
        let suite = suite.to_string();
        let file_path = file_path.to_vec();
        let test_path = self.test_path.clone();
        Box::new(self.params_source().iterate_cases_with_subcases().map(move |entry| {
            let entry = entry?;
            Ok(RunCase {
                query: TestQuery::single_case(
                    suite.clone(),
                    file_path.clone(),
                    test_path.clone(),
                    &entry.params,
                ),
                params: entry.params,
                subcases: entry.subcases,
                subcase_filter: None,
                runner: Rc::clone(&runner),
            })
        }))
    }
}

// ============================================================================
// RUN CASE
// ============================================================================

/// One case of one test, ready to run.
///
/// Identity is the test path plus the public case params, i.e. its query.
pub struct RunCase {
    query: TestQuery,
    params: ParamRecord,
    subcases: Option<Vec<ParamRecord>>,
    subcase_filter: Option<TestQuery>,
    runner: Rc<dyn CaseRunner>,
}

impl RunCase {
    pub fn query(&self) -> &TestQuery {
        &self.query
    }

    /// Case params, private keys included.
    pub fn params(&self) -> &ParamRecord {
        &self.params
    }

    pub fn subcases(&self) -> Option<&[ParamRecord]> {
        self.subcases.as_deref()
    }

    /// Restricts the run to subcases not unordered with `filter`.
    pub fn with_subcase_filter(mut self, filter: TestQuery) -> Self {
        self.subcase_filter = Some(filter);
        self
    }

    /// True if `subcase` survives the subcase filter.
    pub fn runs_subcase(&self, subcase: &ParamRecord) -> bool {
        let filter = match &self.subcase_filter {
            Some(filter) => filter,
            None => return true,
        };
        match self.query.with_subcase(subcase) {
            Ok(query) => compare_queries(&query, filter) != Ordering::Unordered,
            Err(_) => true,
        }
    }

    /// Runs every subcase, reporting to `rec`. Never fails: all errors end up
    /// in the recorder.
    pub fn run<'a>(
        &'a self,
        rec: &'a mut TestCaseRecorder,
        expectations: &'a [TestExpectation],
        debugging: bool,
    ) -> LocalBoxFuture<'a, ()> {
        self.runner.run(self, rec, expectations, debugging)
    }
}

trait CaseRunner {
    fn run<'a>(
        &'a self,
        case: &'a RunCase,
        rec: &'a mut TestCaseRecorder,
        expectations: &'a [TestExpectation],
        debugging: bool,
    ) -> LocalBoxFuture<'a, ()>;
}

struct FixtureRunner<F: Fixture> {
    body: BodyFn<F>,
    before_all: Option<BeforeAllFn<F::Shared>>,
}

impl<F: Fixture> CaseRunner for FixtureRunner<F> {
    fn run<'a>(
        &'a self,
        case: &'a RunCase,
        rec: &'a mut TestCaseRecorder,
        expectations: &'a [TestExpectation],
        debugging: bool,
    ) -> LocalBoxFuture<'a, ()> {
        Box::pin(self.run_case(case, rec, expectations, debugging))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Records the outcome of a hook that may have returned an error or panicked.
fn record_outcome(rec: &mut TestCaseRecorder, outcome: Result<TestResult, Box<dyn Any + Send>>) {
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => rec.threw(&e),
        Err(payload) => rec.threw(&TestError::panic(panic_message(payload))),
    }
}

impl<F: Fixture> FixtureRunner<F> {
    async fn run_case(
        &self,
        case: &RunCase,
        rec: &mut TestCaseRecorder,
        expectations: &[TestExpectation],
        debugging: bool,
    ) {
        rec.start(debugging);

        let created = panic::catch_unwind(AssertUnwindSafe(|| F::Shared::create(&case.params)));
        let mut shared = match created {
            Ok(Ok(shared)) => shared,
            Ok(Err(e)) => return rec.threw(&e),
            Err(payload) => return rec.threw(&TestError::panic(panic_message(payload))),
        };

        let setup = AssertUnwindSafe(async {
            shared.init().await?;
            if let Some(before_all) = &self.before_all {
                before_all(&mut shared).await?;
            }
            Ok::<(), TestError>(())
        })
        .catch_unwind()
        .await;

        match setup {
            Ok(Ok(())) => self.run_subcases(case, &shared, rec, expectations).await,
            other => record_outcome(rec, other),
        }

        let finalized = AssertUnwindSafe(shared.finalize()).catch_unwind().await;
        record_outcome(rec, finalized);
    }

    async fn run_subcases(
        &self,
        case: &RunCase,
        shared: &F::Shared,
        rec: &mut TestCaseRecorder,
        expectations: &[TestExpectation],
    ) {
        let subcases = match &case.subcases {
            None => {
                let expected = expected_status(&case.query, expectations);
                self.run_subcase(shared, case.params.clone(), rec, expected, false)
                    .await;
                return;
            }
            Some(subcases) => subcases,
        };

        let mut total = 0;
        let mut skipped = 0;
        for subcase in subcases.iter().filter(|s| case.runs_subcase(s)) {
            rec.info(format!("subcase: {}", subcase.stringify_public()));
            let merged = case.params.merge(subcase);
            let query = case.query.with_subcase(subcase);
            let (params, query) = match (merged, query) {
                (Ok(params), Ok(query)) => (params, query),
                (Err(e), _) | (_, Err(e)) => {
                    rec.threw(&TestError::from(e));
                    continue;
                }
            };
            let expected = expected_status(&query, expectations);
            debug!(query = %query, ?expected, "subcase");
            if self.run_subcase(shared, params, rec, expected, true).await == LogSeverity::Skip {
                skipped += 1;
            }
            total += 1;
        }
        if total > 0 && skipped == total {
            rec.skipped(&TestError::skip("all subcases were skipped"));
        }
    }

    /// One subcase: create → init → body → finalize. Returns the subcase's
    /// final severity.
    async fn run_subcase(
        &self,
        shared: &F::Shared,
        params: ParamRecord,
        rec: &mut TestCaseRecorder,
        expected: ExpectedStatus,
        in_subcases: bool,
    ) -> LogSeverity {
        rec.begin_subcase();
        if expected == ExpectedStatus::Skip {
            rec.skipped(&TestError::skip("Skipped by expectations"));
            return rec.end_subcase(expected);
        }

        let created = panic::catch_unwind(AssertUnwindSafe(|| F::create(shared, &params)));
        let fixture = match created {
            Ok(Ok(fixture)) => fixture,
            other => {
                record_outcome(rec, other.map(|r| r.map(|_| ())));
                return rec.end_subcase(expected);
            }
        };

        let mut ctx = TestContext::new(fixture, params, rec.is_debugging());
        let outcome = AssertUnwindSafe(async {
            ctx.init_fixture().await?;
            (self.body)(&mut ctx).await
        })
        .catch_unwind()
        .await;

        let tracked = AssertUnwindSafe(ctx.finalize_tracked()).catch_unwind().await;
        let finalized = AssertUnwindSafe(ctx.finalize_fixture()).catch_unwind().await;

        for entry in ctx.into_log().take() {
            rec.log_entry(entry);
        }
        match outcome {
            Ok(Ok(())) => rec.passed(),
            Ok(Err(e)) if e.is_skip() && in_subcases => rec.skipped(&e.prefixed("subcase skipped: ")),
            other => record_outcome(rec, other),
        }
        record_outcome(rec, tracked.map(|()| Ok(())));
        record_outcome(rec, finalized);
        rec.end_subcase(expected)
    }
}
