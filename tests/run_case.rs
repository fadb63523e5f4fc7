mod common;

use common::{expect, log_text, queries, result, run, run_expecting, status};
use conform::expectations::ExpectationKind;
use conform::fixture::SubcaseLog;
use conform::{
    BasicFixture, Fixture, ParamRecord, SharedState, Status, SuiteRegistry, TestError, TestGroup, TestResult,
};
use futures::future::LocalBoxFuture;
use std::cell::RefCell;

thread_local! {
    static EVENTS: RefCell<Vec<String>> = RefCell::new(Vec::new());
}

fn event(e: impl Into<String>) {
    EVENTS.with(|events| events.borrow_mut().push(e.into()));
}

fn take_events() -> Vec<String> {
    EVENTS.with(|events| std::mem::take(&mut *events.borrow_mut()))
}

struct Pool {
    fail_init: bool,
}

impl SharedState for Pool {
    fn create(params: &ParamRecord) -> Result<Self, TestError> {
        event("pool create");
        Ok(Self {
            fail_init: params.get::<bool>("_fail_pool").unwrap_or(false),
        })
    }

    fn init(&mut self) -> LocalBoxFuture<'_, TestResult> {
        Box::pin(async move {
            event("pool init");
            if self.fail_init {
                return Err(TestError::operation("pool init failed"));
            }
            Ok(())
        })
    }

    fn finalize(&mut self) -> LocalBoxFuture<'_, TestResult> {
        Box::pin(async move {
            event("pool finalize");
            Ok(())
        })
    }
}

struct Tracked {
    fail_init: bool,
}

impl Fixture for Tracked {
    type Shared = Pool;

    fn create(_shared: &Pool, params: &ParamRecord) -> Result<Self, TestError> {
        event("create");
        Ok(Self {
            fail_init: params.get::<bool>("_fail_init").unwrap_or(false),
        })
    }

    fn init<'a>(&'a mut self, log: &'a mut SubcaseLog) -> LocalBoxFuture<'a, TestResult> {
        Box::pin(async move {
            event("init");
            log.info("initialized");
            if self.fail_init {
                return Err(TestError::operation("init failed"));
            }
            Ok(())
        })
    }

    fn finalize<'a>(&'a mut self, _log: &'a mut SubcaseLog) -> LocalBoxFuture<'a, TestResult> {
        Box::pin(async move {
            event("finalize");
            Ok(())
        })
    }
}

fn registry() -> SuiteRegistry {
    let mut tracked = TestGroup::<Tracked>::new();
    tracked
        .test("lifecycle")
        .unwrap()
        .params(|u| u.combine("x", [1, 2]).begin_subcases().combine("y", [1, 2]))
        .unwrap()
        .body_sync(|t| {
            event(format!("body {}", t.params()));
            Ok(())
        })
        .unwrap();
    tracked
        .test("panics")
        .unwrap()
        .body_sync(|_| panic!("boom"))
        .unwrap();
    tracked
        .test("init_fails")
        .unwrap()
        .params_simple([conform::params! { "_fail_init" => true }])
        .unwrap()
        .body_sync(|_| {
            event("body");
            Ok(())
        })
        .unwrap();
    tracked
        .test("pool_fails")
        .unwrap()
        .params_simple([conform::params! { "_fail_pool" => true }])
        .unwrap()
        .body_sync(|_| {
            event("body");
            Ok(())
        })
        .unwrap();
    tracked
        .test("cleanups")
        .unwrap()
        .body_sync(|t| {
            for i in 0..3 {
                t.track_for_cleanup(move || event(format!("cleanup {}", i)));
            }
            Ok(())
        })
        .unwrap();

    let mut basic = TestGroup::<BasicFixture>::new();
    basic
        .test("odd")
        .unwrap()
        .params(|u| u.combine("x", [1, 2]))
        .unwrap()
        .body_sync(|t| {
            let x: i64 = t.param("x")?;
            t.expect(x != 1, "x must not be 1");
            Ok(())
        })
        .unwrap();
    basic
        .test("skips")
        .unwrap()
        .params_subcases_only(|s| s.combine("y", [1, 2, 3]))
        .unwrap()
        .body_sync(|t| Err(t.skip("not here")))
        .unwrap();
    basic
        .test("eventual")
        .unwrap()
        .body(|t| {
            Box::pin(async move {
                t.eventually(async { Err(TestError::expectation("never settled")) });
                Ok(())
            })
        })
        .unwrap();
    basic.test("later").unwrap().unimplemented().unwrap();

    let mut lanes = TestGroup::<BasicFixture>::new();
    lanes
        .test("lanes")
        .unwrap()
        .params(|u| u.combine("x", [1]).begin_subcases().combine("y", [1, 2]))
        .unwrap()
        .body_sync(|t| {
            let y: i64 = t.param("y")?;
            t.expect(y != 2, "lane 2 is broken");
            Ok(())
        })
        .unwrap();

    let mut registry = SuiteRegistry::new("s");
    registry
        .add_file("tracked", "fixture lifecycle", tracked)
        .unwrap()
        .add_file("basic", "statuses", basic)
        .unwrap()
        .add_file("lanes", "subcase expectations", lanes)
        .unwrap();
    registry
}

#[test]
fn lifecycle_runs_in_order() {
    let registry = registry();
    take_events();
    let summary = run(&registry, "s:tracked:lifecycle:x=1;*");
    assert_eq!(queries(&summary), ["s:tracked:lifecycle:x=1"]);
    assert_eq!(status(&summary, "s:tracked:lifecycle:x=1"), Status::Pass);
    assert_eq!(
        take_events(),
        [
            "pool create",
            "pool init",
            "create",
            "init",
            "body x=1;y=1",
            "finalize",
            "create",
            "init",
            "body x=1;y=2",
            "finalize",
            "pool finalize",
        ]
    );
}

#[test]
fn finalize_runs_after_a_panic() {
    let registry = registry();
    take_events();
    let summary = run(&registry, "s:tracked:panics:");
    let r = result(&summary, "s:tracked:panics:");
    assert_eq!(r.status, Status::Fail);
    assert!(log_text(r).contains("EXCEPTION: panic: boom"));
    assert_eq!(take_events(), ["pool create", "pool init", "create", "init", "finalize", "pool finalize"]);
}

#[test]
fn failed_init_skips_the_body_but_not_finalize() {
    let registry = registry();
    take_events();
    let summary = run(&registry, "s:tracked:init_fails,*");
    assert_eq!(summary.results[0].status, Status::Fail);
    assert!(log_text(&summary.results[0]).contains("OperationError: init failed"));
    assert_eq!(take_events(), ["pool create", "pool init", "create", "init", "finalize", "pool finalize"]);
}

#[test]
fn failed_shared_init_still_finalizes_the_pool() {
    let registry = registry();
    take_events();
    let summary = run(&registry, "s:tracked:pool_fails,*");
    assert_eq!(summary.results[0].status, Status::Fail);
    assert_eq!(take_events(), ["pool create", "pool init", "pool finalize"]);
}

#[test]
fn cleanups_run_most_recent_first() {
    let registry = registry();
    take_events();
    run(&registry, "s:tracked:cleanups,*");
    let events = take_events();
    let cleanups: Vec<&str> = events.iter().map(String::as_str).filter(|e| e.starts_with("cleanup")).collect();
    assert_eq!(cleanups, ["cleanup 2", "cleanup 1", "cleanup 0"]);
    let finalize = events.iter().position(|e| e == "finalize").unwrap();
    let last_cleanup = events.iter().position(|e| e == "cleanup 0").unwrap();
    assert!(last_cleanup < finalize);
}

#[test]
fn single_case_query_runs_only_the_named_subcase() {
    let registry = registry();
    take_events();
    let summary = run(&registry, "s:tracked:lifecycle:x=1;y=2");
    assert_eq!(queries(&summary), ["s:tracked:lifecycle:x=1"]);
    let bodies: Vec<String> = take_events().into_iter().filter(|e| e.starts_with("body")).collect();
    assert_eq!(bodies, ["body x=1;y=2"]);
}

#[test]
fn subcase_params_in_a_case_query_narrow_every_case() {
    let registry = registry();
    take_events();
    let summary = run(&registry, "s:tracked:lifecycle:y=2;*");
    assert_eq!(summary.results.len(), 2);
    let bodies: Vec<String> = take_events().into_iter().filter(|e| e.starts_with("body")).collect();
    assert_eq!(bodies, ["body x=1;y=2", "body x=2;y=2"]);
}

#[test]
fn failing_cases_fail_unless_expected() {
    let registry = registry();
    let summary = run(&registry, "s:basic:odd,*");
    assert_eq!(status(&summary, "s:basic:odd:x=1"), Status::Fail);
    assert_eq!(status(&summary, "s:basic:odd:x=2"), Status::Pass);
    assert!(!summary.is_success());

    let expected = vec![expect("s:basic:odd:x=1;*", ExpectationKind::Fail)];
    let summary = run_expecting(&registry, "s:basic:odd,*", expected);
    assert_eq!(status(&summary, "s:basic:odd:x=1"), Status::Pass);
    assert!(summary.is_success());
}

#[test]
fn exact_case_expectations_apply() {
    let registry = registry();
    let expected = vec![expect("s:basic:odd:x=1", ExpectationKind::Fail)];
    let summary = run_expecting(&registry, "s:basic:odd:x=1", expected);
    assert_eq!(queries(&summary), ["s:basic:odd:x=1"]);
    assert_eq!(status(&summary, "s:basic:odd:x=1"), Status::Pass);
}

#[test]
fn subcase_expectations_do_not_depend_on_the_selecting_query() {
    let registry = registry();
    assert_eq!(status(&run(&registry, "s:lanes,*"), "s:lanes:lanes:x=1"), Status::Fail);

    let expected = vec![expect("s:lanes:lanes:x=1;y=2", ExpectationKind::Fail)];
    for query in ["s:lanes,*", "s:lanes:lanes:*", "s:lanes:lanes:x=1", "s:lanes:lanes:x=1;y=2"] {
        let summary = run_expecting(&registry, query, expected.clone());
        assert_eq!(status(&summary, "s:lanes:lanes:x=1"), Status::Pass, "{query}");
    }
}

#[test]
fn expected_failures_that_pass_warn() {
    let registry = registry();
    let expected = vec![expect("s:basic:odd:x=2", ExpectationKind::Fail)];
    let summary = run_expecting(&registry, "s:basic:odd:x=2", expected);
    let r = result(&summary, "s:basic:odd:x=2");
    assert_eq!(r.status, Status::Pass);
    assert!(log_text(r).contains("passed unexpectedly"));
}

#[test]
fn skip_expectations_do_not_run_the_body() {
    let registry = registry();
    take_events();
    let expected = vec![expect("s:tracked,*", ExpectationKind::Skip)];
    let summary = run_expecting(&registry, "s:tracked:lifecycle,*", expected);
    assert!(summary.results.iter().all(|r| r.status == Status::Skip));
    assert!(!take_events().iter().any(|e| e.starts_with("body")));
}

#[test]
fn all_skipped_subcases_skip_the_case() {
    let registry = registry();
    let summary = run(&registry, "s:basic:skips,*");
    let r = result(&summary, "s:basic:skips:");
    assert_eq!(r.status, Status::Skip);
    let text = log_text(r);
    assert!(text.contains("subcase skipped: not here"));
    assert!(text.contains("all subcases were skipped"));
}

#[test]
fn failing_eventual_checks_fail_the_case() {
    let registry = registry();
    let summary = run(&registry, "s:basic:eventual:");
    assert_eq!(status(&summary, "s:basic:eventual:"), Status::Fail);
}

#[test]
fn unimplemented_tests_skip() {
    let registry = registry();
    let summary = run(&registry, "s:basic:later,*");
    let r = result(&summary, "s:basic:later:");
    assert_eq!(r.status, Status::Skip);
    assert!(log_text(r).contains("test unimplemented"));
}

#[test]
fn file_queries_cover_every_case_in_order() {
    let registry = registry();
    let summary = run(&registry, "s:basic,*");
    assert_eq!(
        queries(&summary),
        [
            "s:basic:odd:x=1",
            "s:basic:odd:x=2",
            "s:basic:skips:",
            "s:basic:eventual:",
            "s:basic:later:",
        ]
    );
    let counts = summary.counts();
    assert_eq!((counts.pass, counts.fail, counts.skip), (1, 2, 2));
}
