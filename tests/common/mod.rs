//! Shared helpers for the integration tests.
#![allow(dead_code)]

use conform::expectations::{ExpectationKind, TestExpectation};
use conform::{parse_query, CaseResult, Harness, RunSummary, Status, SuiteRegistry, TestConfig};

pub fn quiet_config() -> TestConfig {
    TestConfig {
        use_colors: false,
        ..TestConfig::default()
    }
}

pub fn run(registry: &SuiteRegistry, query: &str) -> RunSummary {
    run_expecting(registry, query, Vec::new())
}

pub fn run_expecting(registry: &SuiteRegistry, query: &str, expectations: Vec<TestExpectation>) -> RunSummary {
    let query = parse_query(query).expect("valid query");
    Harness::new(quiet_config(), registry)
        .with_expectations(expectations)
        .run_blocking(&query)
        .expect("run succeeds")
}

pub fn expect(query: &str, expectation: ExpectationKind) -> TestExpectation {
    TestExpectation {
        query: parse_query(query).expect("valid query"),
        expectation,
    }
}

pub fn result<'a>(summary: &'a RunSummary, query: &str) -> &'a CaseResult {
    summary
        .results
        .iter()
        .find(|r| r.query == query)
        .unwrap_or_else(|| panic!("no result for {query}; got {:?}", queries(summary)))
}

pub fn status(summary: &RunSummary, query: &str) -> Status {
    result(summary, query).status
}

pub fn queries(summary: &RunSummary) -> Vec<&str> {
    summary.results.iter().map(|r| r.query.as_str()).collect()
}

/// Every rendered log line of a result, joined.
pub fn log_text(result: &CaseResult) -> String {
    result
        .logs
        .iter()
        .map(|l| l.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}
