//! Resolving queries to runnable cases.
//!
//! The harness talks to a [`TestLoader`]; [`SuiteRegistry`] is the in-memory
//! implementation: test files register their [`TestGroup`](crate::group::TestGroup)
//! under a file path, and queries select files, tests and cases by
//! [`compare_queries`].

use crate::errors::HarnessError;
use crate::group::{RunCase, TestGroupSource};
use crate::params::ParamRecord;
use crate::query::{
    compare_queries, parser::is_valid_part, Ordering, QueryLevel, TestQuery, PATH_SEPARATOR,
};
use futures::future::{self, LocalBoxFuture};
use tracing::{debug, info};

/// Listing entry for one test.
#[derive(Debug, Clone, PartialEq)]
pub struct TestInfo {
    /// `suite:file:test:*`
    pub query: TestQuery,
    pub description: Option<String>,
    pub spec_url: Option<String>,
    pub unimplemented: bool,
}

/// Anything that can turn a query into cases.
pub trait TestLoader {
    /// Every case the query covers, in registration order. An empty result
    /// is not an error.
    fn load_cases<'a>(&'a self, query: &'a TestQuery) -> LocalBoxFuture<'a, Result<Vec<RunCase>, HarnessError>>;

    /// Every test the query touches.
    fn load_tests<'a>(&'a self, query: &'a TestQuery) -> LocalBoxFuture<'a, Result<Vec<TestInfo>, HarnessError>>;
}

struct SpecFile {
    path: Vec<String>,
    description: String,
    group: Box<dyn TestGroupSource>,
}

/// An in-memory suite: file paths mapped to registered groups.
pub struct SuiteRegistry {
    suite: String,
    files: Vec<SpecFile>,
}

impl SuiteRegistry {
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            files: Vec::new(),
        }
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    /// Registers `group` under the `,`-separated `path`.
    pub fn add_file(
        &mut self,
        path: &str,
        description: impl Into<String>,
        group: impl TestGroupSource + 'static,
    ) -> Result<&mut Self, HarnessError> {
        let parts: Vec<String> = path.split(PATH_SEPARATOR).map(str::to_string).collect();
        if let Some(bad) = parts.iter().find(|p| !is_valid_part(p)) {
            return Err(HarnessError::malformed_query(format!(
                "file path part '{}' must match [a-zA-Z0-9_]+",
                bad
            )));
        }
        if self.files.iter().any(|f| f.path == parts) {
            return Err(HarnessError::malformed_query(format!(
                "file '{}' registered twice",
                path
            )));
        }
        self.files.push(SpecFile {
            path: parts,
            description: description.into(),
            group: Box::new(group),
        });
        Ok(self)
    }

    /// File paths and descriptions, in registration order.
    pub fn files(&self) -> impl Iterator<Item = (&[String], &str)> {
        self.files
            .iter()
            .map(|f| (f.path.as_slice(), f.description.as_str()))
    }

    fn matching_files<'a>(&'a self, query: &'a TestQuery) -> impl Iterator<Item = &'a SpecFile> + 'a {
        self.files.iter().filter(move |file| {
            let file_query = TestQuery::multi_file(self.suite.clone(), file.path.clone());
            compare_queries(&file_query, query) != Ordering::Unordered
        })
    }

    fn test_query(&self, file: &SpecFile, test_path: &[String]) -> TestQuery {
        TestQuery::multi_case(
            self.suite.clone(),
            file.path.clone(),
            test_path.to_vec(),
            &ParamRecord::new(),
        )
    }

    /// Loads synchronously; the trait methods wrap this.
    pub fn load_cases_now(&self, query: &TestQuery) -> Result<Vec<RunCase>, HarnessError> {
        let mut cases = Vec::new();
        for file in self.matching_files(query) {
            file.group.validate()?;
            debug!(file = %file.path.join(","), "validated file");
            for test in file.group.tests() {
                let test_query = self.test_query(file, test.test_path());
                if compare_queries(&test_query, query) == Ordering::Unordered {
                    continue;
                }
                for case in test.cases(&self.suite, &file.path) {
                    if let Some(case) = select_case(case?, query) {
                        cases.push(case);
                    }
                }
            }
        }
        info!(query = %query, cases = cases.len(), "loaded cases");
        Ok(cases)
    }

    pub fn load_tests_now(&self, query: &TestQuery) -> Result<Vec<TestInfo>, HarnessError> {
        let mut tests = Vec::new();
        for file in self.matching_files(query) {
            file.group.validate()?;
            for test in file.group.tests() {
                let test_query = self.test_query(file, test.test_path());
                if compare_queries(&test_query, query) == Ordering::Unordered {
                    continue;
                }
                tests.push(TestInfo {
                    query: test_query,
                    description: test.description().map(str::to_string),
                    spec_url: test.spec_url().map(str::to_string),
                    unimplemented: test.is_unimplemented(),
                });
            }
        }
        Ok(tests)
    }
}

/// Keeps a case the query covers. A case-level query naming params the
/// case does not have keeps the case with only the matching subcases.
fn select_case(case: RunCase, query: &TestQuery) -> Option<RunCase> {
    match compare_queries(case.query(), query) {
        Ordering::Equal | Ordering::StrictSubset => return Some(case),
        Ordering::StrictSuperset => return None,
        Ordering::Unordered => {}
    }

    let narrows_subcases = query.level() >= QueryLevel::MultiCase
        && case.query().file_path() == query.file_path()
        && case.query().test_path() == query.test_path()
        && case
            .query()
            .params()
            .iter()
            .all(|(key, value)| query.params().value(key).map_or(true, |q| q == value));
    if !narrows_subcases {
        return None;
    }
    let case = case.with_subcase_filter(query.clone());
    let any_subcase = case
        .subcases()
        .map_or(false, |subs| subs.iter().any(|s| case.runs_subcase(s)));
    any_subcase.then_some(case)
}

impl TestLoader for SuiteRegistry {
    fn load_cases<'a>(&'a self, query: &'a TestQuery) -> LocalBoxFuture<'a, Result<Vec<RunCase>, HarnessError>> {
        Box::pin(future::ready(self.load_cases_now(query)))
    }

    fn load_tests<'a>(&'a self, query: &'a TestQuery) -> LocalBoxFuture<'a, Result<Vec<TestInfo>, HarnessError>> {
        Box::pin(future::ready(self.load_tests_now(query)))
    }
}
