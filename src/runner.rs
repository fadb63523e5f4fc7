//! Running queries end to end.
//!
//! A [`Harness`] is an explicitly constructed value holding the run
//! configuration, a loader and the declared expectations. Cases run one
//! after another on the calling thread; each gets a fresh recorder.

use crate::errors::HarnessError;
use crate::expectations::{load_expectations, TestExpectation};
use crate::loader::TestLoader;
use crate::query::TestQuery;
use crate::recorder::{CaseResult, Status, TestCaseRecorder};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, info_span, warn, Instrument};

/// Configuration for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    /// Keep debug-level messages and every stack.
    pub debug: bool,
    /// Report every case, not just the ones that did not pass.
    pub verbose: bool,
    /// Emit one JSON line per case.
    pub print_json: bool,
    pub use_colors: bool,
    /// Expectations file (JSON or YAML).
    pub expectations: Option<PathBuf>,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            debug: false,
            verbose: false,
            print_json: false,
            use_colors: atty::is(atty::Stream::Stdout),
            expectations: None,
        }
    }
}

/// Per-status counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
    pub warn: usize,
    pub notrun: usize,
}

/// Everything a run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub results: Vec<CaseResult>,
}

impl RunSummary {
    pub fn counts(&self) -> Counts {
        self.results.iter().fold(Counts::default(), |mut c, r| {
            match r.status {
                Status::Pass => c.pass += 1,
                Status::Fail => c.fail += 1,
                Status::Skip => c.skip += 1,
                Status::Warn => c.warn += 1,
                Status::NotRun => c.notrun += 1,
            }
            c
        })
    }

    /// No case failed.
    pub fn is_success(&self) -> bool {
        self.results.iter().all(|r| r.status != Status::Fail)
    }

    pub fn extend(&mut self, other: RunSummary) {
        self.results.extend(other.results);
    }
}

/// A configured harness bound to one loader.
pub struct Harness<'l> {
    config: TestConfig,
    loader: &'l dyn TestLoader,
    expectations: Vec<TestExpectation>,
}

impl<'l> Harness<'l> {
    pub fn new(config: TestConfig, loader: &'l dyn TestLoader) -> Self {
        Self {
            config,
            loader,
            expectations: Vec::new(),
        }
    }

    /// Builds a harness, reading the expectations file named in `config`.
    pub fn from_config(config: TestConfig, loader: &'l dyn TestLoader) -> Result<Self, HarnessError> {
        let expectations = match &config.expectations {
            Some(path) => load_expectations(path)?,
            None => Vec::new(),
        };
        Ok(Self::new(config, loader).with_expectations(expectations))
    }

    pub fn with_expectations(mut self, expectations: Vec<TestExpectation>) -> Self {
        self.expectations = expectations;
        self
    }

    pub fn config(&self) -> &TestConfig {
        &self.config
    }

    pub fn loader(&self) -> &dyn TestLoader {
        self.loader
    }

    /// Runs every case `query` covers.
    pub async fn run(&self, query: &TestQuery) -> Result<RunSummary, HarnessError> {
        self.run_with(query, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_result` as each case finishes.
    pub async fn run_with(
        &self,
        query: &TestQuery,
        mut on_result: impl FnMut(&CaseResult),
    ) -> Result<RunSummary, HarnessError> {
        let span = info_span!("run", query = %query);
        async move {
            let cases = self.loader.load_cases(query).await?;
            if cases.is_empty() {
                warn!("query matched no cases");
            }

            let mut summary = RunSummary::default();
            for case in &cases {
                let mut rec = TestCaseRecorder::new(case.query().to_string());
                case.run(&mut rec, &self.expectations, self.config.debug).await;
                let result = rec.finish();
                info!(case = %result.query, status = %result.status, time_ms = result.time_ms, "case done");
                on_result(&result);
                summary.results.push(result);
            }
            Ok::<_, HarnessError>(summary)
        }
        .instrument(span)
        .await
    }

    /// Drives [`run`](Self::run) to completion on the current thread.
    pub fn run_blocking(&self, query: &TestQuery) -> Result<RunSummary, HarnessError> {
        futures::executor::block_on(self.run(query))
    }
}
