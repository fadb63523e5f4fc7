//! Conform: a conformance-test harness.
//!
//! Tests are registered per file in a [`TestGroup`], expanded from lazy
//! parameter builders into cases and subcases, addressed by hierarchical
//! [`TestQuery`] strings (`suite:file:test:params`) and run under a
//! [`Harness`] that records one [`CaseResult`] per case.

pub use crate::errors::{ErrorKind, HarnessError, TestError, TestErrorKind, TestResult};
pub use crate::expectations::{ExpectationKind, ExpectedStatus, TestExpectation};
pub use crate::fixture::{BasicFixture, Fixture, SharedState, SubcaseLog, TestContext};
pub use crate::group::{RunCase, TestBuilder, TestGroup};
pub use crate::loader::{SuiteRegistry, TestInfo, TestLoader};
pub use crate::params::{CaseParamsBuilder, ParamRecord, ParamValue, SubcaseParamsBuilder};
pub use crate::query::{compare_queries, parser::parse_query, Ordering, QueryLevel, TestQuery};
pub use crate::recorder::{CaseResult, Status, TestCaseRecorder};
pub use crate::runner::{Harness, RunSummary, TestConfig};

pub mod check;
pub mod cli;
pub mod demo;
pub mod errors;
pub mod expectations;
pub mod fixture;
pub mod group;
pub mod loader;
pub mod logging;
pub mod params;
pub mod query;
pub mod recorder;
pub mod runner;
