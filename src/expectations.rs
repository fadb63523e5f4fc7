//! Declared expectations and how they apply to a case.
//!
//! An expectations file is a list of `{query, expectation}` records in JSON
//! or YAML:
//!
//! ```yaml
//! - query: "webgpu:api,operation,*"
//!   expectation: skip
//! - query: "webgpu:api,operation,buffers:map:size=4"
//!   expectation: fail
//! ```

use crate::errors::{ErrorKind, HarnessError};
use crate::query::{compare_queries, Ordering, TestQuery};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// What a declaration says about the cases it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectationKind {
    Fail,
    Skip,
}

/// One declared expectation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestExpectation {
    pub query: TestQuery,
    pub expectation: ExpectationKind,
}

/// The outcome a subcase is expected to have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExpectedStatus {
    #[default]
    Pass,
    Fail,
    Skip,
}

/// Computes the expected status of `query`.
///
/// Every declaration whose query is not [`Ordering::Unordered`] relative to
/// `query` applies, whether it is broader or narrower. A `skip` wins as soon
/// as it is seen; otherwise any applicable `fail` makes the result `Fail`.
pub fn expected_status(query: &TestQuery, expectations: &[TestExpectation]) -> ExpectedStatus {
    let mut status = ExpectedStatus::Pass;
    for declared in expectations {
        if compare_queries(&declared.query, query) == Ordering::Unordered {
            continue;
        }
        match declared.expectation {
            ExpectationKind::Skip => return ExpectedStatus::Skip,
            ExpectationKind::Fail => status = ExpectedStatus::Fail,
        }
    }
    status
}

/// Parses expectations; YAML is a superset of JSON, so either works.
pub fn parse_expectations(origin: &str, text: &str) -> Result<Vec<TestExpectation>, HarnessError> {
    let parsed: Result<Vec<TestExpectation>, String> = if origin.ends_with(".json") {
        serde_json::from_str(text).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(text).map_err(|e| e.to_string())
    };
    parsed.map_err(|reason| {
        HarnessError::new(ErrorKind::Expectations {
            origin: origin.to_string(),
            reason,
        })
    })
}

/// Reads and parses an expectations file.
pub fn load_expectations(path: &Path) -> Result<Vec<TestExpectation>, HarnessError> {
    let origin = path.display().to_string();
    let text = fs::read_to_string(path).map_err(|e| {
        HarnessError::new(ErrorKind::Io {
            path: origin.clone(),
            reason: e.to_string(),
        })
    })?;
    let expectations = parse_expectations(&origin, &text)?;
    info!(count = expectations.len(), path = %origin, "loaded expectations");
    for e in &expectations {
        debug!(query = %e.query, expectation = ?e.expectation, "expectation");
    }
    Ok(expectations)
}
