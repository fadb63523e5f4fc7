//! The built-in `demo` suite run by the `conform` binary.
//!
//! It doubles as an end-to-end exercise of the harness: parameter
//! expansion, subcases, fixtures with shared state, content checks, async
//! bodies, skips, failures and unimplemented tests.

use crate::errors::HarnessError;
use crate::loader::SuiteRegistry;

mod basic;
mod failures;
mod scratch;

pub use scratch::{ScratchFixture, ScratchPool};

pub const SUITE: &str = "demo";

/// Builds the demo suite.
pub fn registry() -> Result<SuiteRegistry, HarnessError> {
    let mut registry = SuiteRegistry::new(SUITE);
    registry
        .add_file("basic", "Arithmetic, parameter expansion and subcases", basic::group()?)?
        .add_file("scratch", "Fixtures with case-level shared state", scratch::group()?)?
        .add_file("failures", "Cases that fail or skip on purpose", failures::group()?)?;
    Ok(registry)
}
