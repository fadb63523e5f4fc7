//! The `conform` command-line interface.
//!
//! Parses arguments, resolves queries against a [`SuiteRegistry`] and hands
//! the results to [`output::Reporter`]. Harness errors are rendered through
//! miette.

use crate::cli::args::{Command, ConformArgs, RunArgs};
use crate::cli::output::Reporter;
use crate::errors::{print_error, ErrorKind, HarnessError};
use crate::loader::{SuiteRegistry, TestInfo, TestLoader};
use crate::logging;
use crate::query::{parser::parse_query, TestQuery, LEVEL_SEPARATOR, WILDCARD};
use crate::runner::{Harness, RunSummary, TestConfig};
use clap::Parser;
use futures::executor::block_on;
use std::io;
use std::process::ExitCode;

pub mod args;
pub mod output;

/// Exit code for harness errors (bad query, bad expectations file, invalid registration).
const EXIT_HARNESS_ERROR: u8 = 2;

/// Parses `std::env::args` and runs the command against `registry`.
pub fn run(registry: &SuiteRegistry) -> ExitCode {
    run_with_args(ConformArgs::parse(), registry)
}

pub fn run_with_args(args: ConformArgs, registry: &SuiteRegistry) -> ExitCode {
    logging::init(args.verbose.saturating_sub(1));

    let result = match &args.command {
        Command::Run(run) => handle_run(&args, run, registry),
        Command::List { queries } => handle_list(&args, queries, registry, false),
        Command::ListUnimplemented { queries } => handle_list(&args, queries, registry, true),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            print_error(e);
            ExitCode::from(EXIT_HARNESS_ERROR)
        }
    }
}

fn stdout_error(e: io::Error) -> HarnessError {
    HarnessError::new(ErrorKind::Io {
        path: "<stdout>".to_string(),
        reason: e.to_string(),
    })
}

/// Parses each query; no queries means the whole suite.
fn parse_queries(queries: &[String], suite: &str) -> Result<Vec<TestQuery>, HarnessError> {
    if queries.is_empty() {
        let everything = format!("{}{}{}", suite, LEVEL_SEPARATOR, WILDCARD);
        return Ok(vec![parse_query(&everything)?]);
    }
    queries.iter().map(|q| parse_query(q)).collect()
}

fn config_for(args: &ConformArgs, run: Option<&RunArgs>) -> TestConfig {
    let defaults = TestConfig::default();
    TestConfig {
        debug: run.map_or(false, |r| r.debug),
        verbose: args.verbose > 0,
        print_json: run.map_or(false, |r| r.json),
        use_colors: defaults.use_colors && !args.no_color,
        expectations: run.and_then(|r| r.expectations.clone()),
    }
}

fn handle_run(args: &ConformArgs, run: &RunArgs, registry: &SuiteRegistry) -> Result<bool, HarnessError> {
    let queries = parse_queries(&run.queries, registry.suite())?;
    let config = config_for(args, Some(run));
    let mut reporter = Reporter::new(&config);
    let harness = Harness::from_config(config, registry)?;

    let mut summary = RunSummary::default();
    for query in &queries {
        let mut write_error = None;
        let result = block_on(harness.run_with(query, |case| {
            if let Err(e) = reporter.case(case) {
                write_error.get_or_insert(e);
            }
        }))?;
        if let Some(e) = write_error {
            return Err(stdout_error(e));
        }
        summary.extend(result);
    }
    reporter.summary(&summary).map_err(stdout_error)?;
    Ok(summary.is_success())
}

fn handle_list(
    args: &ConformArgs,
    queries: &[String],
    registry: &SuiteRegistry,
    unimplemented_only: bool,
) -> Result<bool, HarnessError> {
    let queries = parse_queries(queries, registry.suite())?;
    let mut tests: Vec<TestInfo> = Vec::new();
    for query in &queries {
        for test in block_on(registry.load_tests(query))? {
            if (!unimplemented_only || test.unimplemented) && !tests.contains(&test) {
                tests.push(test);
            }
        }
    }
    let mut reporter = Reporter::new(&config_for(args, None));
    reporter.tests(&tests).map_err(stdout_error)?;
    Ok(true)
}
