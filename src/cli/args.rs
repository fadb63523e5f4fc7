//! Command-line arguments for the `conform` binary.

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "conform",
    version,
    about = "Run and list conformance tests selected by hierarchical queries."
)]
pub struct ConformArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Report every case; repeat for harness logging (-vv info, -vvv debug).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run every case the queries select.
    Run(RunArgs),
    /// List the tests the queries select.
    List {
        /// Queries such as `suite:file,*` (defaults to the whole suite).
        queries: Vec<String>,
    },
    /// List tests that are registered but not implemented yet.
    ListUnimplemented {
        queries: Vec<String>,
    },
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Queries such as `suite:file:test:x=1;*` (defaults to the whole suite).
    pub queries: Vec<String>,

    /// Expectations file (JSON or YAML) marking cases as expected to fail or skip.
    #[arg(long, value_name = "FILE")]
    pub expectations: Option<PathBuf>,

    /// Keep debug messages and every stack in the results.
    #[arg(long)]
    pub debug: bool,

    /// Print one JSON object per case instead of text.
    #[arg(long)]
    pub json: bool,
}
