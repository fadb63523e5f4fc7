//! User-facing output for the CLI: per-case lines, the run summary and
//! test listings. Text goes through `termcolor`; `--json` emits one
//! `serde_json` object per case.

use crate::loader::TestInfo;
use crate::recorder::{CaseResult, Status};
use crate::runner::{RunSummary, TestConfig};
use std::io::{self, Write};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

fn status_color(status: Status) -> Option<Color> {
    match status {
        Status::Pass => Some(Color::Green),
        Status::Fail => Some(Color::Red),
        Status::Skip => Some(Color::Yellow),
        Status::Warn => Some(Color::Magenta),
        Status::NotRun => None,
    }
}

/// Writes results to stdout as they arrive.
pub struct Reporter {
    out: StandardStream,
    verbose: bool,
    print_json: bool,
}

impl Reporter {
    pub fn new(config: &TestConfig) -> Self {
        let choice = if config.use_colors {
            ColorChoice::Auto
        } else {
            ColorChoice::Never
        };
        Self {
            out: StandardStream::stdout(choice),
            verbose: config.verbose,
            print_json: config.print_json,
        }
    }

    fn colored(&mut self, text: &str, color: Option<Color>, bold: bool) -> io::Result<()> {
        self.out
            .set_color(ColorSpec::new().set_fg(color).set_bold(bold))?;
        write!(self.out, "{}", text)?;
        self.out.reset()
    }

    /// One finished case. Passing cases are only shown when verbose.
    pub fn case(&mut self, result: &CaseResult) -> io::Result<()> {
        if self.print_json {
            let line = serde_json::to_string(result).map_err(io::Error::from)?;
            return writeln!(self.out, "{}", line);
        }
        if result.status == Status::Pass && !self.verbose {
            return Ok(());
        }

        let label = result.status.to_string().to_uppercase();
        self.colored(&label, status_color(result.status), true)?;
        writeln!(self.out, ": {} ({:.1}ms)", result.query, result.time_ms)?;
        for log in &result.logs {
            for line in log.to_string().lines() {
                writeln!(self.out, "    {}", line)?;
            }
        }
        Ok(())
    }

    pub fn summary(&mut self, summary: &RunSummary) -> io::Result<()> {
        if self.print_json {
            return Ok(());
        }
        let counts = summary.counts();
        write!(self.out, "\nTest summary: total {}, ", summary.results.len())?;
        self.colored("passed", Some(Color::Green), false)?;
        write!(self.out, " {}, ", counts.pass)?;
        self.colored("failed", Some(Color::Red), false)?;
        write!(self.out, " {}, ", counts.fail)?;
        self.colored("skipped", Some(Color::Yellow), false)?;
        write!(self.out, " {}, ", counts.skip)?;
        self.colored("warned", Some(Color::Magenta), false)?;
        writeln!(self.out, " {}", counts.warn)?;

        if counts.fail > 0 {
            writeln!(self.out, "\nFailed cases:")?;
            for result in summary.results.iter().filter(|r| r.status == Status::Fail) {
                writeln!(self.out, "  - {}", result.query)?;
            }
        }
        self.out.flush()
    }

    /// One line per test, with its description when it has one.
    pub fn tests(&mut self, tests: &[TestInfo]) -> io::Result<()> {
        for test in tests {
            write!(self.out, "{}", test.query)?;
            if test.unimplemented {
                write!(self.out, " ")?;
                self.colored("[unimplemented]", Some(Color::Yellow), false)?;
            }
            if let Some(description) = &test.description {
                write!(self.out, "  ")?;
                self.colored(description, Some(Color::Cyan), false)?;
            }
            writeln!(self.out)?;
        }
        self.out.flush()
    }
}
