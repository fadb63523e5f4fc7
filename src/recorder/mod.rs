//! Per-case result recording.
//!
//! A [`TestCaseRecorder`] lives for exactly one case run. It collects log
//! messages (deduplicated by signature), tracks a status per subcase, and
//! folds everything into a [`CaseResult`] when the case finishes.
//!
//! Statuses are tracked as [`LogSeverity`] values; the final status is the
//! worst severity seen, mapped back onto [`Status`].

use crate::errors::{TestError, TestErrorKind};
use crate::expectations::ExpectedStatus;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::panic::Location;
use std::time::Instant;
use tracing::{debug, trace};

pub mod message;

pub use message::LogMessageWithStack;

/// Only this many messages at the highest severity keep their stacks.
pub const MAX_LOG_STACKS: usize = 2;
/// Messages below this severity never show a stack.
pub const MIN_SEVERITY_FOR_STACK: LogSeverity = LogSeverity::Warn;

/// Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogSeverity {
    NotRun,
    Skip,
    Pass,
    Warn,
    ExpectFailed,
    ValidationFailed,
    ThrewException,
}

impl LogSeverity {
    pub fn status(self) -> Status {
        match self {
            Self::NotRun => Status::NotRun,
            Self::Skip => Status::Skip,
            Self::Pass => Status::Pass,
            Self::Warn => Status::Warn,
            Self::ExpectFailed | Self::ValidationFailed | Self::ThrewException => Status::Fail,
        }
    }
}

/// Final status of a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pass,
    Skip,
    Warn,
    Fail,
    NotRun,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Status::Pass => "pass",
            Status::Skip => "skip",
            Status::Warn => "warn",
            Status::Fail => "fail",
            Status::NotRun => "notrun",
        })
    }
}

/// The structured result of one case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub query: String,
    pub status: Status,
    #[serde(rename = "timems")]
    pub time_ms: f64,
    pub logs: Vec<LogMessageWithStack>,
}

/// A message produced while a subcase runs, before it reaches the recorder.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub severity: LogSeverity,
    pub name: String,
    pub message: String,
    pub stack: Option<String>,
}

impl LogEntry {
    pub fn new(
        severity: LogSeverity,
        name: impl Into<String>,
        message: impl Into<String>,
        stack: Option<String>,
    ) -> Self {
        Self {
            severity,
            name: name.into(),
            message: message.into(),
            stack,
        }
    }

    /// An entry stamped with the caller's location.
    #[track_caller]
    pub fn here(severity: LogSeverity, name: &str, message: impl Into<String>) -> Self {
        Self::new(severity, name, message, Some(stack_line(Location::caller())))
    }

    /// Classifies a test error: skips, expectation and validation failures,
    /// and everything else as an exception.
    pub fn from_error(error: &TestError) -> Self {
        let stack = Some(stack_line(error.location));
        match &error.kind {
            TestErrorKind::Skip => Self::new(LogSeverity::Skip, "SKIP", &error.message, stack),
            TestErrorKind::Expectation => {
                Self::new(LogSeverity::ExpectFailed, "EXPECTATION FAILED", &error.message, stack)
            }
            TestErrorKind::Validation => {
                Self::new(LogSeverity::ValidationFailed, "VALIDATION FAILED", &error.message, stack)
            }
            TestErrorKind::UnexpectedPass => Self::new(
                LogSeverity::Warn,
                "WARN",
                format!("UnexpectedPassError: {}", error.message),
                None,
            ),
            TestErrorKind::Operation => Self::new(
                LogSeverity::ThrewException,
                "EXCEPTION",
                format!("OperationError: {}", error.message),
                stack,
            ),
            TestErrorKind::Exception { name } => Self::new(
                LogSeverity::ThrewException,
                "EXCEPTION",
                format!("{}: {}", name, error.message),
                stack,
            ),
            TestErrorKind::Panic => Self::new(
                LogSeverity::ThrewException,
                "EXCEPTION",
                format!("panic: {}", error.message),
                None,
            ),
        }
    }
}

fn stack_line(location: &Location<'_>) -> String {
    format!("  at {}:{}:{}", location.file(), location.line(), location.column())
}

/// Collects logs and status for one case.
#[derive(Debug)]
pub struct TestCaseRecorder {
    query: String,
    debugging: bool,
    started: Option<Instant>,
    in_subcase: bool,
    subcase_status: LogSeverity,
    final_case_status: LogSeverity,
    nonskipped_subcases: usize,
    max_log_severity: LogSeverity,
    logs_at_current_severity: usize,
    logs: Vec<LogMessageWithStack>,
    seen: HashMap<String, usize>,
}

impl TestCaseRecorder {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            debugging: false,
            started: None,
            in_subcase: false,
            subcase_status: LogSeverity::NotRun,
            final_case_status: LogSeverity::NotRun,
            nonskipped_subcases: 0,
            max_log_severity: LogSeverity::NotRun,
            logs_at_current_severity: 0,
            logs: Vec::new(),
            seen: HashMap::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_debugging(&self) -> bool {
        self.debugging
    }

    /// Resets aggregate status and starts the clock.
    pub fn start(&mut self, debugging: bool) {
        self.debugging = debugging;
        self.started = Some(Instant::now());
        self.final_case_status = LogSeverity::NotRun;
        self.nonskipped_subcases = 0;
        debug!(query = %self.query, "case started");
    }

    pub fn begin_subcase(&mut self) {
        self.subcase_status = LogSeverity::NotRun;
        self.in_subcase = true;
        trace!(query = %self.query, "subcase begin");
    }

    /// Reconciles the subcase's outcome with what was expected of it.
    ///
    /// An expected failure that did fail counts as a pass. An expected
    /// failure that passed leaves a warning message but keeps the status.
    /// Returns the subcase's final severity.
    pub fn end_subcase(&mut self, expected: ExpectedStatus) -> LogSeverity {
        if expected == ExpectedStatus::Fail {
            if matches!(self.subcase_status, LogSeverity::Pass | LogSeverity::Warn) {
                self.append(LogEntry::from_error(&TestError::unexpected_pass()));
            } else if self.subcase_status > LogSeverity::Warn {
                self.subcase_status = LogSeverity::Pass;
            }
        }
        if self.subcase_status != LogSeverity::Skip {
            self.nonskipped_subcases += 1;
        }
        self.in_subcase = false;
        self.final_case_status = self.final_case_status.max(self.subcase_status);
        trace!(query = %self.query, status = ?self.subcase_status, "subcase end");
        self.subcase_status
    }

    /// Raises the current status to at least `Pass`.
    pub fn passed(&mut self) {
        self.raise(LogSeverity::Pass);
    }

    pub fn skipped(&mut self, error: &TestError) {
        self.log_entry(LogEntry::from_error(error));
    }

    #[track_caller]
    pub fn info(&mut self, message: impl Into<String>) {
        self.log_entry(LogEntry::here(LogSeverity::NotRun, "INFO", message));
    }

    /// Dropped unless the run is debugging.
    #[track_caller]
    pub fn debug(&mut self, message: impl Into<String>) {
        if self.debugging {
            self.log_entry(LogEntry::here(LogSeverity::NotRun, "DEBUG", message));
        }
    }

    #[track_caller]
    pub fn warn(&mut self, message: impl Into<String>) {
        self.log_entry(LogEntry::here(LogSeverity::Warn, "WARN", message));
    }

    pub fn expectation_failed(&mut self, error: &TestError) {
        self.log_entry(LogEntry::new(
            LogSeverity::ExpectFailed,
            "EXPECTATION FAILED",
            &error.message,
            Some(stack_line(error.location)),
        ));
    }

    pub fn validation_failed(&mut self, error: &TestError) {
        self.log_entry(LogEntry::new(
            LogSeverity::ValidationFailed,
            "VALIDATION FAILED",
            &error.message,
            Some(stack_line(error.location)),
        ));
    }

    /// Records any error at the severity its kind implies.
    pub fn threw(&mut self, error: &TestError) {
        self.log_entry(LogEntry::from_error(error));
    }

    /// Adds one entry, raising the current status to its severity.
    pub fn log_entry(&mut self, entry: LogEntry) {
        if entry.name == "DEBUG" && !self.debugging {
            return;
        }
        self.raise(entry.severity);
        self.append(entry);
    }

    /// Stores an entry without touching status.
    fn append(&mut self, entry: LogEntry) {
        let level = entry.severity;
        let mut message = LogMessageWithStack::new(entry.name, entry.message, entry.stack);
        if let Some(&index) = self.seen.get(&message.signature()) {
            self.logs[index].increment_times_seen();
            trace!(query = %self.query, times_seen = self.logs[index].times_seen(), "duplicate log message");
            return;
        }

        if level > self.max_log_severity {
            self.logs_at_current_severity = 0;
            self.max_log_severity = level;
            if !self.debugging {
                for log in &mut self.logs {
                    log.set_stack_hidden("below max severity");
                }
            }
        }
        if level < MIN_SEVERITY_FOR_STACK {
            message.set_stack_hidden("");
        } else if level == self.max_log_severity {
            if self.logs_at_current_severity >= MAX_LOG_STACKS {
                message.set_stack_hidden(&format!("only {} shown", MAX_LOG_STACKS));
            }
            self.logs_at_current_severity += 1;
        } else {
            message.set_stack_hidden("below max severity");
        }
        self.push(message);
    }

    fn push(&mut self, message: LogMessageWithStack) {
        self.seen.insert(message.signature(), self.logs.len());
        self.logs.push(message);
    }

    fn raise(&mut self, level: LogSeverity) {
        if self.in_subcase {
            self.subcase_status = self.subcase_status.max(level);
        } else {
            self.final_case_status = self.final_case_status.max(level);
        }
    }

    /// Consumes the recorder and produces the case result.
    pub fn finish(mut self) -> CaseResult {
        if self.final_case_status == LogSeverity::Skip && self.nonskipped_subcases != 0 {
            self.threw(&TestError::exception(
                "Error",
                "internal error: case is \"skip\" but has nonskipped subcases",
            ));
        }
        let time_ms = self
            .started
            .map(|t| t.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or(0.0);
        let status = self.final_case_status.status();
        debug!(query = %self.query, %status, time_ms, "case finished");
        CaseResult {
            query: self.query,
            status,
            time_ms,
            logs: self.logs,
        }
    }
}
