//! Conform Error Handling
//!
//! Two error families live here:
//!
//! - [`HarnessError`]: authoring, parsing and validation failures. These are
//!   surfaced immediately (at registration, validation or query-parse time)
//!   and rendered with miette.
//! - [`TestError`]: signals raised while a subcase runs (skip, failed
//!   expectation, backend operation failure, panic). The recorder is the sink
//!   for every one of these; they never propagate past a single case.

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};
use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use thiserror::Error;

// ============================================================================
// HARNESS ERRORS - authoring bugs and malformed input
// ============================================================================

/// The single harness error type: what went wrong, where, and how to help.
#[derive(Debug, Clone)]
pub struct HarnessError {
    pub kind: ErrorKind,
    pub source_info: Option<SourceInfo>,
    pub diagnostic_info: DiagnosticInfo,
}

/// All harness failure kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Query errors
    MalformedQuery {
        reason: String,
    },

    // Parameter errors
    InvalidParamValue {
        value: String,
        reason: String,
    },
    DuplicateParamKey {
        key: String,
    },
    ConflictingParam {
        key: String,
        left: String,
        right: String,
    },

    // Registration errors
    InvalidTestName {
        name: String,
        reason: String,
    },
    DuplicateTestName {
        name: String,
    },
    DuplicateCase {
        test: String,
        params: String,
    },
    BodyAlreadyAttached {
        test: String,
    },
    AlreadyParameterized {
        test: String,
    },
    MissingBody {
        test: String,
    },

    // Input errors
    Expectations {
        origin: String,
        reason: String,
    },
    Io {
        path: String,
        reason: String,
    },
}

/// Source text and span for errors tied to a piece of input (query strings).
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
}

/// Diagnostic enhancement data
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

impl ErrorKind {
    /// Phase the error belongs to; used as the middle segment of the diagnostic code.
    pub const fn phase(&self) -> &'static str {
        match self {
            Self::MalformedQuery { .. } => "query",
            Self::InvalidParamValue { .. }
            | Self::DuplicateParamKey { .. }
            | Self::ConflictingParam { .. } => "params",
            Self::InvalidTestName { .. }
            | Self::DuplicateTestName { .. }
            | Self::DuplicateCase { .. }
            | Self::BodyAlreadyAttached { .. }
            | Self::AlreadyParameterized { .. }
            | Self::MissingBody { .. } => "registration",
            Self::Expectations { .. } => "expectations",
            Self::Io { .. } => "io",
        }
    }

    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::MalformedQuery { .. } => "malformed",
            Self::InvalidParamValue { .. } => "invalid_value",
            Self::DuplicateParamKey { .. } => "duplicate_key",
            Self::ConflictingParam { .. } => "conflicting_value",
            Self::InvalidTestName { .. } => "invalid_name",
            Self::DuplicateTestName { .. } => "duplicate_name",
            Self::DuplicateCase { .. } => "duplicate_case",
            Self::BodyAlreadyAttached { .. } => "body_already_attached",
            Self::AlreadyParameterized { .. } => "already_parameterized",
            Self::MissingBody { .. } => "missing_body",
            Self::Expectations { .. } => "invalid",
            Self::Io { .. } => "failed",
        }
    }

    fn default_help(&self) -> Option<String> {
        match self {
            Self::MalformedQuery { .. } => Some(
                "queries look like `suite:a,b,*`, `suite:a,b:test,*`, `suite:a,b:test:*` or `suite:a,b:test:x=1;y=\"s\"`"
                    .into(),
            ),
            Self::DuplicateParamKey { key } => Some(format!(
                "`{key}` is already bound by an earlier stage; rename one of them"
            )),
            Self::DuplicateCase { .. } => Some(
                "two expanded cases stringify to the same public params; add a distinguishing param or filter one out"
                    .into(),
            ),
            Self::BodyAlreadyAttached { .. } => {
                Some("attach exactly one of .body(), .body_sync() or .unimplemented()".into())
            }
            Self::MissingBody { .. } => {
                Some("every test needs .body(), .body_sync() or .unimplemented()".into())
            }
            _ => None,
        }
    }
}

impl HarnessError {
    pub fn new(kind: ErrorKind) -> Self {
        let error_code = format!("conform::{}::{}", kind.phase(), kind.code_suffix());
        let help = kind.default_help();
        Self {
            kind,
            source_info: None,
            diagnostic_info: DiagnosticInfo { help, error_code },
        }
    }

    /// Attach the input text and the span the error points at.
    pub fn with_source(
        mut self,
        name: impl AsRef<str>,
        text: impl Into<String>,
        span: impl Into<SourceSpan>,
    ) -> Self {
        self.source_info = Some(SourceInfo {
            source: Arc::new(NamedSource::new(name, text.into())),
            primary_span: span.into(),
        });
        self
    }

    pub fn malformed_query(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedQuery {
            reason: reason.into(),
        })
    }

    pub fn invalid_param_value(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidParamValue {
            value: value.into(),
            reason: reason.into(),
        })
    }

    pub fn invalid_test_name(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidTestName {
            name: name.into(),
            reason: reason.into(),
        })
    }

    fn primary_label(&self) -> &'static str {
        match &self.kind {
            ErrorKind::MalformedQuery { .. } => "here",
            ErrorKind::InvalidParamValue { .. } => "invalid value",
            _ => "",
        }
    }
}

impl std::error::Error for HarnessError {}

impl fmt::Display for HarnessError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::MalformedQuery { reason } => write!(f, "Malformed query: {}", reason),
            ErrorKind::InvalidParamValue { value, reason } => {
                write!(f, "Invalid param value '{}': {}", value, reason)
            }
            ErrorKind::DuplicateParamKey { key } => write!(f, "Duplicate key: {}", key),
            ErrorKind::ConflictingParam { key, left, right } => write!(
                f,
                "Conflicting values for param '{}': {} vs {}",
                key, left, right
            ),
            ErrorKind::InvalidTestName { name, reason } => {
                write!(f, "Invalid test name '{}': {}", name, reason)
            }
            ErrorKind::DuplicateTestName { name } => write!(f, "Duplicate test name: {}", name),
            ErrorKind::DuplicateCase { test, params } => write!(
                f,
                "Duplicate public test case params for test {}: {}",
                test, params
            ),
            ErrorKind::BodyAlreadyAttached { test } => {
                write!(f, "Test body already attached: {}", test)
            }
            ErrorKind::AlreadyParameterized { test } => {
                write!(f, "Test is already parameterized: {}", test)
            }
            ErrorKind::MissingBody { test } => write!(f, "Test is missing a body: {}", test),
            ErrorKind::Expectations { origin, reason } => {
                write!(f, "Invalid expectations in {}: {}", origin, reason)
            }
            ErrorKind::Io { path, reason } => write!(f, "I/O error on '{}': {}", path, reason),
        }
    }
}

impl Diagnostic for HarnessError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let info = self.source_info.as_ref()?;
        let label = self.primary_label();
        let label = (!label.is_empty()).then(|| label.to_string());
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            label,
            info.primary_span,
        ))))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        self.source_info
            .as_ref()
            .map(|info| &*info.source as &dyn miette::SourceCode)
    }
}

/// Prints a HarnessError with full miette diagnostics.
pub fn print_error(error: HarnessError) {
    let report = miette::Report::new(error);
    eprintln!("{report:?}");
}

// ============================================================================
// TEST ERRORS - signals raised while a subcase runs
// ============================================================================

/// What kind of signal a [`TestError`] carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TestErrorKind {
    /// Advisory: abort the rest of this subcase without failing it.
    Skip,
    /// A test-level expectation did not hold.
    Expectation,
    /// The backend reported a validation error.
    Validation,
    /// A backend operation failed.
    Operation,
    /// Any other error, tagged with its type name.
    Exception { name: String },
    /// A hook or body panicked.
    Panic,
    /// A subcase expected to fail completed cleanly.
    UnexpectedPass,
}

/// A failure signal raised by a fixture hook or test body.
///
/// The location is the call site that created the error; `?` conversions
/// record the site of the `?`.
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TestError {
    pub kind: TestErrorKind,
    pub message: String,
    pub location: &'static Location<'static>,
}

impl TestError {
    #[track_caller]
    pub fn new(kind: TestErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: Location::caller(),
        }
    }

    #[track_caller]
    pub fn skip(message: impl Into<String>) -> Self {
        Self::new(TestErrorKind::Skip, message)
    }

    #[track_caller]
    pub fn expectation(message: impl Into<String>) -> Self {
        Self::new(TestErrorKind::Expectation, message)
    }

    #[track_caller]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(TestErrorKind::Validation, message)
    }

    #[track_caller]
    pub fn operation(message: impl Into<String>) -> Self {
        Self::new(TestErrorKind::Operation, message)
    }

    #[track_caller]
    pub fn exception(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(TestErrorKind::Exception { name: name.into() }, message)
    }

    #[track_caller]
    pub fn panic(message: impl Into<String>) -> Self {
        Self::new(TestErrorKind::Panic, message)
    }

    #[track_caller]
    pub fn unexpected_pass() -> Self {
        Self::new(TestErrorKind::UnexpectedPass, "Testcase passed unexpectedly.")
    }

    /// Wrap an arbitrary error, naming it after its type.
    #[track_caller]
    pub fn from_error<E: std::error::Error>(error: E) -> Self {
        let full = std::any::type_name::<E>();
        let name = full.rsplit("::").next().unwrap_or(full);
        Self::exception(name, error.to_string())
    }

    pub fn is_skip(&self) -> bool {
        self.kind == TestErrorKind::Skip
    }

    /// Same error, message prefixed.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.message = format!("{}{}", prefix, self.message);
        self
    }
}

impl From<HarnessError> for TestError {
    #[track_caller]
    fn from(error: HarnessError) -> Self {
        Self::exception("HarnessError", error.to_string())
    }
}

impl From<std::io::Error> for TestError {
    #[track_caller]
    fn from(error: std::io::Error) -> Self {
        Self::operation(error.to_string())
    }
}

pub type TestResult<T = ()> = Result<T, TestError>;
