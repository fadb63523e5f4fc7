//! Query parsing.
//!
//! pest handles the level structure; this module turns the parse tree into a
//! [`TestQuery`] and enforces the per-level rules, reporting each violation
//! with a span into the query text.

use super::{TestQuery, WILDCARD};
use crate::errors::HarnessError;
use crate::params::{is_private_key, parse_param_value, ParamRecord};
use once_cell::sync::Lazy;
use pest::{error::Error, iterators::Pair, Parser};
use pest_derive::Parser;
use regex::Regex;

#[derive(Parser)]
#[grammar = "query/grammar.pest"]
struct QueryParser;

static VALID_PART: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").unwrap());

/// True if `part` is a legal suite name, path part or param key.
pub fn is_valid_part(part: &str) -> bool {
    VALID_PART.is_match(part)
}

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parses a query string.
pub fn parse_query(text: &str) -> Result<TestQuery, HarnessError> {
    let mut pairs = QueryParser::parse(Rule::query, text).map_err(|e| convert_parse_error(e, text))?;
    let query = match pairs.next() {
        Some(query) => query,
        None => return Err(error(text, (0, text.len()), "empty query")),
    };
    QueryBuilder { text }.build(query)
}

// ============================================================================
// TREE WALK
// ============================================================================

/// One level split into parts, with the wildcard (if any) removed.
struct Level {
    parts: Vec<String>,
    wildcard: bool,
    span: (usize, usize),
}

struct QueryBuilder<'t> {
    text: &'t str,
}

impl<'t> QueryBuilder<'t> {
    fn build(&self, query: Pair<'t, Rule>) -> Result<TestQuery, HarnessError> {
        let mut suite = None;
        let mut files = None;
        let mut tests = None;
        let mut params = None;
        for pair in query.into_inner() {
            match pair.as_rule() {
                Rule::suite => suite = Some(pair),
                Rule::files => files = Some(self.path_level(pair)?),
                Rule::tests => tests = Some(self.path_level(pair)?),
                Rule::params => params = Some(pair),
                _ => {}
            }
        }

        let suite = match suite {
            Some(pair) => self.checked_part(&pair, "suite")?,
            None => return Err(error(self.text, (0, 0), "missing suite")),
        };
        let files = match files {
            Some(files) => files,
            None => return Err(error(self.text, (0, self.text.len()), "missing file path")),
        };

        let tests = match tests {
            None => {
                if !files.wildcard {
                    return Err(error(
                        self.text,
                        files.span,
                        "file-level query must end in a wildcard",
                    ));
                }
                return Ok(TestQuery::multi_file(suite, files.parts));
            }
            Some(tests) => tests,
        };
        self.closed(&files, "file path")?;

        let params = match params {
            None => {
                if !tests.wildcard {
                    return Err(error(
                        self.text,
                        tests.span,
                        "test-level query must end in a wildcard",
                    ));
                }
                return Ok(TestQuery::multi_test(suite, files.parts, tests.parts));
            }
            Some(params) => params,
        };
        self.closed(&tests, "test path")?;

        let (record, wildcard) = self.params(params)?;
        Ok(if wildcard {
            TestQuery::multi_case(suite, files.parts, tests.parts, &record)
        } else {
            TestQuery::single_case(suite, files.parts, tests.parts, &record)
        })
    }

    /// A level followed by a deeper level: no wildcard, at least one part.
    fn closed(&self, level: &Level, what: &str) -> Result<(), HarnessError> {
        if level.wildcard {
            return Err(error(
                self.text,
                level.span,
                format!("wildcard in {} must be in the last level of the query", what),
            ));
        }
        if level.parts.is_empty() {
            return Err(error(self.text, level.span, format!("{} must not be empty", what)));
        }
        Ok(())
    }

    fn path_level(&self, pair: Pair<'t, Rule>) -> Result<Level, HarnessError> {
        let span = span_of(&pair);
        let items: Vec<Pair<'t, Rule>> = pair.into_inner().collect();
        let count = items.len();
        let mut parts = Vec::with_capacity(count);
        let mut wildcard = false;
        for (i, item) in items.into_iter().enumerate() {
            if item.as_str() == WILDCARD {
                if i + 1 != count {
                    return Err(error(self.text, span_of(&item), "wildcard must be the last part"));
                }
                wildcard = true;
            } else {
                parts.push(self.checked_part(&item, "path part")?);
            }
        }
        Ok(Level { parts, wildcard, span })
    }

    fn checked_part(&self, pair: &Pair<'t, Rule>, what: &str) -> Result<String, HarnessError> {
        let part = pair.as_str();
        if part.is_empty() {
            return Err(error(self.text, span_of(pair), format!("{} must not be empty", what)));
        }
        if !is_valid_part(part) {
            return Err(error(
                self.text,
                span_of(pair),
                format!("{} '{}' may only contain [a-zA-Z0-9_]", what, part),
            ));
        }
        Ok(part.to_string())
    }

    fn params(&self, pair: Pair<'t, Rule>) -> Result<(ParamRecord, bool), HarnessError> {
        let mut record = ParamRecord::new();
        if pair.as_str().is_empty() {
            return Ok((record, false));
        }

        let items: Vec<Pair<'t, Rule>> = pair.into_inner().collect();
        let count = items.len();
        let mut wildcard = false;
        for (i, item) in items.into_iter().enumerate() {
            let item_span = span_of(&item);
            let mut inner = item.into_inner();
            let key = match inner.next() {
                Some(key) => key,
                None => return Err(error(self.text, item_span, "empty param")),
            };
            let value = inner.next();

            if key.as_str() == WILDCARD && value.is_none() {
                if i + 1 != count {
                    return Err(error(self.text, item_span, "wildcard must be the last param"));
                }
                wildcard = true;
                continue;
            }

            let name = self.checked_part(&key, "param key")?;
            if is_private_key(&name) {
                return Err(error(
                    self.text,
                    span_of(&key),
                    format!("private param '{}' may not appear in a query", name),
                ));
            }
            let value = match value {
                Some(value) => value,
                None => {
                    return Err(error(
                        self.text,
                        item_span,
                        format!("param '{}' needs a value", name),
                    ))
                }
            };
            let parsed = parse_param_value(value.as_str())
                .map_err(|e| e.with_source("query", self.text, span_of(&value)))?;
            record
                .insert_new(name, parsed)
                .map_err(|e| e.with_source("query", self.text, span_of(&key)))?;
        }
        Ok((record, wildcard))
    }
}

// ============================================================================
// ERRORS
// ============================================================================

/// `(offset, len)` of a pair, the shape miette wants.
fn span_of(pair: &Pair<Rule>) -> (usize, usize) {
    let span = pair.as_span();
    (span.start(), span.end() - span.start())
}

fn error(text: &str, span: (usize, usize), reason: impl Into<String>) -> HarnessError {
    HarnessError::malformed_query(reason).with_source("query", text, span)
}

fn convert_parse_error(e: Error<Rule>, text: &str) -> HarnessError {
    let span = match e.location {
        pest::error::InputLocation::Pos(pos) => (pos, 0),
        pest::error::InputLocation::Span((start, end)) => (start, end - start),
    };
    let reason = if text.contains(':') {
        "unexpected input"
    } else {
        "a query needs at least `suite:*`"
    };
    error(text, span, reason)
}
