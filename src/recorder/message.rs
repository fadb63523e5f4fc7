//! Recorded log messages.

use serde::{Serialize, Serializer};
use std::fmt;

/// One logged failure or note, with the site it came from.
///
/// Identical messages (same name, message and stack) are stored once; the
/// recorder bumps [`times_seen`](Self::times_seen) instead.
#[derive(Debug, Clone, PartialEq)]
pub struct LogMessageWithStack {
    name: String,
    message: String,
    stack: Option<String>,
    times_seen: u32,
    /// `Some("")` hides the stack silently; `Some(reason)` prints the reason instead.
    stack_hidden: Option<String>,
}

impl LogMessageWithStack {
    pub fn new(name: impl Into<String>, message: impl Into<String>, stack: Option<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into().trim().to_string(),
            stack,
            times_seen: 1,
            stack_hidden: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    pub fn times_seen(&self) -> u32 {
        self.times_seen
    }

    pub fn is_stack_hidden(&self) -> bool {
        self.stack_hidden.is_some()
    }

    /// Dedup key: name, trimmed message and stack.
    pub fn signature(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.name,
            self.message,
            self.stack.as_deref().unwrap_or("")
        )
    }

    pub(crate) fn increment_times_seen(&mut self) {
        self.times_seen += 1;
    }

    /// The first reason given wins.
    pub(crate) fn set_stack_hidden(&mut self, reason: &str) {
        if self.stack_hidden.is_none() {
            self.stack_hidden = Some(reason.to_string());
        }
    }
}

impl fmt::Display for LogMessageWithStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        match (&self.stack_hidden, &self.stack) {
            (None, Some(stack)) => write!(f, "\n{}", stack)?,
            (Some(reason), Some(_)) if !reason.is_empty() => {
                write!(f, "\n  at (elided: {})", reason)?
            }
            _ => {}
        }
        if self.times_seen > 1 {
            write!(f, "\n(seen {} times with identical stack)", self.times_seen)?;
        }
        Ok(())
    }
}

impl Serialize for LogMessageWithStack {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
