//! Element-wise content checks for numeric buffers.
//!
//! Every check returns `Ok(())` or a [`CheckError`] whose message includes a
//! table of the failing region, one element of context on each side:
//!
//! ```text
//! Array had unexpected contents at indices 2 through 2.
//!  Starting at index 1:
//!     at index   :        1        2
//!       actual 0x: 00000002 00000004
//!    failed ->                     X
//!  expected ==     00000002 00000003
//! ```

use crate::errors::TestError;
use std::fmt;
use thiserror::Error;

pub mod table;

pub use table::{generate_pretty_table, Row, TableOptions};

/// A failed content check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CheckError {
    #[error("size mismatch: actual has {actual} elements, expected {expected}")]
    SizeMismatch { actual: usize, expected: usize },
    #[error("{message}")]
    Contents {
        first: usize,
        last: usize,
        message: String,
    },
}

impl CheckError {
    /// Index of the first failing element, if the sizes matched.
    pub fn first_failure(&self) -> Option<usize> {
        match self {
            Self::Contents { first, .. } => Some(*first),
            Self::SizeMismatch { .. } => None,
        }
    }
}

impl From<CheckError> for TestError {
    #[track_caller]
    fn from(error: CheckError) -> Self {
        TestError::expectation(error.to_string())
    }
}

/// A buffer element that can be compared and printed.
pub trait Element: Copy + PartialEq + PartialOrd + fmt::Debug {
    /// Floats print with significant digits; integers print as hex.
    const IS_FLOAT: bool;

    fn to_cell(self) -> String;
}

macro_rules! impl_int_element {
    ($($t:ty),*) => {
        $(impl Element for $t {
            const IS_FLOAT: bool = false;

            fn to_cell(self) -> String {
                int_to_padded_hex(self as i128, std::mem::size_of::<$t>())
            }
        })*
    };
}

impl_int_element!(i8, i16, i32, i64, u8, u16, u32, u64);

impl Element for f32 {
    const IS_FLOAT: bool = true;

    fn to_cell(self) -> String {
        to_precision(self as f64, 8)
    }
}

impl Element for f64 {
    const IS_FLOAT: bool = true;

    fn to_cell(self) -> String {
        to_precision(self, 8)
    }
}

/// Hex digits zero-padded to two per byte; negative numbers get a leading `-`.
pub fn int_to_padded_hex(value: i128, byte_len: usize) -> String {
    let digits = format!("{:0width$x}", value.unsigned_abs(), width = byte_len * 2);
    if value < 0 {
        format!("-{}", digits)
    } else {
        digits
    }
}

/// `value` with `precision` significant digits, switching to exponent form
/// for very large or very small magnitudes.
pub fn to_precision(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "NaN".into();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.into();
    }
    let precision = precision.max(1);
    if value == 0.0 {
        return format!("{:.*}", precision - 1, 0.0);
    }

    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = match scientific.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return scientific,
    };
    if exponent < -6 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{}", mantissa, sign, exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        format!("{:.*}", decimals, value)
    }
}

/// An extra table row: a header and a cell for each printed index.
pub struct PredicatePrinter<'a> {
    pub left_header: String,
    pub value_for_cell: Box<dyn Fn(usize) -> String + 'a>,
}

impl<'a> PredicatePrinter<'a> {
    pub fn new(left_header: impl Into<String>, value_for_cell: impl Fn(usize) -> String + 'a) -> Self {
        Self {
            left_header: left_header.into(),
            value_for_cell: Box::new(value_for_cell),
        }
    }
}

/// Checks `actual == expected`, element by element.
pub fn check_elements_equal<T: Element>(actual: &[T], expected: &[T]) -> Result<(), CheckError> {
    if actual.len() != expected.len() {
        return Err(CheckError::SizeMismatch {
            actual: actual.len(),
            expected: expected.len(),
        });
    }
    check_elements_pass_predicate(
        actual,
        |i, value| value == expected[i],
        &[PredicatePrinter::new("expected ==", |i| expected[i].to_cell())],
    )
}

/// Checks `actual[i] == generate(i)` for every index.
pub fn check_elements_equal_generated<T: Element>(
    actual: &[T],
    generate: impl Fn(usize) -> T,
) -> Result<(), CheckError> {
    check_elements_pass_predicate(
        actual,
        |i, value| value == generate(i),
        &[PredicatePrinter::new("expected ==", |i| generate(i).to_cell())],
    )
}

/// Checks that every element lies between two per-index bounds, inclusive.
/// The bounds may come in either order.
pub fn check_elements_between<T: Element>(
    actual: &[T],
    bound_a: impl Fn(usize) -> T,
    bound_b: impl Fn(usize) -> T,
) -> Result<(), CheckError> {
    check_elements_pass_predicate(
        actual,
        |i, value| {
            let (a, b) = (bound_a(i), bound_b(i));
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            value >= lo && value <= hi
        },
        &[
            PredicatePrinter::new("between", |i| bound_a(i).to_cell()),
            PredicatePrinter::new("and", |i| bound_b(i).to_cell()),
        ],
    )
}

/// Generic element-wise check with the default table options.
pub fn check_elements_pass_predicate<T: Element>(
    actual: &[T],
    predicate: impl Fn(usize, T) -> bool,
    printers: &[PredicatePrinter<'_>],
) -> Result<(), CheckError> {
    check_elements_pass_predicate_with(&TableOptions::default(), actual, predicate, printers)
}

/// Generic element-wise check. On failure, the message shows the range from
/// the first to the last failing index, padded by one element on each side.
pub fn check_elements_pass_predicate_with<T: Element>(
    options: &TableOptions,
    actual: &[T],
    predicate: impl Fn(usize, T) -> bool,
    printers: &[PredicatePrinter<'_>],
) -> Result<(), CheckError> {
    let failed: Vec<bool> = actual
        .iter()
        .enumerate()
        .map(|(i, &value)| !predicate(i, value))
        .collect();
    let first = match failed.iter().position(|&f| f) {
        Some(first) => first,
        None => return Ok(()),
    };
    let last = failed.iter().rposition(|&f| f).unwrap_or(first);

    let start = first.saturating_sub(1);
    let end = actual.len().min(last + 2);
    let indices = start..end;

    let mut rows: Vec<Row<'_>> = vec![
        row("at index", ":", indices.clone().map(|i| i.to_string())),
        row(
            "actual",
            if T::IS_FLOAT { "=" } else { "0x:" },
            indices.clone().map(|i| actual[i].to_cell()),
        ),
        row(
            "failed ->",
            "",
            indices.clone().map(|i| if failed[i] { "X".to_string() } else { String::new() }),
        ),
    ];
    for printer in printers {
        rows.push(row(
            &printer.left_header,
            "",
            indices.clone().map(move |i| (printer.value_for_cell)(i)),
        ));
    }

    let message = format!(
        "Array had unexpected contents at indices {} through {}.\n Starting at index {}:\n{}",
        first,
        last,
        start,
        generate_pretty_table(options, rows)
    );
    Err(CheckError::Contents {
        first,
        last,
        message,
    })
}

fn row<'a>(header: &str, separator: &str, cells: impl Iterator<Item = String> + 'a) -> Row<'a> {
    Box::new([header.to_string(), separator.to_string()].into_iter().chain(cells))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_padded_to_element_size() {
        assert_eq!(3u8.to_cell(), "03");
        assert_eq!(255u16.to_cell(), "00ff");
        assert_eq!((-1i32).to_cell(), "-00000001");
    }

    #[test]
    fn floats_use_eight_significant_digits() {
        assert_eq!(1.5f64.to_cell(), "1.5000000");
        assert_eq!(123.456f64.to_cell(), "123.45600");
        assert_eq!(0.0f32.to_cell(), "0.0000000");
        assert_eq!(1e21f64.to_cell(), "1.0000000e+21");
        assert_eq!(1.5e-7f64.to_cell(), "1.5000000e-7");
        assert_eq!(f32::NAN.to_cell(), "NaN");
    }

    #[test]
    fn between_accepts_either_bound_order() {
        let actual = [1i32, 5, 9];
        assert!(check_elements_between(&actual, |_| 10, |_| 0).is_ok());
        let err = check_elements_between(&actual, |_| 0, |_| 8).unwrap_err();
        assert_eq!(err.first_failure(), Some(2));
    }

    #[test]
    fn generated_expectations() {
        let actual: Vec<u32> = (0..8).collect();
        assert!(check_elements_equal_generated(&actual, |i| i as u32).is_ok());
        assert!(check_elements_equal_generated(&actual, |i| (i as u32) * 2).is_err());
    }
}
