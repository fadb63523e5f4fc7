//! Parameter values and their string encodings.
//!
//! Values render as JSON. Values JSON cannot express (undefined, NaN, the
//! infinities, negative zero) render as reserved magic strings, and string
//! values equal to one of those magic strings are rejected.

use crate::errors::HarnessError;
use std::collections::BTreeMap;
use std::fmt;

pub const UNDEFINED_MAGIC: &str = "_undef_";
pub const NAN_MAGIC: &str = "_nan_";
pub const POSITIVE_INFINITY_MAGIC: &str = "_posinf_";
pub const NEGATIVE_INFINITY_MAGIC: &str = "_neginf_";
pub const NEGATIVE_ZERO_MAGIC: &str = "_negzero_";

const MAGIC_VALUES: [&str; 5] = [
    UNDEFINED_MAGIC,
    NAN_MAGIC,
    POSITIVE_INFINITY_MAGIC,
    NEGATIVE_INFINITY_MAGIC,
    NEGATIVE_ZERO_MAGIC,
];

/// A single parameter value: scalar, array or object.
#[derive(Debug, Clone)]
pub enum ParamValue {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Array(Vec<ParamValue>),
    Object(BTreeMap<String, ParamValue>),
}

impl ParamValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Ints widen to floats; floats never narrow.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ParamValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    /// Rejects string values that collide with a reserved magic token.
    pub fn check_reserved(&self) -> Result<(), HarnessError> {
        match self {
            Self::Str(s) if MAGIC_VALUES.contains(&s.as_str()) => Err(
                HarnessError::invalid_param_value(s.clone(), "string collides with a reserved magic value"),
            ),
            Self::Array(items) => items.iter().try_for_each(ParamValue::check_reserved),
            Self::Object(map) => map.values().try_for_each(ParamValue::check_reserved),
            _ => Ok(()),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Self::Undefined => J::String(UNDEFINED_MAGIC.into()),
            Self::Null => J::Null,
            Self::Bool(b) => J::Bool(*b),
            Self::Int(i) => J::from(*i),
            Self::Float(x) if x.is_nan() => J::String(NAN_MAGIC.into()),
            Self::Float(x) if *x == f64::INFINITY => J::String(POSITIVE_INFINITY_MAGIC.into()),
            Self::Float(x) if *x == f64::NEG_INFINITY => J::String(NEGATIVE_INFINITY_MAGIC.into()),
            Self::Float(x) if *x == 0.0 && x.is_sign_negative() => {
                J::String(NEGATIVE_ZERO_MAGIC.into())
            }
            Self::Float(x) => serde_json::Number::from_f64(*x).map_or(J::Null, J::Number),
            Self::Str(s) => J::String(s.clone()),
            Self::Array(items) => J::Array(items.iter().map(ParamValue::to_json).collect()),
            Self::Object(map) => J::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value as J;
        match value {
            J::Null => Self::Null,
            J::Bool(b) => Self::Bool(b),
            J::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            J::String(s) => match s.as_str() {
                UNDEFINED_MAGIC => Self::Undefined,
                NAN_MAGIC => Self::Float(f64::NAN),
                POSITIVE_INFINITY_MAGIC => Self::Float(f64::INFINITY),
                NEGATIVE_INFINITY_MAGIC => Self::Float(f64::NEG_INFINITY),
                NEGATIVE_ZERO_MAGIC => Self::Float(-0.0),
                _ => Self::Str(s),
            },
            J::Array(items) => Self::Array(items.into_iter().map(Self::from_json).collect()),
            J::Object(map) => {
                Self::Object(map.into_iter().map(|(k, v)| (k, Self::from_json(v))).collect())
            }
        }
    }

    /// Encoding used in query strings. Inverse of [`parse_param_value`].
    pub fn stringify(&self) -> String {
        self.to_json().to_string()
    }

    /// Type-tagged encoding used for duplicate-case detection: `0`, `0.0`
    /// and `"0"` never collide, and object keys are always sorted.
    pub fn stringify_uniquely(&self) -> String {
        let mut out = String::new();
        self.write_unique(&mut out);
        out
    }

    fn write_unique(&self, out: &mut String) {
        use std::fmt::Write;
        match self {
            Self::Undefined => out.push('u'),
            Self::Null => out.push('n'),
            Self::Bool(b) => {
                let _ = write!(out, "b:{}", b);
            }
            Self::Int(i) => {
                let _ = write!(out, "i:{}", i);
            }
            Self::Float(x) => {
                let _ = write!(out, "f:{:?}", x);
            }
            Self::Str(s) => {
                let _ = write!(out, "s:{}", serde_json::Value::String(s.clone()));
            }
            Self::Array(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.write_unique(out);
                }
                out.push(']');
            }
            Self::Object(map) => {
                out.push('{');
                for (i, (k, v)) in map.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    let _ = write!(out, "{}:", serde_json::Value::String(k.clone()));
                    v.write_unique(out);
                }
                out.push('}');
            }
        }
    }
}

/// Parses the query-string encoding of a param value.
pub fn parse_param_value(text: &str) -> Result<ParamValue, HarnessError> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(ParamValue::from_json)
        .map_err(|e| HarnessError::invalid_param_value(text, e.to_string()))
}

/// Structural equality that treats NaN as equal to NaN and distinguishes
/// `0.0` from `-0.0`. Ints and floats are distinct types.
impl PartialEq for ParamValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Undefined, Self::Undefined) | (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => {
                a.to_bits() == b.to_bits() || (a.is_nan() && b.is_nan())
            }
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ParamValue {}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify())
    }
}

// ============================================================================
// CONVERSIONS
// ============================================================================

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(impl From<$t> for ParamValue {
            fn from(v: $t) -> Self {
                ParamValue::Int(v as i64)
            }
        })*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32, usize);

impl From<f32> for ParamValue {
    fn from(v: f32) -> Self {
        ParamValue::Float(v as f64)
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        ParamValue::Float(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        ParamValue::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        ParamValue::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        ParamValue::Str(v)
    }
}

impl<T: Into<ParamValue>> From<Vec<T>> for ParamValue {
    fn from(v: Vec<T>) -> Self {
        ParamValue::Array(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<ParamValue>> From<Option<T>> for ParamValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(ParamValue::Undefined, Into::into)
    }
}

/// Typed extraction from a [`ParamValue`], used by `ParamRecord::get`.
pub trait FromParam: Sized {
    fn from_param(value: &ParamValue) -> Option<Self>;
}

macro_rules! impl_from_param_int {
    ($($t:ty),*) => {
        $(impl FromParam for $t {
            fn from_param(value: &ParamValue) -> Option<Self> {
                value.as_i64().and_then(|i| <$t>::try_from(i).ok())
            }
        })*
    };
}

impl_from_param_int!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl FromParam for f64 {
    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_f64()
    }
}

impl FromParam for f32 {
    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_f64().map(|x| x as f32)
    }
}

impl FromParam for bool {
    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_bool()
    }
}

impl FromParam for String {
    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl FromParam for ParamValue {
    fn from_param(value: &ParamValue) -> Option<Self> {
        Some(value.clone())
    }
}

impl<T: FromParam> FromParam for Vec<T> {
    fn from_param(value: &ParamValue) -> Option<Self> {
        value.as_array()?.iter().map(T::from_param).collect()
    }
}

impl<T: FromParam> FromParam for Option<T> {
    fn from_param(value: &ParamValue) -> Option<Self> {
        if value.is_undefined() {
            Some(None)
        } else {
            T::from_param(value).map(Some)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_floats_use_magic_strings() {
        assert_eq!(ParamValue::Float(f64::NAN).stringify(), "\"_nan_\"");
        assert_eq!(ParamValue::Float(-0.0).stringify(), "\"_negzero_\"");
        assert_eq!(ParamValue::Undefined.stringify(), "\"_undef_\"");
        assert_eq!(
            parse_param_value("\"_neginf_\"").unwrap(),
            ParamValue::Float(f64::NEG_INFINITY)
        );
    }

    #[test]
    fn ints_and_floats_keep_their_type() {
        assert_eq!(ParamValue::Float(1.0).stringify(), "1.0");
        assert_eq!(parse_param_value("1.0").unwrap(), ParamValue::Float(1.0));
        assert_eq!(parse_param_value("1").unwrap(), ParamValue::Int(1));
        assert_ne!(ParamValue::Int(1), ParamValue::Float(1.0));
    }

    #[test]
    fn unique_encoding_separates_number_and_string() {
        let zero = ParamValue::Int(0).stringify_uniquely();
        let text = ParamValue::from("0").stringify_uniquely();
        assert_ne!(zero, text);
    }

    #[test]
    fn magic_strings_are_reserved() {
        assert!(ParamValue::from("_nan_").check_reserved().is_err());
        assert!(ParamValue::from(vec!["ok", "_undef_"]).check_reserved().is_err());
        assert!(ParamValue::from("nan").check_reserved().is_ok());
    }
}
