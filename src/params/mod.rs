//! Test parameters: records of named values, the public/private split, and
//! the builders that expand declarative parameter specs into cases.
//!
//! Keys starting with `_` are private: they reach the test body but never
//! appear in queries, stringification or comparison.

use crate::errors::{ErrorKind, HarnessError};
use indexmap::IndexMap;
use std::fmt;

pub mod builder;
pub mod value;

pub use builder::{CaseEntry, CaseParamsBuilder, ParamOption, ParamsSource, SubcaseParamsBuilder};
pub use value::{parse_param_value, FromParam, ParamValue};

/// Separator between `key=value` pairs in the query encoding.
pub const PARAM_SEPARATOR: char = ';';
/// Separator between a key and its value.
pub const PARAM_KV_SEPARATOR: char = '=';

pub fn is_private_key(key: &str) -> bool {
    key.starts_with('_')
}

/// An insertion-ordered record of named parameter values.
///
/// Equality ignores insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParamRecord(IndexMap<String, ParamValue>);

impl ParamRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn value(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    /// Typed lookup; `None` if the key is missing or has another type.
    pub fn get<T: FromParam>(&self, key: &str) -> Option<T> {
        self.0.get(key).and_then(T::from_param)
    }

    /// Builder-style insert for literal records.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Inserts a new key; fails if the key is already bound.
    pub fn insert_new(
        &mut self,
        key: impl Into<String>,
        value: ParamValue,
    ) -> Result<(), HarnessError> {
        let key = key.into();
        if self.0.contains_key(&key) {
            return Err(HarnessError::new(ErrorKind::DuplicateParamKey { key }));
        }
        self.0.insert(key, value);
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Only the public entries, in insertion order.
    pub fn public(&self) -> ParamRecord {
        ParamRecord(
            self.0
                .iter()
                .filter(|(k, _)| !is_private_key(k))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// `self ⊕ other`. A key present in both must carry equal values.
    pub fn merge(&self, other: &ParamRecord) -> Result<ParamRecord, HarnessError> {
        let mut merged = self.clone();
        for (key, value) in &other.0 {
            match merged.0.get(key) {
                Some(existing) if existing != value => {
                    return Err(HarnessError::new(ErrorKind::ConflictingParam {
                        key: key.clone(),
                        left: existing.stringify(),
                        right: value.stringify(),
                    }))
                }
                Some(_) => {}
                None => {
                    merged.0.insert(key.clone(), value.clone());
                }
            }
        }
        Ok(merged)
    }

    /// `key=value` strings for each public entry.
    pub fn public_parts(&self) -> Vec<String> {
        self.0
            .iter()
            .filter(|(k, _)| !is_private_key(k))
            .map(|(k, v)| format!("{}{}{}", k, PARAM_KV_SEPARATOR, v.stringify()))
            .collect()
    }

    /// Query encoding of the public entries: `x=1;y="a"`.
    pub fn stringify_public(&self) -> String {
        self.public_parts().join(&PARAM_SEPARATOR.to_string())
    }

    /// Order-independent, type-tagged encoding of the public entries.
    pub fn stringify_public_uniquely(&self) -> String {
        let mut keys: Vec<&String> = self.0.keys().filter(|k| !is_private_key(k)).collect();
        keys.sort();
        keys.iter()
            .map(|k| format!("{}={}", k, self.0[k.as_str()].stringify_uniquely()))
            .collect::<Vec<_>>()
            .join(";")
    }

    pub fn check_reserved(&self) -> Result<(), HarnessError> {
        self.0.values().try_for_each(ParamValue::check_reserved)
    }
}

impl fmt::Display for ParamRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.stringify_public())
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, V)> for ParamRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        ParamRecord(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Literal [`ParamRecord`]: `params! { "x" => 1, "y" => "a" }`.
#[macro_export]
macro_rules! params {
    () => { $crate::params::ParamRecord::new() };
    ($($key:expr => $value:expr),+ $(,)?) => {
        $crate::params::ParamRecord::new()$(.with($key, $value))+
    };
}
