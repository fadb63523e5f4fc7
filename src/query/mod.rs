//! Hierarchical test queries.
//!
//! A query addresses a point or a subtree of `suite:files:tests:params`.
//! Four levels exist; every level but [`QueryLevel::SingleCase`] ends in a
//! wildcard that covers everything below it:
//!
//! ```text
//! suite:a,b,*                 MultiFile   every file under a/b
//! suite:a,b:t,*               MultiTest   every test under t in a/b
//! suite:a,b:t:x=1;*           MultiCase   every case of t with x=1
//! suite:a,b:t:x=1;y="s"       SingleCase  exactly this case
//! ```

use crate::params::{ParamRecord, PARAM_SEPARATOR};
use std::fmt;

pub mod compare;
pub mod parser;

pub use compare::{compare_public_params_paths, compare_queries, Ordering};
pub use parser::parse_query;

pub const LEVEL_SEPARATOR: char = ':';
pub const PATH_SEPARATOR: char = ',';
pub const WILDCARD: &str = "*";

/// How deep a query reaches before its wildcard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QueryLevel {
    MultiFile = 1,
    MultiTest = 2,
    MultiCase = 3,
    SingleCase = 4,
}

/// An immutable, parsed query.
///
/// Only public params are stored; constructors drop private keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestQuery {
    suite: String,
    file_path: Vec<String>,
    test_path: Vec<String>,
    params: ParamRecord,
    level: QueryLevel,
}

impl TestQuery {
    /// `suite:f0,f1,*`
    pub fn multi_file(suite: impl Into<String>, file_path: Vec<String>) -> Self {
        Self {
            suite: suite.into(),
            file_path,
            test_path: Vec::new(),
            params: ParamRecord::new(),
            level: QueryLevel::MultiFile,
        }
    }

    /// `suite:f0,f1:t0,t1,*`. The file path must be non-empty.
    pub fn multi_test(suite: impl Into<String>, file_path: Vec<String>, test_path: Vec<String>) -> Self {
        debug_assert!(!file_path.is_empty());
        Self {
            suite: suite.into(),
            file_path,
            test_path,
            params: ParamRecord::new(),
            level: QueryLevel::MultiTest,
        }
    }

    /// `suite:f:t0,t1:x=1;*`. The test path must be non-empty.
    pub fn multi_case(
        suite: impl Into<String>,
        file_path: Vec<String>,
        test_path: Vec<String>,
        params: &ParamRecord,
    ) -> Self {
        debug_assert!(!file_path.is_empty() && !test_path.is_empty());
        Self {
            suite: suite.into(),
            file_path,
            test_path,
            params: params.public(),
            level: QueryLevel::MultiCase,
        }
    }

    /// `suite:f:t0,t1:x=1;y=2`
    pub fn single_case(
        suite: impl Into<String>,
        file_path: Vec<String>,
        test_path: Vec<String>,
        params: &ParamRecord,
    ) -> Self {
        Self {
            level: QueryLevel::SingleCase,
            ..Self::multi_case(suite, file_path, test_path, params)
        }
    }

    pub fn suite(&self) -> &str {
        &self.suite
    }

    pub fn file_path(&self) -> &[String] {
        &self.file_path
    }

    pub fn test_path(&self) -> &[String] {
        &self.test_path
    }

    pub fn params(&self) -> &ParamRecord {
        &self.params
    }

    pub fn level(&self) -> QueryLevel {
        self.level
    }

    pub fn is_multi_file(&self) -> bool {
        self.level == QueryLevel::MultiFile
    }

    pub fn is_multi_test(&self) -> bool {
        self.level == QueryLevel::MultiTest
    }

    pub fn is_multi_case(&self) -> bool {
        self.level == QueryLevel::MultiCase
    }

    /// Same query, one subcase deeper: `params` merged over this query's.
    pub fn with_subcase(&self, subcase: &ParamRecord) -> Result<Self, crate::errors::HarnessError> {
        let params = self.params.merge(subcase)?;
        Ok(Self::single_case(
            self.suite.clone(),
            self.file_path.clone(),
            self.test_path.clone(),
            &params,
        ))
    }

    /// `suite:f0,f1` with no trailing wildcard; used as a file identifier.
    pub fn file_id(&self) -> String {
        format!("{}{}{}", self.suite, LEVEL_SEPARATOR, self.file_path.join(","))
    }

    /// Test path joined by `,`.
    pub fn test_name(&self) -> String {
        self.test_path.join(",")
    }
}

/// Joins parts with `separator`, then appends the wildcard if the level is open.
fn write_level(
    f: &mut fmt::Formatter<'_>,
    parts: &[String],
    separator: char,
    wildcard: bool,
) -> fmt::Result {
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            write!(f, "{}", separator)?;
        }
        f.write_str(part)?;
    }
    if wildcard {
        if !parts.is_empty() {
            write!(f, "{}", separator)?;
        }
        f.write_str(WILDCARD)?;
    }
    Ok(())
}

impl fmt::Display for TestQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.suite, LEVEL_SEPARATOR)?;
        write_level(f, &self.file_path, PATH_SEPARATOR, self.is_multi_file())?;
        if self.level == QueryLevel::MultiFile {
            return Ok(());
        }
        write!(f, "{}", LEVEL_SEPARATOR)?;
        write_level(f, &self.test_path, PATH_SEPARATOR, self.is_multi_test())?;
        if self.level == QueryLevel::MultiTest {
            return Ok(());
        }
        write!(f, "{}", LEVEL_SEPARATOR)?;
        write_level(
            f,
            &self.params.public_parts(),
            PARAM_SEPARATOR,
            self.is_multi_case(),
        )
    }
}

impl std::str::FromStr for TestQuery {
    type Err = crate::errors::HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_query(s)
    }
}

impl serde::Serialize for TestQuery {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for TestQuery {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        parse_query(&text).map_err(serde::de::Error::custom)
    }
}
