//! Containment ordering between queries.

use super::TestQuery;
use crate::params::{is_private_key, ParamRecord};

/// How two queries relate, read as "a is ... of b".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ordering {
    Equal,
    /// `a` covers strictly less than `b`.
    StrictSubset,
    /// `a` covers strictly more than `b`.
    StrictSuperset,
    Unordered,
}

impl Ordering {
    /// The ordering seen from the other side.
    pub fn reverse(self) -> Self {
        match self {
            Self::StrictSubset => Self::StrictSuperset,
            Self::StrictSuperset => Self::StrictSubset,
            other => other,
        }
    }
}

/// Compares two queries level by level.
///
/// The first level where the queries differ, or where either query ends in
/// a wildcard, decides the result.
pub fn compare_queries(a: &TestQuery, b: &TestQuery) -> Ordering {
    if a.suite() != b.suite() {
        return Ordering::Unordered;
    }

    let file_order = compare_paths(a.file_path(), b.file_path());
    if file_order != Ordering::Equal || a.is_multi_file() || b.is_multi_file() {
        return compare_one_level(file_order, a.is_multi_file(), b.is_multi_file());
    }

    let test_order = compare_paths(a.test_path(), b.test_path());
    if test_order != Ordering::Equal || a.is_multi_test() || b.is_multi_test() {
        return compare_one_level(test_order, a.is_multi_test(), b.is_multi_test());
    }

    let params_order = compare_public_params_paths(a.params(), b.params());
    if params_order == Ordering::Equal && !a.is_multi_case() && !b.is_multi_case() {
        return Ordering::Equal;
    }
    compare_one_level(params_order, a.is_multi_case(), b.is_multi_case())
}

/// Applies one level's wildcards to the ordering of that level's contents.
fn compare_one_level(ordering: Ordering, a_is_big: bool, b_is_big: bool) -> Ordering {
    match (ordering, a_is_big, b_is_big) {
        (Ordering::Unordered, _, _) => Ordering::Unordered,
        (ordering, true, true) => ordering,
        (_, false, false) => Ordering::Unordered,
        (ordering, true, false) if ordering != Ordering::StrictSubset => Ordering::StrictSuperset,
        (ordering, false, true) if ordering != Ordering::StrictSuperset => Ordering::StrictSubset,
        _ => Ordering::Unordered,
    }
}

/// Prefix comparison: a shorter path covers every path it prefixes.
fn compare_paths(a: &[String], b: &[String]) -> Ordering {
    if a.iter().zip(b).any(|(x, y)| x != y) {
        return Ordering::Unordered;
    }
    match a.len().cmp(&b.len()) {
        std::cmp::Ordering::Equal => Ordering::Equal,
        std::cmp::Ordering::Less => Ordering::StrictSuperset,
        std::cmp::Ordering::Greater => Ordering::StrictSubset,
    }
}

/// Compares the public entries of two param records as constraint sets:
/// fewer constraints cover more cases.
pub fn compare_public_params_paths(a: &ParamRecord, b: &ParamRecord) -> Ordering {
    let mut a_remaining = 0;
    for (key, value) in a.iter().filter(|(k, _)| !is_private_key(k)) {
        match b.value(key) {
            Some(other) if other != value => return Ordering::Unordered,
            Some(_) => {}
            None => a_remaining += 1,
        }
    }
    let b_remaining = b
        .keys()
        .filter(|k| !is_private_key(k) && !a.contains_key(k))
        .count();

    match (a_remaining, b_remaining) {
        (0, 0) => Ordering::Equal,
        (0, _) => Ordering::StrictSuperset,
        (_, 0) => Ordering::StrictSubset,
        _ => Ordering::Unordered,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params;
    use crate::query::parse_query;

    fn cmp(a: &str, b: &str) -> Ordering {
        let a = parse_query(a).unwrap();
        let b = parse_query(b).unwrap();
        compare_queries(&a, &b)
    }

    #[test]
    fn suite_mismatch_is_unordered() {
        assert_eq!(cmp("s:*", "t:*"), Ordering::Unordered);
    }

    #[test]
    fn file_level() {
        assert_eq!(cmp("s:*", "s:*"), Ordering::Equal);
        assert_eq!(cmp("s:*", "s:a,*"), Ordering::StrictSuperset);
        assert_eq!(cmp("s:a,*", "s:a,b:t,*"), Ordering::StrictSuperset);
        assert_eq!(cmp("s:a:t,*", "s:a,*"), Ordering::StrictSubset);
        assert_eq!(cmp("s:a,*", "s:b,*"), Ordering::Unordered);
        assert_eq!(cmp("s:a,b,*", "s:a:t,*"), Ordering::Unordered);
    }

    #[test]
    fn test_level() {
        assert_eq!(cmp("s:a:*", "s:a:t:x=1"), Ordering::StrictSuperset);
        assert_eq!(cmp("s:a:t,*", "s:a:t:x=1;*"), Ordering::StrictSuperset);
        assert_eq!(cmp("s:a:t:*", "s:a:t,u,*"), Ordering::Unordered);
        assert_eq!(cmp("s:a:t:x=1", "s:a:u:x=1"), Ordering::Unordered);
    }

    #[test]
    fn case_level() {
        assert_eq!(cmp("s:a:t:*", "s:a:t:x=1;y=2"), Ordering::StrictSuperset);
        assert_eq!(cmp("s:a:t:x=1;*", "s:a:t:y=2;x=1"), Ordering::StrictSuperset);
        assert_eq!(cmp("s:a:t:x=1;*", "s:a:t:x=2"), Ordering::Unordered);
        assert_eq!(cmp("s:a:t:x=1;y=2", "s:a:t:y=2;x=1"), Ordering::Equal);
        assert_eq!(cmp("s:a:t:x=1", "s:a:t:x=1"), Ordering::Equal);
        assert_eq!(cmp("s:a:t:", "s:a:t:"), Ordering::Equal);
        assert_eq!(cmp("s:a:t:x=1", "s:a:t:x=1;y=2"), Ordering::Unordered);
        assert_eq!(cmp("s:a:t:x=1;*", "s:a:t:y=2;*"), Ordering::Unordered);
    }

    #[test]
    fn private_params_do_not_participate() {
        let a = params! { "x" => 1, "_p" => 1 };
        let b = params! { "x" => 1, "_p" => 2 };
        assert_eq!(compare_public_params_paths(&a, &b), Ordering::Equal);
    }
}
