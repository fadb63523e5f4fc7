use conform::{compare_queries, parse_query, Ordering, ParamRecord, ParamValue, QueryLevel, TestQuery};
use proptest::prelude::*;

fn part() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,4}"
}

fn value() -> impl Strategy<Value = ParamValue> {
    prop_oneof![
        (-1000i64..1000).prop_map(ParamValue::from),
        any::<bool>().prop_map(ParamValue::from),
        "[a-z ;:,]{0,5}".prop_map(ParamValue::from),
    ]
}

fn record() -> impl Strategy<Value = ParamRecord> {
    prop::collection::btree_map("[a-z]{1,3}", value(), 0..4)
        .prop_map(|m| m.into_iter().collect::<ParamRecord>())
}

fn query() -> impl Strategy<Value = TestQuery> {
    let suite = "[a-z]{1,6}";
    let files = prop::collection::vec(part(), 1..3);
    let tests = prop::collection::vec(part(), 1..3);
    (suite, files, tests, record(), 0u8..4).prop_map(|(suite, files, tests, params, level)| match level {
        0 => TestQuery::multi_file(suite, files),
        1 => TestQuery::multi_test(suite, files, tests),
        2 => TestQuery::multi_case(suite, files, tests, &params),
        _ => TestQuery::single_case(suite, files, tests, &params),
    })
}

/// Queries over a tiny alphabet, so that random pairs are often related.
fn related_query() -> impl Strategy<Value = TestQuery> {
    let files = prop::collection::vec("[ab]", 1..3);
    let tests = prop::collection::vec("[ab]", 1..3);
    let params = prop::collection::btree_map("[xy]", 0i64..2, 0..3)
        .prop_map(|m| m.into_iter().collect::<ParamRecord>());
    (files, tests, params, 0u8..4).prop_map(|(files, tests, params, level)| match level {
        0 => TestQuery::multi_file("s", files),
        1 => TestQuery::multi_test("s", files, tests),
        2 => TestQuery::multi_case("s", files, tests, &params),
        _ => TestQuery::single_case("s", files, tests, &params),
    })
}

proptest! {
    #[test]
    fn display_then_parse_is_identity(q in query()) {
        let text = q.to_string();
        let parsed = parse_query(&text).expect("displayed query parses");
        prop_assert_eq!(&parsed, &q);
        prop_assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn compare_is_antisymmetric(a in related_query(), b in related_query()) {
        prop_assert_eq!(compare_queries(&a, &b), compare_queries(&b, &a).reverse());
    }

    #[test]
    fn every_query_equals_itself(q in query()) {
        prop_assert_eq!(compare_queries(&q, &q), Ordering::Equal);
    }

    #[test]
    fn single_cases_equal_their_reparsed_selves(
        files in prop::collection::vec(part(), 1..3),
        tests in prop::collection::vec(part(), 1..3),
        params in record(),
    ) {
        let q = TestQuery::single_case("s", files, tests, &params);
        prop_assert_eq!(q.level(), QueryLevel::SingleCase);
        let reparsed = parse_query(&q.to_string()).expect("displayed query parses");
        prop_assert_eq!(compare_queries(&q, &reparsed), Ordering::Equal);
        prop_assert_eq!(compare_queries(&reparsed, &q), Ordering::Equal);
    }
}

#[test]
fn wider_levels_contain_narrower_ones() {
    let file = parse_query("s:a,*").unwrap();
    let test = parse_query("s:a:t,*").unwrap();
    let case = parse_query("s:a:t:x=1;*").unwrap();
    let single = parse_query("s:a:t:x=1;y=2").unwrap();
    assert_eq!(compare_queries(&file, &test), Ordering::StrictSuperset);
    assert_eq!(compare_queries(&test, &case), Ordering::StrictSuperset);
    assert_eq!(compare_queries(&case, &single), Ordering::StrictSuperset);
    assert_eq!(compare_queries(&single, &file), Ordering::StrictSubset);
}

#[test]
fn identical_single_cases_are_equal() {
    for text in ["s:a:t:", "s:a:t:x=1", "s:a,b:t,u:x=1;y=\"z\""] {
        let q = parse_query(text).unwrap();
        assert_eq!(compare_queries(&q, &q), Ordering::Equal, "{text}");
    }
}

#[test]
fn siblings_are_unordered() {
    let a = parse_query("s:a:t:x=1;*").unwrap();
    let b = parse_query("s:a:t:x=2;*").unwrap();
    assert_eq!(compare_queries(&a, &b), Ordering::Unordered);
    let c = parse_query("s:a,b,*").unwrap();
    let d = parse_query("s:a,c:t,*").unwrap();
    assert_eq!(compare_queries(&c, &d), Ordering::Unordered);
}
