use conform::errors::ErrorKind;
use conform::params::{CaseEntry, ParamOption, ParamsSource};
use conform::{params, CaseParamsBuilder, ParamRecord};
use pretty_assertions::assert_eq;

fn cases(builder: &CaseParamsBuilder) -> Vec<ParamRecord> {
    builder.iter().collect::<Result<_, _>>().unwrap()
}

fn entries(source: &dyn ParamsSource) -> Vec<CaseEntry> {
    source.iterate_cases_with_subcases().collect::<Result<_, _>>().unwrap()
}

#[test]
fn combine_is_a_cross_product_in_order() {
    let u = CaseParamsBuilder::new().combine("x", [1, 2]).combine("y", ["a", "b"]);
    assert_eq!(
        cases(&u),
        vec![
            params! { "x" => 1, "y" => "a" },
            params! { "x" => 1, "y" => "b" },
            params! { "x" => 2, "y" => "a" },
            params! { "x" => 2, "y" => "b" },
        ]
    );
}

#[test]
fn default_builder_has_one_empty_case() {
    assert_eq!(cases(&CaseParamsBuilder::new()), vec![ParamRecord::new()]);
}

#[test]
fn rebinding_a_key_is_an_error() {
    let u = CaseParamsBuilder::new().combine("x", [1]).combine("x", [2]);
    let err = u.iter().find_map(Result::err).expect("duplicate key reported");
    assert!(matches!(err.kind, ErrorKind::DuplicateParamKey { ref key } if key == "x"));
}

#[test]
fn filter_and_unless_see_every_bound_key() {
    let u = CaseParamsBuilder::new()
        .combine("x", [1, 2, 3])
        .combine("y", [1, 2, 3])
        .filter(|p: &ParamRecord| p.get::<i64>("x") <= p.get::<i64>("y"))
        .unless(|p: &ParamRecord| p.get::<i64>("x") == Some(2));
    let pairs: Vec<(i64, i64)> = cases(&u)
        .iter()
        .map(|p| (p.get("x").unwrap(), p.get("y").unwrap()))
        .collect();
    assert_eq!(pairs, vec![(1, 1), (1, 2), (1, 3), (3, 3)]);
}

#[test]
fn expand_depends_on_earlier_keys() {
    let u = CaseParamsBuilder::new()
        .combine("n", [1, 3])
        .expand("i", |p: &ParamRecord| 0..p.get::<i64>("n").unwrap());
    assert_eq!(cases(&u).len(), 4);
}

#[test]
fn options_merge_their_extra_keys() {
    let u = CaseParamsBuilder::new().combine_options(
        "format",
        [
            ParamOption::new("r8").with("bytes", 1),
            ParamOption::new("rgba8").with("bytes", 4),
        ],
    );
    assert_eq!(
        cases(&u),
        vec![
            params! { "format" => "r8", "bytes" => 1 },
            params! { "format" => "rgba8", "bytes" => 4 },
        ]
    );
}

#[test]
fn builders_are_persistent_and_restartable() {
    let base = CaseParamsBuilder::new().combine("x", [1, 2]);
    let wider = base.combine("y", [true, false]);
    assert_eq!(cases(&base).len(), 2);
    assert_eq!(cases(&wider).len(), 4);
    assert_eq!(cases(&wider), cases(&wider));
}

#[test]
fn subcases_see_the_case_params() {
    let s = CaseParamsBuilder::new()
        .combine("width", [2, 3])
        .begin_subcases()
        .expand("lane", |p: &ParamRecord| 0..p.get::<i64>("width").unwrap());
    let entries = entries(&s);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].params, params! { "width" => 2 });
    assert_eq!(
        entries[1].subcases.as_deref(),
        Some(&[params! { "lane" => 0 }, params! { "lane" => 1 }, params! { "lane" => 2 }][..])
    );
}

#[test]
fn cases_without_subcases_are_dropped() {
    let s = CaseParamsBuilder::new()
        .combine("x", [1, 2])
        .begin_subcases()
        .combine("y", [1, 2])
        .filter(|p: &ParamRecord| p.get::<i64>("x") == Some(2));
    let entries = entries(&s);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].params, params! { "x" => 2 });
}

#[test]
fn subcase_keys_may_not_shadow_case_keys() {
    let s = CaseParamsBuilder::new()
        .combine("x", [1])
        .begin_subcases()
        .combine("x", [2]);
    assert!(s.iterate_cases_with_subcases().any(|e| e.is_err()));
}

#[test]
fn case_level_builder_has_no_subcases() {
    let u = CaseParamsBuilder::new().combine("x", [1]);
    assert_eq!(entries(&u)[0].subcases, None);
}
