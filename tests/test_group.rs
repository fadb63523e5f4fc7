use conform::errors::ErrorKind;
use conform::group::{RunnableTest, TestGroupSource};
use conform::{params, BasicFixture, HarnessError, ParamRecord, TestGroup};

fn kind(result: Result<impl Sized, HarnessError>) -> ErrorKind {
    match result {
        Ok(_) => panic!("expected an error"),
        Err(e) => e.kind,
    }
}

#[test]
fn duplicate_test_names_are_rejected() {
    let mut g = TestGroup::<BasicFixture>::new();
    g.test("a,b").unwrap().body_sync(|_| Ok(())).unwrap();
    assert!(matches!(kind(g.test("a,b")), ErrorKind::DuplicateTestName { .. }));
}

#[test]
fn names_must_be_plain_parts() {
    let mut g = TestGroup::<BasicFixture>::new();
    for bad in ["a-b", "a,,b", "", "a b", "x%41"] {
        assert!(
            matches!(kind(g.test(bad)), ErrorKind::InvalidTestName { .. }),
            "{bad:?} should be rejected"
        );
    }
    assert_eq!(g.len(), 0);
}

#[test]
fn body_attaches_once() {
    let mut g = TestGroup::<BasicFixture>::new();
    let t = g.test("t").unwrap();
    t.body_sync(|_| Ok(())).unwrap();
    assert!(matches!(kind(t.body_sync(|_| Ok(()))), ErrorKind::BodyAlreadyAttached { .. }));
    assert!(matches!(kind(t.unimplemented()), ErrorKind::BodyAlreadyAttached { .. }));
}

#[test]
fn params_attach_once() {
    let mut g = TestGroup::<BasicFixture>::new();
    let t = g.test("t").unwrap();
    t.params(|u| u.combine("x", [1])).unwrap();
    assert!(matches!(kind(t.params_simple([ParamRecord::new()])), ErrorKind::AlreadyParameterized { .. }));
}

#[test]
fn missing_body_fails_validation() {
    let mut g = TestGroup::<BasicFixture>::new();
    g.test("t").unwrap().desc("no body");
    assert!(matches!(kind(g.validate()), ErrorKind::MissingBody { .. }));
}

#[test]
fn duplicate_public_params_fail_validation() {
    let mut g = TestGroup::<BasicFixture>::new();
    g.test("t")
        .unwrap()
        .params_simple([params! { "x" => 1, "_a" => 1 }, params! { "x" => 1, "_a" => 2 }])
        .unwrap()
        .body_sync(|_| Ok(()))
        .unwrap();
    assert!(matches!(kind(g.validate()), ErrorKind::DuplicateCase { .. }));
}

#[test]
fn case_and_subcase_combinations_must_be_unique() {
    let mut g = TestGroup::<BasicFixture>::new();
    g.test("t")
        .unwrap()
        .params(|u| {
            u.combine("x", [1, 2])
                .begin_subcases()
                .combine_with_params([params! { "y" => 1 }, params! { "y" => 1, "_z" => 0 }])
        })
        .unwrap()
        .body_sync(|_| Ok(()))
        .unwrap();
    assert!(matches!(kind(g.validate()), ErrorKind::DuplicateCase { .. }));
}

#[test]
fn a_well_formed_group_validates() {
    let mut g = TestGroup::<BasicFixture>::new();
    g.test("a")
        .unwrap()
        .params(|u| u.combine("x", [1, 2]).begin_subcases().combine("y", [1, 2]))
        .unwrap()
        .body_sync(|_| Ok(()))
        .unwrap();
    g.test("b").unwrap().unimplemented().unwrap();
    assert!(g.validate().is_ok());
    assert_eq!(g.tests().count(), 2);
    assert!(g.tests().nth(1).unwrap().is_unimplemented());
}
