use crate::check::check_elements_equal;
use crate::errors::{HarnessError, TestError};
use crate::fixture::BasicFixture;
use crate::group::TestGroup;
use crate::params::ParamRecord;

pub(super) fn group() -> Result<TestGroup<BasicFixture>, HarnessError> {
    let mut g = TestGroup::<BasicFixture>::new();

    g.test("mismatch")?
        .desc("A content check that reports a table of differences.")
        .body_sync(|t| {
            let result = check_elements_equal(&[1u32, 2, 3], &[1, 2, 4]);
            t.expect_ok(result);
            Ok(())
        })?;

    g.test("validation")?
        .desc("A backend validation error.")
        .body_sync(|_| Err(TestError::validation("binding 0 is out of range")))?;

    g.test("unsupported")?
        .desc("Skips where the feature is missing.")
        .params(|u| u.combine("format", ["r8", "bc7"]))?
        .body_sync(|t| {
            let format: String = t.param("format")?;
            t.skip_if(format == "bc7", "compressed formats are not supported")?;
            Ok(())
        })?;

    g.test("partial")?
        .desc("One subcase of three fails.")
        .params_subcases_only(|s| s.combine("lane", [0, 1, 2]))?
        .body_sync(|t| {
            let lane: i64 = t.param("lane")?;
            t.expect(lane != 1, "lane 1 is broken");
            Ok(())
        })?;

    g.test("panics")?
        .desc("A body that panics is reported, not propagated.")
        .params_simple([ParamRecord::new()])?
        .body_sync(|_| panic!("index out of bounds"))?;

    Ok(g)
}
