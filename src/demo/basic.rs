use crate::check::{check_elements_between, check_elements_equal_generated};
use crate::errors::{HarnessError, TestError};
use crate::fixture::BasicFixture;
use crate::group::TestGroup;
use crate::params;
use crate::params::ParamRecord;

pub(super) fn group() -> Result<TestGroup<BasicFixture>, HarnessError> {
    let mut g = TestGroup::<BasicFixture>::new();

    g.test("arithmetic,add")?
        .desc("Addition commutes for small integers.")
        .params(|u| u.combine("a", [1, 2, 3]).combine("b", [10, 20]))?
        .body_sync(|t| {
            let a: i64 = t.param("a")?;
            let b: i64 = t.param("b")?;
            t.expect(a + b == b + a, format!("{} + {} should commute", a, b));
            Ok(())
        })?;

    g.test("arithmetic,div")?
        .desc("Integer division rounds toward zero.")
        .params(|u| {
            u.combine("num", [-7, 7, 20])
                .combine("den", [0, 2, 3])
                .unless(|p: &ParamRecord| p.get::<i64>("den") == Some(0))
        })?
        .body_sync(|t| {
            let num: i64 = t.param("num")?;
            let den: i64 = t.param("den")?;
            let q = num / den;
            t.expect(
                q.abs() * den.abs() <= num.abs(),
                format!("{} / {} = {} overshoots", num, den, q),
            );
            Ok(())
        })?;

    g.test("shifts")?
        .desc("Shifting left then right restores every bit that fits.")
        .params(|u| {
            u.combine("width", [8, 16, 32])
                .begin_subcases()
                .expand("shift", |p: &ParamRecord| 0..p.get::<i64>("width").unwrap_or(0))
                .filter(|p: &ParamRecord| p.get::<i64>("shift").map_or(false, |s| s % 3 == 0))
        })?
        .body_sync(|t| {
            let width: u32 = t.param("width")?;
            let shift: u32 = t.param("shift")?;
            let mask = if width == 32 { u32::MAX } else { (1u32 << width) - 1 };
            let value = mask >> shift;
            t.expect(
                (value << shift) >> shift == value,
                format!("round trip through a shift of {} in {} bits", shift, width),
            );
            Ok(())
        })?;

    g.test("check,ramp")?
        .desc("A generated ramp matches its closed form.")
        .params_simple([params! { "len" => 4 }, params! { "len" => 33, "_step" => 3 }])?
        .body_sync(|t| {
            let len: usize = t.param("len")?;
            let step = t.params().get::<u32>("_step").unwrap_or(1);
            let ramp: Vec<u32> = (0..len as u32).map(|i| i * step).collect();
            let result = check_elements_equal_generated(&ramp, |i| i as u32 * step);
            t.expect_ok(result);
            Ok(())
        })?;

    g.test("check,float_bounds")?
        .desc("Halving stays between zero and the input.")
        .body_sync(|t| {
            let input = [1.0f32, 2.5, 1e-3, 1e6];
            let halves: Vec<f32> = input.iter().map(|x| x / 2.0).collect();
            let result = check_elements_between(&halves, |_| 0.0, |i| input[i]);
            t.expect_ok(result);
            Ok(())
        })?;

    g.test("eventual")?
        .desc("Checks deferred with `eventually` run before finalize.")
        .params(|u| u.combine("n", [1, 8]))?
        .body(|t| {
            Box::pin(async move {
                let n: usize = t.param("n")?;
                let values: Vec<usize> = (0..n).collect();
                t.debug(format!("queued {} values", values.len()));
                t.eventually(async move {
                    if values.iter().sum::<usize>() == n * (n - 1) / 2 {
                        Ok(())
                    } else {
                        Err(TestError::expectation("sum does not match"))
                    }
                });
                Ok(())
            })
        })?;

    g.test("todo,wide_types")?
        .desc("128-bit arithmetic.")
        .unimplemented()?;

    Ok(g)
}
