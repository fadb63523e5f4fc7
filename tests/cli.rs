// End-to-end runs of the `conform` binary against the built-in demo suite.

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use std::fs;

fn conform() -> Command {
    let mut cmd = Command::cargo_bin("conform").unwrap();
    cmd.arg("--no-color");
    cmd
}

#[test]
fn passing_file_exits_successfully() {
    conform()
        .args(["run", "demo:basic,*"])
        .assert()
        .success()
        .stdout(contains("Test summary: total").and(contains("failed 0")));
}

#[test]
fn failures_are_reported_and_fail_the_run() {
    conform()
        .args(["run", "demo:failures,*"])
        .assert()
        .code(1)
        .stdout(
            contains("FAIL: demo:failures:mismatch:")
                .and(contains("Array had unexpected contents at indices 2 through 2."))
                .and(contains("VALIDATION FAILED: binding 0 is out of range"))
                .and(contains("EXCEPTION: panic: index out of bounds"))
                .and(contains("Failed cases:")),
        );
}

#[test]
fn verbose_runs_list_passing_cases() {
    conform()
        .args(["-v", "run", "demo:basic:arithmetic,add:a=1;*"])
        .assert()
        .success()
        .stdout(contains("PASS: demo:basic:arithmetic,add:a=1;b=10").and(contains("total 2")));
}

#[test]
fn json_output_is_one_object_per_case() {
    let output = conform()
        .args(["run", "--json", "demo:basic:arithmetic,div:*"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    let results: Vec<serde_json::Value> = stdout
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(results.len(), 6);
    assert!(results.iter().all(|r| r["status"] == "pass"));
    assert_eq!(results[0]["query"], "demo:basic:arithmetic,div:num=-7;den=2");
}

#[test]
fn expectations_turn_failures_into_passes() {
    let path = std::env::temp_dir().join(format!("conform-cli-{}.yaml", std::process::id()));
    fs::write(
        &path,
        "- query: \"demo:failures:mismatch:*\"\n  expectation: fail\n- query: \"demo:failures:validation:*\"\n  expectation: fail\n",
    )
    .unwrap();

    conform()
        .args(["run", "demo:failures:mismatch,*", "demo:failures:validation,*"])
        .arg("--expectations")
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("failed 0"));

    let _ = fs::remove_file(&path);
}

#[test]
fn list_shows_tests_and_descriptions() {
    conform()
        .args(["list", "demo:basic,*"])
        .assert()
        .success()
        .stdout(
            contains("demo:basic:arithmetic,add:*")
                .and(contains("Addition commutes"))
                .and(contains("demo:basic:todo,wide_types:* [unimplemented]")),
        );
}

#[test]
fn list_unimplemented_filters() {
    conform()
        .args(["list-unimplemented"])
        .assert()
        .success()
        .stdout(contains("todo,wide_types").and(contains("arithmetic,add").not()));
}

#[test]
fn malformed_queries_render_diagnostics() {
    conform()
        .args(["run", "demo:basic"])
        .assert()
        .code(2)
        .stderr(contains("conform::query::malformed"));
}
