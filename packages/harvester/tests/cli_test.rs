//! Command-line surface tests that need no network.

use assert_cmd::Command;
use predicates::prelude::*;

#[allow(deprecated)]
fn harvester() -> Command {
    Command::cargo_bin("ethics-harvester").unwrap()
}

#[test]
fn test_classify_prints_platform_tag() {
    harvester()
        .args([
            "classify",
            "https://library.municode.com/ut/provo/codes/code_of_ordinances",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("municode\n"));
}

#[test]
fn test_classify_unknown_url() {
    harvester()
        .args(["classify", "https://example.org/code"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unknown"));
}

#[test]
fn test_run_rejects_invalid_state() {
    harvester()
        .args(["run", "--state", "Utah"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid state code"));
}

#[test]
fn test_run_requires_state() {
    harvester().arg("run").assert().failure();
}
