//! End-to-end runs of the check matrix against a fake `cargo`.

use crate::utils::Featcheck;
use predicates::prelude::*;

const STD_FS: &str = r#"
[[check]]
name = "native"
toolchains = ["stable"]
policy = "powerset"
features = ["std", "fs"]
mandatory = ["std"]
"#;

#[test]
fn all_checks_pass() {
    let mut featcheck = Featcheck::with_fake_cargo().with_config(STD_FS);

    featcheck
        .cmd
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "ok       cargo +stable check --no-default-features --examples --features=fs,std",
        ))
        .stdout(predicate::str::contains("4 checks: 4 passed, 0 failed, 0 cancelled, 0 skipped"));

    let mut invocations = featcheck.invocations();
    invocations.sort();
    assert_eq!(
        invocations,
        [
            "+stable check --no-default-features --examples --features=fs,std",
            "+stable check --no-default-features --examples --features=fs,std",
            "+stable check --no-default-features --examples --features=std",
            "+stable check --no-default-features --examples --features=std",
        ]
    );
}

/// A compile error in one combination fails the run with exit status 1, and the error names the
/// command and repeats what cargo wrote to stderr.
#[test]
fn compile_error_is_reported() {
    let mut featcheck = Featcheck::with_fake_cargo()
        .with_config(STD_FS)
        .fail_when("*--features=fs,std*", "error[E0432]: unresolved import");

    featcheck
        .cmd
        .assert()
        .code(1)
        .stdout(predicate::str::contains("4 checks: 2 passed, 2 failed, 0 cancelled, 0 skipped"))
        .stderr(predicate::str::contains("2 of 4 checks failed"))
        .stderr(predicate::str::contains(
            "`cargo +stable check --no-default-features --examples --features=fs,std` failed with \
             exit status 101",
        ))
        .stderr(predicate::str::contains("error[E0432]: unresolved import"));

    // Collect-all is the default, so the passing checks still ran
    assert_eq!(featcheck.invocations().len(), 4);
}

#[test]
fn fail_fast_stops_launching_checks() {
    let mut featcheck = Featcheck::with_fake_cargo()
        .with_config(STD_FS)
        .fail_when("*", "error: nope");

    featcheck
        .cmd
        .args(["--fail-fast", "-j", "1"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("skipped  cargo +stable"))
        .stderr(predicate::str::contains("1 of 4 checks failed"));

    assert_eq!(featcheck.invocations().len(), 1);
}

#[test]
fn cli_target_and_compile_mode_are_passed_through() {
    let mut featcheck = Featcheck::with_fake_cargo().with_config(
        r#"
        compile = "all"

        [[check]]
        toolchains = ["nightly"]
        policy = "permute-iterate"
        permutate = []
        iterate = ["json", "yaml"]
        "#,
    );

    featcheck
        .cmd
        .arg("wasm32-unknown-unknown")
        .assert()
        .success();

    let mut invocations = featcheck.invocations();
    invocations.sort();
    assert_eq!(
        invocations,
        [
            "+nightly check --no-default-features --all --target=wasm32-unknown-unknown --features=json",
            "+nightly check --no-default-features --all --target=wasm32-unknown-unknown --features=yaml",
        ]
    );
}

#[test]
fn dry_run_prints_commands_without_running_them() {
    let mut featcheck = Featcheck::with_fake_cargo()
        .with_config(STD_FS)
        .fail_when("*", "error: should not have run");

    featcheck
        .cmd
        .args(["--dry-run", "--no-toolchain-selector"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "cargo check --no-default-features --examples --features=std\n",
        ))
        .stdout(predicate::str::contains(
            "cargo check --no-default-features --examples --features=fs,std\n",
        ))
        .stdout(predicate::str::contains("+stable").not());

    assert!(featcheck.invocations().is_empty());
}

#[test]
fn missing_required_target_is_a_usage_error() {
    let mut featcheck = Featcheck::with_fake_cargo().with_config(
        r#"
        [[check]]
        name = "embedded"
        require_target = true
        policy = "powerset"
        features = ["alloc"]
        "#,
    );

    featcheck
        .cmd
        .assert()
        .code(2)
        .stderr(predicate::str::contains("embedded"))
        .stderr(predicate::str::contains("requires a target"));

    assert!(featcheck.invocations().is_empty());
}

#[test]
fn json_messages() {
    let mut featcheck = Featcheck::with_fake_cargo().with_config(STD_FS);

    let output = featcheck
        .cmd
        .args(["--message-format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let messages = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(messages[0]["type"], "plan");
    assert_eq!(messages[0]["data"]["event"], "ready");
    assert_eq!(messages[0]["data"]["checks"], 4);

    let passed = messages
        .iter()
        .filter(|m| m["type"] == "check" && m["data"]["event"] == "passed")
        .count();
    assert_eq!(passed, 4);

    let last = messages.last().unwrap();
    assert_eq!(last["data"]["event"], "summary");
    assert_eq!(last["data"]["failed"], 0);
}

/// With JSON output, every stdout line of a dry run is a JSON message.
#[test]
fn json_dry_run() {
    let mut featcheck = Featcheck::with_fake_cargo().with_config(STD_FS);

    let output = featcheck
        .cmd
        .args(["--dry-run", "--message-format", "json"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let messages = String::from_utf8(output.stdout)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .collect::<Vec<_>>();

    assert_eq!(messages.len(), 5);
    assert_eq!(messages[0]["data"]["event"], "ready");
    for message in &messages[1..] {
        assert_eq!(message["type"], "plan");
        assert_eq!(message["data"]["event"], "planned");
    }
    assert_eq!(
        messages[4]["data"]["command"],
        "cargo +stable check --no-default-features --examples --features=fs,std"
    );

    assert!(featcheck.invocations().is_empty());
}

#[test]
fn oversized_plan_is_refused() {
    let mut featcheck = Featcheck::with_fake_cargo().with_config(STD_FS);

    featcheck
        .cmd
        .env("FEATCHECK_MAX_CHECKS", "3")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("'native' brings the plan to 4 checks"))
        .stderr(predicate::str::contains("permute-iterate"));

    assert!(featcheck.invocations().is_empty());
}
