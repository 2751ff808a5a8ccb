//! Very basic smoke tests that just confirm that the `featcheck` binary is able to run and do
//! basic operations
use crate::utils::Featcheck;

/// Basic test, that `featcheck` runs at all, and that `--help` at least looks vaguely right.
#[test]
fn test_help_output() {
    let mut featcheck = Featcheck::find();

    featcheck
        .cmd
        .arg("--help")
        .assert()
        .success()
        .stdout(predicates::str::contains("featcheck"))
        .stdout(predicates::str::contains("--failure-policy"))
        .stderr(predicates::str::is_empty());
}

/// Sanity-check the version output.
///
/// Expects an output something like the following, where the git sha and date are missing if
/// the crate was built outside of a git checkout:
///
/// ```text
/// featcheck 0.1.0 (40d26c9 2025-10-26)
/// ````
#[test]
fn test_version_output() {
    let mut featcheck = Featcheck::find();

    featcheck
        .cmd
        .arg("--version")
        .assert()
        .success()
        .stdout(predicates::str::is_empty())
        .stderr(
            predicates::str::is_match(r"^featcheck \d+\.\d+\.\d+( \([0-9a-f]{7,40} \d{4}-\d{2}-\d{2}\))?\n$")
                .unwrap(),
        );
}

#[test]
fn test_invalid_arguments_are_rejected() {
    let mut featcheck = Featcheck::find();

    featcheck
        .cmd
        .args(["--compile", "benches"])
        .assert()
        .failure()
        .stderr(predicates::str::contains("benches"));
}
