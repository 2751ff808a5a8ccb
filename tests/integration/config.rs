//! Integration tests for config file handling
//!
//! These tests verify that featcheck loads and honors configuration from featcheck.toml files,
//! including the config hierarchy (user < ancestors < cwd < env < CLI).

use crate::utils::Featcheck;
use assert_fs::prelude::*;
use predicates::prelude::*;

/// Check groups from the user config dir are used when the project has no config of its own.
#[test]
fn user_config_groups() {
    let mut featcheck = Featcheck::with_fake_cargo();

    featcheck
        .test_fs()
        .user_config
        .child("featcheck.toml")
        .write_str(
            r#"
[[check]]
toolchains = ["beta"]
policy = "powerset"
features = ["serde"]
"#,
        )
        .unwrap();

    featcheck
        .cmd
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "cargo +beta check --no-default-features --examples\n",
        ))
        .stdout(predicate::str::contains(
            "cargo +beta check --no-default-features --examples --features=serde\n",
        ));
}

/// Scalar settings in the cwd config override the user config, and env vars override both.
#[test]
fn cwd_config_and_env_override_user_config() {
    let mut featcheck = Featcheck::with_fake_cargo().with_config(
        r#"
compile = "all"

[[check]]
policy = "powerset"
features = ["serde"]
"#,
    );

    featcheck
        .test_fs()
        .user_config
        .child("featcheck.toml")
        .write_str("compile = \"examples\"\ntoolchain_selector = true\n")
        .unwrap();

    featcheck
        .cmd
        .env("FEATCHECK_TOOLCHAIN_SELECTOR", "false")
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "cargo check --no-default-features --all --features=serde\n",
        ));
}

/// `--config-file` reads only the named file.
#[test]
fn explicit_config_file() {
    let mut featcheck = Featcheck::with_fake_cargo().with_config(
        r#"
[[check]]
policy = "powerset"
features = ["ignored"]
"#,
    );

    featcheck
        .test_fs()
        .cwd
        .child("ci.toml")
        .write_str(
            r#"
[[check]]
policy = "powerset"
features = ["chosen"]
"#,
        )
        .unwrap();

    // `--config-file` conflicts with `--user-config-dir`, which the test harness sets, so start
    // from a bare command
    let cwd = featcheck.test_fs().cwd.path().to_path_buf();
    let mut cmd = assert_cmd::Command::cargo_bin("featcheck").unwrap();
    cmd.current_dir(&cwd)
        .env("FEATCHECK_CARGO", featcheck.test_fs().bin.child("cargo").path())
        .env_remove("FEATCHECK_USER_CONFIG_DIR")
        .args(["--config-file", "ci.toml", "--dry-run"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--features=chosen"))
        .stdout(predicate::str::contains("ignored").not());
}

#[test]
fn invalid_config_is_a_usage_error() {
    let mut featcheck = Featcheck::with_fake_cargo().with_config(
        r#"
[[check]]
name = "broken"
policy = "powerset"
features = ["std", "std"]
"#,
    );

    featcheck
        .cmd
        .assert()
        .code(2)
        .stderr(predicate::str::contains("broken"))
        .stderr(predicate::str::contains("'std'"));

    assert!(featcheck.invocations().is_empty());
}

#[test]
fn zero_jobs_from_env_is_rejected() {
    let mut featcheck = Featcheck::with_fake_cargo().with_config(
        r#"
[[check]]
policy = "powerset"
features = ["std"]
"#,
    );

    featcheck
        .cmd
        .env("FEATCHECK_JOBS", "0")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("jobs must be greater than zero"));
}
