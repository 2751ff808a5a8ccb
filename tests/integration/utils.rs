//! Utility functions to help run our CLI as part of a test
use assert_cmd::Command;
use assert_fs::{TempDir, prelude::*};

/// Stand-in for `cargo` used by tests that actually run checks.
///
/// Every invocation is appended to `invocations.log` next to the script.  If the arguments match
/// the pattern in `FAKE_CARGO_FAIL_PATTERN` (a shell `case` glob), it prints
/// `FAKE_CARGO_FAIL_MESSAGE` to stderr and exits with status 101, the way cargo does on a compile
/// error.
const FAKE_CARGO: &str = r#"#!/bin/sh
echo "$*" >> "$(dirname "$0")/invocations.log"
case "$*" in
    $FAKE_CARGO_FAIL_PATTERN)
        echo "$FAKE_CARGO_FAIL_MESSAGE" >&2
        exit 101
        ;;
esac
exit 0
"#;

pub(crate) struct TestFs {
    /// Directory holding the fake `cargo`
    pub(crate) bin: TempDir,
    pub(crate) user_config: TempDir,
    pub(crate) cwd: TempDir,
}

impl TestFs {
    fn new() -> Self {
        let bin = TempDir::with_prefix("featcheck-bin-").unwrap();
        let user_config = TempDir::with_prefix("featcheck-user-").unwrap();
        let cwd = TempDir::with_prefix("featcheck-cwd-").unwrap();

        Self {
            bin,
            user_config,
            cwd,
        }
    }
}

/// Represents the `featcheck` binary for use in tests.
///
/// The `cmd` field provides helpers for running the binary and asserting on its output.
pub(crate) struct Featcheck {
    pub(crate) cmd: Command,
    pub(crate) test_fs: Option<TestFs>,
}

impl Featcheck {
    /// Creates a new `Featcheck` that locates the bin
    pub(crate) fn find() -> Self {
        Self {
            cmd: Command::cargo_bin("featcheck").expect("Failed to find featcheck binary"),
            test_fs: None,
        }
    }

    /// Construct an isolated filesystem structure for running the command, with a fake `cargo`
    /// that succeeds for every check unless told otherwise with [`Self::fail_when`].
    ///
    /// The user config dir and the current directory are empty temp dirs, so the host's config
    /// files never leak into a test.
    #[cfg(unix)]
    pub(crate) fn with_fake_cargo() -> Self {
        use std::os::unix::fs::PermissionsExt;

        let mut me = Self::find();
        let test_fs = TestFs::new();

        let cargo = test_fs.bin.child("cargo");
        cargo.write_str(FAKE_CARGO).unwrap();
        std::fs::set_permissions(cargo.path(), std::fs::Permissions::from_mode(0o755)).unwrap();

        me.cmd
            .arg("--user-config-dir")
            .arg(test_fs.user_config.path())
            .env("FEATCHECK_CARGO", cargo.path())
            .env("FAKE_CARGO_FAIL_PATTERN", "__never__")
            .env_remove("FEATCHECK_LOG")
            .env_remove("RUST_LOG")
            .current_dir(test_fs.cwd.path());

        me.test_fs = Some(test_fs);
        me
    }

    pub(crate) fn test_fs(&self) -> &TestFs {
        self.test_fs.as_ref().expect("test_fs not set")
    }

    /// Write `featcheck.toml` into the current directory of the command.
    pub(crate) fn with_config(self, toml: &str) -> Self {
        self.test_fs().cwd.child("featcheck.toml").write_str(toml).unwrap();
        self
    }

    /// Make the fake `cargo` fail when its arguments match the shell glob `pattern`.
    pub(crate) fn fail_when(mut self, pattern: &str, message: &str) -> Self {
        self.cmd
            .env("FAKE_CARGO_FAIL_PATTERN", pattern)
            .env("FAKE_CARGO_FAIL_MESSAGE", message);
        self
    }

    /// Every argument list the fake `cargo` was called with, in the order the calls started.
    pub(crate) fn invocations(&self) -> Vec<String> {
        let log = self.test_fs().bin.child("invocations.log");
        match std::fs::read_to_string(log.path()) {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => panic!("Failed to read invocation log: {e}"),
        }
    }
}
