use crate::reporter::CheckFailure;
use snafu::prelude::*;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
#[non_exhaustive]
pub enum Error {
    #[snafu(display("Failed to load configuration: {source}"))]
    ConfigLoad {
        #[snafu(source(from(figment::Error, Box::new)))]
        source: Box<figment::Error>,
    },

    #[snafu(display("Invalid configuration: {message}"))]
    InvalidConfig { message: String },

    #[snafu(display(
        "Check group '{group}' requires a target triple, but none was given on the command line"
    ))]
    MissingTarget { group: String },

    #[snafu(display(
        "Check group '{group}' brings the plan to {checks} checks, more than the limit of \
         {max_checks}; use the permute-iterate policy for large feature lists, or raise max_checks"
    ))]
    PlanTooLarge {
        group: String,
        checks: usize,
        max_checks: usize,
    },

    #[snafu(display("Error invoking `{}` to read package metadata: {}", cargo_path.display(), source))]
    Metadata {
        cargo_path: PathBuf,
        source: cargo_metadata::Error,
    },

    #[snafu(display(
        "No check groups are configured and the current directory is not a package with features \
         (found {package_count} workspace members but no root package)"
    ))]
    NoFeatures { package_count: usize },

    #[snafu(display("Executable '{name}' not found in PATH or standard locations"))]
    ExecutableNotFound { name: String },

    #[snafu(display("Failed to spawn `{command}`: {source}"))]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("Failed to wait for `{command}`: {source}"))]
    WaitFailed {
        command: String,
        source: std::io::Error,
    },

    #[snafu(display("Tokio runtime error: {source}"))]
    TokioRuntime { source: std::io::Error },

    #[snafu(display("Tokio task join error: {source}"))]
    TokioJoin { source: tokio::task::JoinError },

    #[snafu(display(
        "{} of {} checks failed:\n\n{}",
        failures.len(),
        total,
        failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n")
    ))]
    ChecksFailed {
        total: usize,
        failures: Vec<CheckFailure>,
    },
}

impl Error {
    /// Process exit status for this error.
    ///
    /// Failed checks exit with 1.  Everything else is a problem with the configuration or the
    /// environment, detected before (or instead of) running checks, and exits with 2.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::ChecksFailed { .. } => 1,
            _ => 2,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
