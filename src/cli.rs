use crate::{executor::FailurePolicy, invocation::CompileTargets};
use clap::{ArgAction, Parser, ValueEnum, builder::TypedValueParser};
use std::path::PathBuf;
use strum::VariantNames;

/// Creates a clap value parser that uses strum's [`VariantNames`] for possible values
/// and strum's [`FromStr`](std::str::FromStr) for parsing. This ensures:
/// - `--help` shows valid values (from `VARIANTS`)
/// - Parsing uses the same spelling as config files
macro_rules! strum_value_parser {
    ($t:ty) => {
        clap::builder::PossibleValuesParser::new(<$t>::VARIANTS).map(|s| s.parse::<$t>().unwrap())
    };
}

/// Output format for structured messages.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MessageFormat {
    /// JSON format, one message per line
    Json,
}

#[derive(Clone, Debug, Parser)]
#[command(name = "featcheck")]
#[command(about = "Check every combination of a crate's cargo features across toolchains and targets")]
#[command(disable_version_flag = true)]
#[non_exhaustive]
pub struct CliArgs {
    /// Target triple to check for.
    ///
    /// Used by every check group that does not list its own targets.  When omitted, those groups
    /// check the host target, except groups marked `require_target`, which fail instead.
    #[arg(value_name = "TARGET")]
    pub target: Option<String>,

    /// Maximum number of checks to run at once, defaults to # of CPUs
    #[arg(short = 'j', long, value_name = "N")]
    pub jobs: Option<usize>,

    /// What to do when a check fails: keep going and report everything at the end
    /// (collect-all), or stop at the first failure (fail-fast).
    #[arg(long, value_name = "POLICY", value_parser = strum_value_parser!(FailurePolicy))]
    pub failure_policy: Option<FailurePolicy>,

    /// Shorthand for `--failure-policy fail-fast`
    #[arg(long, conflicts_with = "failure_policy")]
    pub fail_fast: bool,

    /// Which targets within the package to check, for groups that don't say: examples
    /// (`--examples`) or all (`--all`)
    #[arg(long, value_name = "TARGETS", value_parser = strum_value_parser!(CompileTargets))]
    pub compile: Option<CompileTargets>,

    /// Don't pass `+toolchain` to cargo.
    ///
    /// Toolchain selection with `+toolchain` only works when `cargo` is the rustup proxy.  With
    /// this flag every check runs on whatever toolchain `cargo` belongs to.
    #[arg(long)]
    pub no_toolchain_selector: bool,

    /// Print the command line of every planned check without running any of them
    #[arg(long)]
    pub dry_run: bool,

    /// Read configuration options from the given TOML file only, bypassing the usual config search
    /// paths.
    ///
    /// By default, featcheck will look for a file in the current directory called
    /// `featcheck.toml`, and in each of its ancestors up to the root.  It will also read a
    /// `featcheck.toml` file in the user's config directory.
    ///
    /// All config files' options are merged, with highest priority given to the file closest to
    /// the current directory.
    #[arg(long, value_name = "FILE", conflicts_with = "user_config_dir")]
    pub config_file: Option<PathBuf>,

    /// Override the user config directory location.
    ///
    /// When set, featcheck will look for `featcheck.toml` in this directory instead of the
    /// default user config location (typically `$XDG_CONFIG_HOME/featcheck` or platform
    /// equivalent).
    #[arg(long, value_name = "PATH", env = "FEATCHECK_USER_CONFIG_DIR")]
    pub user_config_dir: Option<PathBuf>,

    /// Output structured messages in the specified format.
    ///
    /// When set to "json", featcheck will output one JSON message per line to stdout describing
    /// the plan and the result of every check, instead of the human-readable lines.
    ///
    /// NOTE: The format of the JSON messages is considered unstable and may change in future
    /// releases.
    #[arg(long, value_name = "FMT")]
    pub message_format: Option<MessageFormat>,

    /// Use verbose output (-vv for debug, -vvv for trace)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Print version information
    #[arg(short = 'V', long)]
    pub version: bool,
}

impl CliArgs {
    /// Parse CLI args from the current process's command line into a `CliArgs` struct.
    ///
    /// This simply spares a caller from having to have the [`clap::Parser`] trait in scope.
    ///
    /// Be advised that this uses `clap` which will exit the process if the args are invalid or
    /// after printing `--help` output.
    pub fn parse_from_cli_args() -> Self {
        Self::parse()
    }

    /// The failure policy requested on the command line, if any.
    pub fn requested_failure_policy(&self) -> Option<FailurePolicy> {
        if self.fail_fast {
            Some(FailurePolicy::FailFast)
        } else {
            self.failure_policy
        }
    }

    /// Parse the CLI args from an arbitary iterator of strings, useful for constructing
    /// [`CliArgs`] values for testing.
    #[cfg(test)]
    pub fn parse_from_test_args<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        // Prepend the name of the executable, as clap will be expecting.
        // No reason to make every test have to remember to do this
        let args = std::iter::once(std::ffi::OsString::from("featcheck")).chain(args.into_iter().map(|s| s.into()));
        Self::parse_from(args)
    }
}
