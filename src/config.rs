use crate::{
    Result, error,
    cli::CliArgs,
    executor::FailurePolicy,
    invocation::CompileTargets,
    plan::{CheckGroup, DEFAULT_MAX_CHECKS},
};
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::path::{Path, PathBuf};

/// Name of the config file searched for in the user config dir and the current directory and
/// its ancestors.
pub const CONFIG_FILE_NAME: &str = "featcheck.toml";

/// Prefix of environment variables that override config file settings, e.g. `FEATCHECK_JOBS`.
const ENV_PREFIX: &str = "FEATCHECK_";

/// Configuration settings for featcheck.
///
/// Loaded once at startup from, in increasing order of precedence: built-in defaults, the user
/// config file, `featcheck.toml` files from the filesystem root down to the current directory,
/// `FEATCHECK_*` environment variables, and command line arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of checks to run at once
    pub jobs: usize,

    pub failure_policy: FailurePolicy,

    /// Which targets to check in groups that don't override it
    pub compile: CompileTargets,

    /// Pass `+toolchain` as the first argument to cargo
    pub toolchain_selector: bool,

    /// Refuse plans with more checks than this
    pub max_checks: usize,

    /// Explicit path to the `cargo` executable; located automatically if not set
    pub cargo: Option<PathBuf>,

    /// Tracing filter expression, e.g. "debug" or "featcheck=trace,info"
    pub log_level: Option<String>,

    /// Check groups, from `[[check]]` tables.  If empty, the package's own features are checked.
    #[serde(rename = "check")]
    pub checks: Vec<CheckGroup>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            failure_policy: FailurePolicy::default(),
            compile: CompileTargets::default(),
            toolchain_selector: true,
            max_checks: DEFAULT_MAX_CHECKS,
            cargo: None,
            log_level: None,
            checks: Vec::new(),
        }
    }
}

fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Config {
    /// Load the configuration, honoring any config-related command line arguments the user
    /// provided.
    pub fn load(args: &CliArgs) -> Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(config_file) = &args.config_file {
            tracing::debug!("Reading config only from {}", config_file.display());
            figment = figment.merge(Toml::file_exact(config_file));
        } else {
            for path in Self::config_files(args.user_config_dir.as_deref(), &cwd) {
                tracing::debug!("Merging config file {}", path.display());
                figment = figment.merge(Toml::file_exact(path));
            }
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["log", "user_config_dir"]));

        let mut config = Self::from_figment(&figment)?;
        config.apply_cli_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Extract a config from an already-assembled figment, without validation.
    pub fn from_figment(figment: &Figment) -> Result<Self> {
        figment.extract().context(error::ConfigLoadSnafu)
    }

    /// The config files that exist, in increasing order of precedence.
    fn config_files(user_config_dir: Option<&Path>, cwd: &Path) -> Vec<PathBuf> {
        let user_config_dir = user_config_dir.map(Path::to_path_buf).or_else(|| {
            use etcetera::{AppStrategy, AppStrategyArgs, choose_app_strategy};

            choose_app_strategy(AppStrategyArgs {
                top_level_domain: "org".to_string(),
                author: "featcheck".to_string(),
                app_name: "featcheck".to_string(),
            })
            .ok()
            .map(|strategy| strategy.config_dir())
        });

        let mut files = Vec::new();

        if let Some(dir) = user_config_dir {
            files.push(dir.join(CONFIG_FILE_NAME));
        }

        // Ancestors are yielded closest first, but the closest must be merged last
        let mut hierarchy = cwd
            .ancestors()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .collect::<Vec<_>>();
        hierarchy.reverse();
        files.extend(hierarchy);

        files.retain(|path| path.is_file());
        files
    }

    fn apply_cli_args(&mut self, args: &CliArgs) {
        if let Some(jobs) = args.jobs {
            self.jobs = jobs;
        }
        if let Some(policy) = args.requested_failure_policy() {
            self.failure_policy = policy;
        }
        if let Some(compile) = args.compile {
            self.compile = compile;
        }
        if args.no_toolchain_selector {
            self.toolchain_selector = false;
        }
    }

    /// Reject settings that would make the plan or the executor misbehave.
    ///
    /// Runs before anything is spawned, so a bad config never results in a partial run.
    pub fn validate(&self) -> Result<()> {
        fn invalid(message: String) -> Result<()> {
            error::InvalidConfigSnafu { message }.fail()
        }

        if self.jobs == 0 {
            return invalid("jobs must be greater than zero".to_string());
        }
        if self.max_checks == 0 {
            return invalid("max_checks must be greater than zero".to_string());
        }

        for (index, group) in self.checks.iter().enumerate() {
            let label = group.label(index);

            if group.toolchains.is_empty() {
                return invalid(format!("check group {label} has no toolchains"));
            }
            if group.toolchains.iter().any(|t| t.trim().is_empty()) {
                return invalid(format!("check group {label} has an empty toolchain name"));
            }
            if group.targets.iter().any(|t| t.trim().is_empty()) {
                return invalid(format!("check group {label} has an empty target"));
            }
            if let Err(message) = group.policy.validate() {
                return invalid(format!("check group {label}: {message}"));
            }
        }

        Ok(())
    }
}
