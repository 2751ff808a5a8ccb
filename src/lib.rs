pub mod cargo;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod invocation;
pub(crate) mod logging;
pub mod messages;
pub mod plan;
pub mod powerset;
pub mod reporter;

use config::Config;
use executor::{BatchOutcome, Executor, ProcessRunner};
use invocation::InvocationOptions;
use messages::{Message, MessageReporter, PlanMessage};
use plan::{CheckGroup, Plan};
use snafu::ResultExt;
use std::{path::PathBuf, sync::mpsc};

pub use cli::CliArgs;
pub use error::{Error, Result};

/// Re-export of the snafu [`snafu::Report`] type so that callers can refer to this type without
/// taking an explicit snafu dep
pub use snafu::Report as SnafuReport;

/// Toolchain used for the plan derived from package metadata when no check groups are configured.
const DEFAULT_TOOLCHAIN: &str = "stable";

/// Above this many checks, a plan derived from package metadata gets a warning.
const LARGE_PLAN_WARNING: usize = 4096;

const MESSAGE_CHANNEL_SIZE: usize = 100;

/// Instance of the engine that powers the `featcheck` tool.
///
/// This is packaged this way so that our `main.rs` is as minimal as possible, and so the whole
/// pipeline can be driven from tests.
pub struct Featcheck {
    config: Config,
    cargo_path: PathBuf,
    reporter: MessageReporter,
}

impl Featcheck {
    /// Create a new instance from a loaded configuration.
    ///
    /// Fails if `cargo` can't be found.
    pub fn new(config: Config, reporter: MessageReporter) -> Result<Self> {
        tracing::debug!("Using config: {:#?}", config);

        let cargo_path = cargo::find_cargo(config.cargo.as_deref())?;
        tracing::debug!("Using cargo at {}", cargo_path.display());

        Ok(Self {
            config,
            cargo_path,
            reporter,
        })
    }

    /// Expand the configured check groups into a plan.
    ///
    /// If no groups are configured, the features of the package in the current directory are
    /// read from its metadata and their full powerset is checked on the stable toolchain.
    pub fn plan(&self, cli_target: Option<&str>) -> Result<Plan> {
        let plan = if self.config.checks.is_empty() {
            let groups = [self.discover_group()?];
            Plan::build(&groups, cli_target, self.config.compile, self.config.max_checks)?
        } else {
            Plan::build(
                &self.config.checks,
                cli_target,
                self.config.compile,
                self.config.max_checks,
            )?
        };

        self.reporter.report(|| {
            PlanMessage::ready(plan.len(), self.config.jobs, self.config.failure_policy)
        });

        Ok(plan)
    }

    /// Options for turning the plan's checks into invocations.
    pub fn invocation_options(&self) -> InvocationOptions {
        InvocationOptions {
            cargo_path: self.cargo_path.clone(),
            toolchain_selector: self.config.toolchain_selector,
        }
    }

    /// Report the command line of every check in `plan` without running anything.
    pub fn dry_run(&self, plan: &Plan) {
        for invocation in plan.invocations(&self.invocation_options()) {
            self.reporter.report(|| PlanMessage::planned(&invocation));
        }
    }

    /// Run every check in `plan`, honoring the configured concurrency and failure policy.
    ///
    /// Failed checks are reported in the returned [`BatchOutcome`], not as an error.
    pub fn run(&self, plan: &Plan) -> Result<BatchOutcome> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .context(error::TokioRuntimeSnafu)?;

        let executor = Executor::new(
            ProcessRunner,
            self.config.jobs,
            self.config.failure_policy,
            self.reporter.clone(),
        );

        runtime.block_on(executor.run(plan.invocations(&self.invocation_options())))
    }

    fn discover_group(&self) -> Result<CheckGroup> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let discovered = cargo::package_features(&self.cargo_path, &cwd)?;

        tracing::info!(
            "No check groups configured; using the {} feature(s) of package {}",
            discovered.features.len(),
            discovered.package
        );
        self.reporter
            .report(|| PlanMessage::discovered_features(&discovered.package, &discovered.features));

        let group = CheckGroup::powerset(vec![DEFAULT_TOOLCHAIN.to_string()], discovered.features);
        if group.policy.len() > LARGE_PLAN_WARNING {
            tracing::warn!(
                "Checking every combination of features means {} checks; consider adding a \
                 featcheck.toml with a permute-iterate check group",
                group.policy.len()
            );
        }

        Ok(group)
    }
}

/// Main entry point for the `featcheck` engine.
///
/// Meant to be called from `main.rs` or other frontends.  Returns an error if any check failed,
/// in which case [`Error::exit_code`] gives the status the process should exit with.
pub fn featcheck_main() -> Result<()> {
    let args = CliArgs::parse_from_cli_args();

    // Initialize tracing early, before any other operations
    logging::init(&args);

    if args.version {
        print_version();
        return Ok(());
    }

    let config = Config::load(&args)?;

    // Apply log level from config file if appropriate
    logging::apply_config(&config, &args);

    // Messages are printed on their own thread, so the executor never waits on stdout
    let json_mode = matches!(args.message_format, Some(cli::MessageFormat::Json));
    let (tx, rx) = mpsc::sync_channel(MESSAGE_CHANNEL_SIZE);
    let printer = std::thread::spawn(move || print_messages(rx, json_mode));

    // Every sender is dropped by the time `run` returns, which ends the printer thread
    let result = run(&args, config, MessageReporter::channel(tx));

    tracing::debug!("Waiting for message printer thread to finish");
    let _ = printer.join();

    match result? {
        Some(outcome) => reporter::conclude(&outcome),
        None => Ok(()),
    }
}

/// Build the plan and run it, or just print it for `--dry-run` (returning `None`).
fn run(args: &CliArgs, config: Config, reporter: MessageReporter) -> Result<Option<BatchOutcome>> {
    let featcheck = Featcheck::new(config, reporter)?;
    let plan = featcheck.plan(args.target.as_deref())?;

    if args.dry_run {
        featcheck.dry_run(&plan);
        return Ok(None);
    }

    featcheck.run(&plan).map(Some)
}

fn print_messages(rx: mpsc::Receiver<Message>, json_mode: bool) {
    tracing::debug!("Starting message printer thread");

    for msg in rx {
        if json_mode {
            match serde_json::to_string(&msg) {
                Ok(json) => println!("{}", json),
                Err(e) => eprintln!("Failed to serialize message: {}", e),
            }
        } else if let Some(line) = reporter::render(&msg) {
            println!("{line}");
        }
    }

    tracing::debug!("Message printer thread exiting");
}

fn print_version() {
    let version = env!("CARGO_PKG_VERSION");

    match (
        option_env!("VERGEN_GIT_SHA"),
        option_env!("VERGEN_GIT_COMMIT_DATE"),
    ) {
        (Some(sha), Some(date))
            if sha != "VERGEN_IDEMPOTENT_OUTPUT" && date != "VERGEN_IDEMPOTENT_OUTPUT" =>
        {
            eprintln!("featcheck {} ({} {})", version, sha, date);
        }
        _ => {
            eprintln!("featcheck {}", version);
        }
    }
}
