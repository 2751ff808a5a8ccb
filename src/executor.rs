//! Concurrent execution of `cargo check` invocations.
//!
//! The [`Executor`] fans a batch of [`Invocation`]s out into tokio tasks.  A semaphore caps the
//! number of processes alive at once at the configured `jobs` count; the rest wait their turn.
//!
//! What happens after a check fails depends on the [`FailurePolicy`]:
//!
//! - [`FailurePolicy::CollectAll`]: nothing.  Every invocation runs to completion and all the
//!   failures are reported together at the end.
//! - [`FailurePolicy::FailFast`]: no further invocations are started, and those already running
//!   are aborted, which kills their processes.  Invocations that never ran are reported as
//!   skipped; those that were killed part way through are reported as cancelled.
//!
//! Checks are deterministic, so a failure is never retried.

use crate::{
    Result, error,
    invocation::Invocation,
    messages::{CheckMessage, MessageReporter},
};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::{
    future::Future,
    process::Stdio,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use tokio::{process::Command, sync::Semaphore, task::JoinSet};

/// What to do with the rest of a batch once a check fails.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantNames,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum FailurePolicy {
    /// Run every check, then report all failures.
    #[default]
    CollectAll,

    /// Stop at the first failure.
    FailFast,
}

/// The outcome of one `cargo check` process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckResult {
    pub invocation: Invocation,

    /// Process exit code, or `None` if it was terminated by a signal.
    pub exit_code: Option<i32>,

    /// Everything the process wrote to stderr.
    pub stderr: Vec<u8>,
}

impl CheckResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// The captured stderr, decoded as UTF-8 with invalid sequences replaced.
    pub fn stderr_text(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// What became of a single invocation in a batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckOutcome {
    Completed(CheckResult),

    /// Never started, because the batch was cancelled by an earlier failure.
    Skipped(Invocation),

    /// Started, but killed before finishing because another check failed.
    Cancelled(Invocation),
}

/// Outcomes of a whole batch, in the same order as the invocations that were submitted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub outcomes: Vec<CheckOutcome>,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn passed(&self) -> impl Iterator<Item = &CheckResult> {
        self.completed().filter(|result| result.success())
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.completed().filter(|result| !result.success())
    }

    pub fn skipped(&self) -> impl Iterator<Item = &Invocation> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            CheckOutcome::Skipped(invocation) => Some(invocation),
            CheckOutcome::Completed(_) | CheckOutcome::Cancelled(_) => None,
        })
    }

    pub fn cancelled(&self) -> impl Iterator<Item = &Invocation> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            CheckOutcome::Cancelled(invocation) => Some(invocation),
            CheckOutcome::Completed(_) | CheckOutcome::Skipped(_) => None,
        })
    }

    pub fn is_success(&self) -> bool {
        self.failures().next().is_none()
    }

    fn completed(&self) -> impl Iterator<Item = &CheckResult> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            CheckOutcome::Completed(result) => Some(result),
            CheckOutcome::Skipped(_) | CheckOutcome::Cancelled(_) => None,
        })
    }

    fn summary(&self) -> CheckMessage {
        CheckMessage::Summary {
            total: self.total(),
            passed: self.passed().count(),
            failed: self.failures().count(),
            cancelled: self.cancelled().count(),
            skipped: self.skipped().count(),
        }
    }
}

/// Launches a single invocation and waits for it to finish.
///
/// The production implementation is [`ProcessRunner`]; tests substitute scripted runners so the
/// scheduling logic can be exercised without spawning anything.
pub trait CheckRunner: Send + Sync + 'static {
    /// Run `invocation` to completion.
    ///
    /// A non-zero exit is not an error at this level; it is reported in the returned
    /// [`CheckResult`].  Errors are reserved for failing to run the process at all.
    fn run(&self, invocation: &Invocation) -> impl Future<Output = Result<CheckResult>> + Send;
}

/// Runs invocations as real child processes.
///
/// Stdout is inherited so that anything cargo prints there reaches the user unchanged; stderr is
/// captured in full.  The child is killed if the future is dropped before it exits, which is how
/// fail-fast cancellation stops processes that are already running.
#[derive(Clone, Debug, Default)]
pub struct ProcessRunner;

impl CheckRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<CheckResult> {
        let command = invocation.command_line();
        tracing::debug!(program = %invocation.program().display(), "Running {command}");

        let child = Command::new(invocation.program())
            .args(invocation.args())
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|_| error::SpawnFailedSnafu {
                command: command.clone(),
            })?;

        let output = child
            .wait_with_output()
            .await
            .context(error::WaitFailedSnafu { command })?;

        Ok(CheckResult {
            invocation: invocation.clone(),
            exit_code: output.status.code(),
            stderr: output.stderr,
        })
    }
}

/// Runs batches of invocations with bounded concurrency.
#[derive(Debug)]
pub struct Executor<R> {
    runner: Arc<R>,
    jobs: usize,
    policy: FailurePolicy,
    reporter: MessageReporter,
}

impl<R: CheckRunner> Executor<R> {
    /// Create an executor that runs at most `jobs` invocations at a time.
    ///
    /// A `jobs` of zero is treated as one.
    pub fn new(runner: R, jobs: usize, policy: FailurePolicy, reporter: MessageReporter) -> Self {
        Self {
            runner: Arc::new(runner),
            jobs: jobs.max(1),
            policy,
            reporter,
        }
    }

    /// Run every invocation in `invocations` according to the failure policy.
    ///
    /// Returns the outcome of each invocation in submission order.  Failed checks are part of
    /// the successful return value; `Err` means a process could not be launched or awaited, in
    /// which case the rest of the batch is abandoned.
    pub async fn run(&self, invocations: Vec<Invocation>) -> Result<BatchOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.jobs));
        let cancelled = Arc::new(AtomicBool::new(false));
        // Set by each task just before it launches its process, so an aborted task can be told
        // apart from one that never got a permit
        let launched = Arc::new(
            invocations
                .iter()
                .map(|_| AtomicBool::new(false))
                .collect::<Vec<_>>(),
        );
        let mut joins = JoinSet::new();

        tracing::info!(
            checks = invocations.len(),
            jobs = self.jobs,
            policy = %self.policy,
            "Starting checks"
        );

        for (index, invocation) in invocations.iter().cloned().enumerate() {
            let runner = self.runner.clone();
            let semaphore = semaphore.clone();
            let cancelled = cancelled.clone();
            let launched = launched.clone();
            let reporter = self.reporter.clone();
            let policy = self.policy;

            joins.spawn(async move {
                // The semaphore is never closed, so acquiring only fails if that changes
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return Ok((index, None));
                };

                if cancelled.load(Ordering::SeqCst) {
                    return Ok((index, None));
                }

                launched[index].store(true, Ordering::SeqCst);
                reporter.report(|| CheckMessage::started(&invocation));
                let result = runner.run(&invocation).await?;

                if !result.success() && policy == FailurePolicy::FailFast {
                    cancelled.store(true, Ordering::SeqCst);
                }

                reporter.report(|| CheckMessage::completed(&result));

                Ok::<_, crate::Error>((index, Some(result)))
            });
        }

        let mut results = invocations.iter().map(|_| None).collect::<Vec<Option<CheckResult>>>();

        while let Some(joined) = joins.join_next().await {
            let (index, result) = match joined {
                Ok(task_result) => task_result?,
                Err(e) if e.is_cancelled() => continue,
                Err(e) => return Err(e).context(error::TokioJoinSnafu),
            };

            if let Some(result) = &result {
                if result.success() {
                    tracing::debug!("Check passed: {}", result.invocation);
                } else {
                    tracing::debug!(exit_code = ?result.exit_code, "Check failed: {}", result.invocation);

                    if self.policy == FailurePolicy::FailFast {
                        tracing::info!("Cancelling remaining checks after failure");
                        joins.abort_all();
                    }
                }
            }

            results[index] = result;
        }

        let outcomes = invocations
            .into_iter()
            .zip(results)
            .enumerate()
            .map(|(index, (invocation, result))| match result {
                Some(result) => CheckOutcome::Completed(result),
                None if launched[index].load(Ordering::SeqCst) => {
                    self.reporter.report(|| CheckMessage::cancelled(&invocation));
                    CheckOutcome::Cancelled(invocation)
                }
                None => {
                    self.reporter.report(|| CheckMessage::skipped(&invocation));
                    CheckOutcome::Skipped(invocation)
                }
            })
            .collect();

        let outcome = BatchOutcome { outcomes };
        self.reporter.report(|| outcome.summary());

        Ok(outcome)
    }
}
