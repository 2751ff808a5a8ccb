//! Turning check outcomes into output for humans and a final verdict.

use crate::{
    Result, error,
    executor::{BatchOutcome, CheckResult},
    messages::{CheckMessage, Message, PlanMessage},
};
use std::fmt;

/// A failed check, as it appears in the terminating error.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CheckFailure {
    /// The reconstructed command line.
    pub command: String,
    pub exit_code: Option<i32>,
    pub stderr: String,
}

impl From<&CheckResult> for CheckFailure {
    fn from(result: &CheckResult) -> Self {
        Self {
            command: result.invocation.command_line(),
            exit_code: result.exit_code,
            stderr: result.stderr_text(),
        }
    }
}

impl fmt::Display for CheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => writeln!(f, "`{}` failed with exit status {}", self.command, code)?,
            None => writeln!(f, "`{}` was terminated by a signal", self.command)?,
        }

        let stderr = self.stderr.trim_end();
        if !stderr.is_empty() {
            writeln!(f, "{stderr}")?;
        }

        Ok(())
    }
}

/// Decide the result of a batch.
///
/// Succeeds only if no check failed.  Otherwise the error lists every failed check, with its
/// command line and captured stderr, in the order the checks were planned.
pub fn conclude(outcome: &BatchOutcome) -> Result<()> {
    let failures = outcome.failures().map(CheckFailure::from).collect::<Vec<_>>();

    if failures.is_empty() {
        tracing::info!("All {} checks passed", outcome.total());
        return Ok(());
    }

    error::ChecksFailedSnafu {
        total: outcome.total(),
        failures,
    }
    .fail()
}

/// Render a message as a line of human-readable output, if it warrants one.
///
/// Progress that is only interesting when debugging (a check starting, for instance) is left to
/// the tracing logs.
pub fn render(message: &Message) -> Option<String> {
    match message {
        Message::Plan(PlanMessage::DiscoveredFeatures { package, features }) => Some(format!(
            "No check groups configured; checking {} feature(s) of package {}",
            features.len(),
            package
        )),
        Message::Plan(PlanMessage::Ready { .. }) => None,
        Message::Plan(PlanMessage::Planned { command }) => Some(command.clone()),
        Message::Check(CheckMessage::Started { .. }) => None,
        Message::Check(CheckMessage::Passed { command }) => Some(format!("ok       {command}")),
        Message::Check(CheckMessage::Failed {
            command, exit_code, ..
        }) => Some(match exit_code {
            Some(code) => format!("FAILED   {command} (exit status {code})"),
            None => format!("FAILED   {command} (terminated by signal)"),
        }),
        Message::Check(CheckMessage::Skipped { command }) => Some(format!("skipped  {command}")),
        Message::Check(CheckMessage::Cancelled { command }) => Some(format!("killed   {command}")),
        Message::Check(CheckMessage::Summary {
            total,
            passed,
            failed,
            cancelled,
            skipped,
        }) => Some(format!(
            "{total} checks: {passed} passed, {failed} failed, {cancelled} cancelled, {skipped} skipped"
        )),
    }
}
