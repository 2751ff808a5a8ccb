use super::Message;
use crate::{executor::CheckResult, invocation::Invocation};
use serde::{Deserialize, Serialize};

/// Messages about individual `cargo check` runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CheckMessage {
    Started {
        command: String,
    },
    Passed {
        command: String,
    },
    Failed {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
    /// The check never ran because an earlier check failed under the fail-fast policy.
    Skipped {
        command: String,
    },
    /// The check was running, but was killed because another check failed under the fail-fast
    /// policy.
    Cancelled {
        command: String,
    },
    Summary {
        total: usize,
        passed: usize,
        failed: usize,
        cancelled: usize,
        skipped: usize,
    },
}

impl CheckMessage {
    pub fn started(invocation: &Invocation) -> Self {
        Self::Started {
            command: invocation.command_line(),
        }
    }

    pub fn completed(result: &CheckResult) -> Self {
        if result.success() {
            Self::Passed {
                command: result.invocation.command_line(),
            }
        } else {
            Self::Failed {
                command: result.invocation.command_line(),
                exit_code: result.exit_code,
                stderr: result.stderr_text(),
            }
        }
    }

    pub fn skipped(invocation: &Invocation) -> Self {
        Self::Skipped {
            command: invocation.command_line(),
        }
    }

    pub fn cancelled(invocation: &Invocation) -> Self {
        Self::Cancelled {
            command: invocation.command_line(),
        }
    }
}

impl From<CheckMessage> for Message {
    fn from(msg: CheckMessage) -> Self {
        Message::Check(msg)
    }
}
