use super::Message;
use crate::{executor::FailurePolicy, invocation::Invocation};
use serde::{Deserialize, Serialize};

/// Messages about the expansion of check groups into a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlanMessage {
    /// No `[[check]]` groups were configured, so the package's own feature list is used.
    DiscoveredFeatures {
        package: String,
        features: Vec<String>,
    },
    Ready {
        checks: usize,
        jobs: usize,
        failure_policy: FailurePolicy,
    },
    /// A check that `--dry-run` would have run.
    Planned {
        command: String,
    },
}

impl PlanMessage {
    pub fn discovered_features(package: &str, features: &[String]) -> Self {
        Self::DiscoveredFeatures {
            package: package.to_string(),
            features: features.to_vec(),
        }
    }

    pub fn planned(invocation: &Invocation) -> Self {
        Self::Planned {
            command: invocation.command_line(),
        }
    }

    pub fn ready(checks: usize, jobs: usize, failure_policy: FailurePolicy) -> Self {
        Self::Ready {
            checks,
            jobs,
            failure_policy,
        }
    }
}

impl From<PlanMessage> for Message {
    fn from(msg: PlanMessage) -> Self {
        Message::Plan(msg)
    }
}
