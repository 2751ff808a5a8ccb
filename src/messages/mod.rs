pub mod check;
pub mod plan;

use serde::{Deserialize, Serialize};
use std::sync::mpsc;

pub use check::CheckMessage;
pub use plan::PlanMessage;

/// Top-level message enum representing all possible diagnostic messages from featcheck.
///
/// Each variant corresponds to a specific subsystem and wraps that subsystem's message type.
/// Messages are serialized as tagged JSON with a "type" field indicating the subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum Message {
    Plan(PlanMessage),
    Check(CheckMessage),
}

/// A reporter for diagnostic messages.
///
/// This type is cheaply cloneable and can be shared across threads and tasks. It supports two
/// modes:
/// - `Null`: Messages are silently discarded (no-op)
/// - `Channel`: Messages are sent to an mpsc channel for processing
///
/// The `report` method takes a closure to avoid allocating or cloning data unless messages
/// are actually enabled.
#[derive(Clone, Debug)]
pub enum MessageReporter {
    Null,
    Channel(mpsc::SyncSender<Message>),
}

impl MessageReporter {
    /// Create a null reporter that discards all messages.
    pub fn null() -> Self {
        Self::Null
    }

    /// Create a channel reporter that sends messages to the given sender.
    pub fn channel(sender: mpsc::SyncSender<Message>) -> Self {
        Self::Channel(sender)
    }

    /// Report a message by invoking the closure only if messages are enabled.
    ///
    /// ```ignore
    /// reporter.report(|| CheckMessage::completed(&result));
    /// ```
    pub fn report<F, T>(&self, f: F)
    where
        F: FnOnce() -> T,
        T: Into<Message>,
    {
        if let Self::Channel(sender) = self {
            let msg = f().into();
            let _ = sender.send(msg);
        }
    }

    /// Returns true if message reporting is enabled (not null).
    pub fn is_enabled(&self) -> bool {
        matches!(self, Self::Channel(_))
    }
}
