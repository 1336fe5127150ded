//! Answers from the daemon to the client that sent a command.

use anyhow::{Context, Result};
use tokio::sync::mpsc;

/// Sent back over the IPC socket, bincode encoded.
#[derive(Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize, derive_more::Display)]
pub enum DaemonResponse {
    Success(String),
    Failure(String),
}

impl DaemonResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, DaemonResponse::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        !self.is_success()
    }
}

/// A failed command answers with its error and the chain of causes on one line.
impl From<Result<String>> for DaemonResponse {
    fn from(result: Result<String>) -> Self {
        match result {
            Ok(message) => DaemonResponse::Success(message),
            Err(err) => DaemonResponse::Failure(crate::error_handling_ctx::format_error(&err)),
        }
    }
}

pub type DaemonResponseReceiver = mpsc::UnboundedReceiver<DaemonResponse>;

/// Travels with a command into the app, which answers through it once the command ran.
#[derive(Debug)]
pub struct DaemonResponseSender(mpsc::UnboundedSender<DaemonResponse>);

impl DaemonResponseSender {
    pub fn channel() -> (Self, DaemonResponseReceiver) {
        let (sender, recv) = mpsc::unbounded_channel();
        (DaemonResponseSender(sender), recv)
    }

    pub fn send(&self, response: impl Into<DaemonResponse>) -> Result<()> {
        self.0.send(response.into()).context("The client stopped waiting for an answer")
    }
}
