//! Hook failure reporting
//!
//! Hooks run inside the read loop, so their errors are not returned to it.
//! They are pushed onto an unbounded channel instead and logged by a
//! separate task; sending never waits on the logger.

use crate::Error;
use std::fmt;
use tokio::{sync::mpsc, task::JoinHandle};

/// Producer side handed to [`crate::Client::handle`]
pub type ErrorSink = mpsc::UnboundedSender<HookError>;

/// Consumer side drained by [`spawn_reporter`]
pub type ErrorStream = mpsc::UnboundedReceiver<HookError>;

/// A failure returned by a hook, tagged with the command it was handling
#[derive(Debug)]
pub struct HookError {
    pub command: String,
    pub error: Error,
}

impl HookError {
    pub fn new(command: &str, error: Error) -> Self {
        Self {
            command: command.to_string(),
            error,
        }
    }
}

impl fmt::Display for HookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hook for {} failed: {}", self.command, self.error)
    }
}

impl std::error::Error for HookError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Create the error channel
pub fn channel() -> (ErrorSink, ErrorStream) {
    mpsc::unbounded_channel()
}

/// Log every reported failure until all senders are dropped
///
/// The task resolves to the number of failures it logged.
pub fn spawn_reporter(mut errors: ErrorStream) -> JoinHandle<usize> {
    tokio::spawn(async move {
        let mut reported = 0;
        while let Some(failure) = errors.recv().await {
            tracing::error!("{}", failure);
            reported += 1;
        }
        tracing::debug!("Error reporter finished after {} failures", reported);
        reported
    })
}
