//! Error types surfaced by the engine's public API.
//!
//! Submission rejections, `execute` failures, link set-up failures and the
//! link-down condition each get their own type so callers can match on the
//! outcome they care about without unpicking a catch-all enum.

use std::{io, time::Duration};

use thiserror::Error;

use crate::config::ConfigError;

/// Reasons a command is refused at submission.
///
/// A rejected command is already in [`crate::CommandStatus::Error`] when this
/// is returned, except for [`Rejected::AlreadySubmitted`], which leaves the
/// command untouched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Rejected {
    /// The pending queue holds its configured maximum.
    #[error("pending queue is full (capacity {capacity})")]
    QueueFull {
        /// Configured queue depth.
        capacity: usize,
    },
    /// The handle has already been submitted once.
    #[error("command has already been submitted")]
    AlreadySubmitted,
    /// The engine has shut down or its link is down.
    #[error("engine is not running")]
    ShutDown,
}

/// Failure of [`crate::Engine::execute`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ExecuteError {
    /// The command never entered the queue.
    #[error(transparent)]
    Rejected(#[from] Rejected),
    /// The command reached `ERROR`.
    #[error("command failed: {detail}")]
    Failed {
        /// The command's error detail.
        detail: String,
    },
    /// The command did not finish before its deadline and was forced to
    /// `ERROR`.
    #[error("command did not complete within {after:?}")]
    Timeout {
        /// Deadline that elapsed.
        after: Duration,
    },
}

impl ExecuteError {
    /// Detail recorded on the command for this failure.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::Failed { detail } => detail.clone(),
            other => other.to_string(),
        }
    }
}

/// Unrecoverable condition that stopped one of the engine's workers.
///
/// Only the first condition is reported; the owner of the engine decides
/// whether to reconnect.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LinkDown {
    /// The gateway closed the stream.
    #[error("gateway closed the connection")]
    EndOfStream,
    /// Reading from the transport failed.
    #[error("read from gateway failed: {0}")]
    ReadFailed(String),
    /// Writing a command to the transport failed.
    #[error("write to gateway failed: {0}")]
    WriteFailed(String),
}

/// Failure to bring a gateway link up.
#[derive(Debug, Error)]
pub enum LinkError {
    /// The supplied configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The TCP connection could not be established.
    #[error("could not connect to {addr}: {source}")]
    Connect {
        /// Address that was dialled.
        addr: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The TLS handshake or client set-up failed.
    #[error("TLS set-up failed: {0}")]
    Tls(#[source] io::Error),
    /// The gateway refused the password.
    #[error("gateway rejected login: {0}")]
    LoginRejected(#[source] ExecuteError),
}
