//! Command status state machine.
//!
//! ```text
//! CREATED -> QUEUED -> PROCESSING -> COMPLETE
//!    |          |           |
//!    +----------+-----------+------> ERROR
//! ```
//!
//! The state lives in a `watch` channel owned by the command. Every
//! transition goes through `send_if_modified`, so checking the current state
//! and applying the next one is a single atomic step and the terminal
//! transition can only happen once. Waiters observe the same channel.

use std::fmt;

use tokio::sync::watch;

/// Observable status of a command.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    /// Built by the caller, not yet seen by the engine.
    Created,
    /// Accepted into the pending queue.
    Queued,
    /// Written to the transport, awaiting responses.
    Processing,
    /// Finished successfully.
    Complete,
    /// Finished with an error.
    Error,
}

impl CommandStatus {
    /// Whether the status is final.
    #[must_use]
    pub const fn is_terminal(self) -> bool { matches!(self, Self::Complete | Self::Error) }

    const fn rank(self) -> u8 {
        match self {
            Self::Created => 0,
            Self::Queued => 1,
            Self::Processing => 2,
            Self::Complete | Self::Error => 3,
        }
    }
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Created => "CREATED",
            Self::Queued => "QUEUED",
            Self::Processing => "PROCESSING",
            Self::Complete => "COMPLETE",
            Self::Error => "ERROR",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug)]
pub(crate) struct State {
    pub(crate) status: CommandStatus,
    pub(crate) error_detail: Option<String>,
}

/// Lifecycle of a single command.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    state: watch::Sender<State>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        let (state, _) = watch::channel(State {
            status: CommandStatus::Created,
            error_detail: None,
        });
        Self { state }
    }

    pub(crate) fn status(&self) -> CommandStatus { self.state.borrow().status }

    pub(crate) fn error_detail(&self) -> Option<String> { self.state.borrow().error_detail.clone() }

    /// Move forward to `next` if it is exactly one step ahead.
    fn advance(&self, from: CommandStatus, next: CommandStatus) -> bool {
        self.state.send_if_modified(|state| {
            if state.status != from || next.rank() <= from.rank() {
                return false;
            }
            state.status = next;
            true
        })
    }

    /// `CREATED -> QUEUED`.
    pub(crate) fn mark_queued(&self) -> bool {
        self.advance(CommandStatus::Created, CommandStatus::Queued)
    }

    /// `QUEUED -> PROCESSING`.
    pub(crate) fn mark_processing(&self) -> bool {
        self.advance(CommandStatus::Queued, CommandStatus::Processing)
    }

    /// Any non-terminal state to `COMPLETE`.
    pub(crate) fn complete(&self) -> bool {
        self.state.send_if_modified(|state| {
            if state.status.is_terminal() {
                return false;
            }
            state.status = CommandStatus::Complete;
            true
        })
    }

    /// Any non-terminal state to `ERROR` with `detail`.
    ///
    /// Returns `false` if the command had already finished, in which case the
    /// existing outcome is kept.
    pub(crate) fn fail(&self, detail: impl Into<String>) -> bool {
        let detail = detail.into();
        self.state.send_if_modified(|state| {
            if state.status.is_terminal() {
                return false;
            }
            state.status = CommandStatus::Error;
            state.error_detail = Some(detail);
            true
        })
    }

    /// Wait until the command reaches a terminal status.
    pub(crate) async fn settled(&self) -> CommandStatus {
        let mut rx = self.state.subscribe();
        match rx.wait_for(|state| state.status.is_terminal()).await {
            Ok(state) => state.status,
            Err(_) => self.status(),
        }
    }
}
