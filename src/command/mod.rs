//! Commands submitted to the engine and their lifecycle.
//!
//! A [`Command`] describes one unit of work: the frame to write, how to
//! recognise the frames that answer it and how those frames advance it. The
//! engine treats the command as opaque and drives it through
//! [`CommandStatus`] via a [`CommandHandle`] shared with the caller.

use std::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use thiserror::Error;

use crate::frame::Frame;

mod builtin;
mod handle;
mod lifecycle;

pub use builtin::{CONNECTIVITY_CHECK_TIMEOUT, ConnectivityCheck, Login, MAX_PASSWORD_LEN};
pub use handle::CommandHandle;
pub(crate) use handle::Transaction;
pub use lifecycle::CommandStatus;
pub(crate) use lifecycle::Lifecycle;

/// Opaque identity of a submitted command.
///
/// Identifiers increase monotonically in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u64);

impl CommandId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Return the inner `u64` representation.
    #[must_use]
    pub fn as_u64(&self) -> u64 { self.0 }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "CommandId({})", self.0) }
}

/// Address of a device behind the gateway.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u8);

impl NodeId {
    /// Wrap a raw node index.
    #[must_use]
    pub const fn new(index: u8) -> Self { Self(index) }

    /// Return the raw node index.
    #[must_use]
    pub const fn as_u8(self) -> u8 { self.0 }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "node {}", self.0) }
}

/// Classification used for authentication checks and same-node throttling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommandProfile {
    /// The link must be authenticated before the command is written.
    pub requires_authentication: bool,
    /// Node the command is scoped to, if any.
    pub node: Option<NodeId>,
    /// The command carries a session token that disambiguates its responses.
    pub uses_session: bool,
}

impl CommandProfile {
    /// Profile of a gateway-level command that needs no authentication.
    #[must_use]
    pub const fn gateway() -> Self {
        Self {
            requires_authentication: false,
            node: None,
            uses_session: false,
        }
    }

    /// Profile of an authenticated command scoped to `node`.
    #[must_use]
    pub const fn node(node: NodeId) -> Self {
        Self {
            requires_authentication: true,
            node: Some(node),
            uses_session: false,
        }
    }

    /// Mark the command as requiring authentication.
    #[must_use]
    pub const fn authenticated(mut self) -> Self {
        self.requires_authentication = true;
        self
    }

    /// Mark the command as carrying a session token.
    #[must_use]
    pub const fn with_session(mut self) -> Self {
        self.uses_session = true;
        self
    }

    /// Whether the command is scoped to a single node.
    #[must_use]
    pub const fn is_node_specific(&self) -> bool { self.node.is_some() }

    /// Node that must not have another command in flight when this one is
    /// written.
    ///
    /// Only node-specific commands without a session are serialised per node.
    #[must_use]
    pub const fn serialised_node(&self) -> Option<NodeId> {
        if self.uses_session { None } else { self.node }
    }
}

/// Result of feeding a frame to a command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Progress {
    /// More frames are expected.
    Pending,
    /// The command received everything it expects.
    Complete,
    /// The command failed with the given detail.
    Failed(String),
}

/// Reasons a command cannot be written.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    /// The command failed its own structural validation.
    #[error("command failed validation: {0}")]
    Invalid(String),
    /// The command requires authentication and the link has none.
    #[error("command requires authentication but the link is not authenticated")]
    NotAuthenticated,
    /// The request frame could not be encoded.
    #[error("request could not be encoded: {0}")]
    Encode(#[from] crate::frame::FrameError),
}

/// A unit of work understood by the gateway.
///
/// Implementors own the device-specific encoding and response handling; the
/// engine only sequences them.
pub trait Command: Send + 'static {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Authentication and throttling classification.
    fn profile(&self) -> CommandProfile;

    /// Timeout applied by [`crate::Engine::execute`] when the caller gives
    /// none.
    fn default_timeout(&self) -> Option<Duration> { None }

    /// Check the command is structurally well formed.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::Invalid`] describing the problem.
    fn validate(&self) -> Result<(), CommandError> { Ok(()) }

    /// Frame written to the gateway.
    fn request(&self) -> Frame;

    /// Whether `frame` answers this command.
    fn matches(&self, frame: &Frame) -> bool;

    /// Consume a matching frame and report progress.
    fn on_frame(&mut self, frame: &Frame) -> Progress;
}

#[cfg(test)]
mod tests;
