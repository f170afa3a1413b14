//! Shared ownership of a command between the caller and the engine.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use super::{Command, CommandError, CommandId, CommandProfile, CommandStatus, Lifecycle, Progress};
use crate::frame::Frame;

pub(crate) struct Tracked<C> {
    id: CommandId,
    name: &'static str,
    profile: CommandProfile,
    lifecycle: Lifecycle,
    command: Mutex<C>,
}

impl<C> Tracked<C> {
    fn lock(&self) -> MutexGuard<'_, C> { self.command.lock().expect("lock poisoned") }
}

/// Type-erased view of a tracked command used by the engine's workers.
pub(crate) trait Transaction: Send + Sync {
    fn id(&self) -> CommandId;
    fn name(&self) -> &'static str;
    fn profile(&self) -> CommandProfile;
    fn lifecycle(&self) -> &Lifecycle;
    /// Validate the command and encode its request frame.
    fn prepare(&self) -> Result<bytes::Bytes, CommandError>;
    fn matches(&self, frame: &Frame) -> bool;
    /// Feed a matching frame. Frames reaching a finished command are ignored.
    fn deliver(&self, frame: &Frame) -> CommandStatus;
}

impl<C: Command> Transaction for Tracked<C> {
    fn id(&self) -> CommandId { self.id }

    fn name(&self) -> &'static str { self.name }

    fn profile(&self) -> CommandProfile { self.profile }

    fn lifecycle(&self) -> &Lifecycle { &self.lifecycle }

    fn prepare(&self) -> Result<bytes::Bytes, CommandError> {
        let command = self.lock();
        command.validate()?;
        Ok(command.request().encode()?)
    }

    fn matches(&self, frame: &Frame) -> bool { self.lock().matches(frame) }

    fn deliver(&self, frame: &Frame) -> CommandStatus {
        if self.lifecycle.status().is_terminal() {
            return self.lifecycle.status();
        }
        let progress = self.lock().on_frame(frame);
        match progress {
            Progress::Pending => {}
            Progress::Complete => {
                self.lifecycle.complete();
            }
            Progress::Failed(detail) => {
                self.lifecycle.fail(detail);
            }
        }
        self.lifecycle.status()
    }
}

/// Caller-side handle to a command.
///
/// The handle is created in [`CommandStatus::Created`], handed to
/// [`crate::Engine::submit`] or [`crate::Engine::execute`], and keeps access
/// to the command so results can be read once it settles.
///
/// ```
/// use gatewire::command::{CommandHandle, CommandStatus, ConnectivityCheck};
///
/// let handle = CommandHandle::new(ConnectivityCheck::new());
/// assert_eq!(handle.status(), CommandStatus::Created);
/// assert!(handle.error_detail().is_none());
/// ```
pub struct CommandHandle<C> {
    tracked: Arc<Tracked<C>>,
}

impl<C> Clone for CommandHandle<C> {
    fn clone(&self) -> Self {
        Self {
            tracked: Arc::clone(&self.tracked),
        }
    }
}

impl<C> fmt::Debug for CommandHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHandle")
            .field("id", &self.tracked.id)
            .field("name", &self.tracked.name)
            .field("status", &self.tracked.lifecycle.status())
            .finish_non_exhaustive()
    }
}

impl<C: Command> CommandHandle<C> {
    /// Wrap a command ready for submission.
    #[must_use]
    pub fn new(command: C) -> Self {
        let tracked = Tracked {
            id: CommandId::next(),
            name: command.name(),
            profile: command.profile(),
            lifecycle: Lifecycle::new(),
            command: Mutex::new(command),
        };
        Self {
            tracked: Arc::new(tracked),
        }
    }

    pub(crate) fn transaction(&self) -> Arc<dyn Transaction> {
        let tracked: Arc<dyn Transaction> = self.tracked.clone();
        tracked
    }

    /// Timeout the command asks for when executed without one.
    #[must_use]
    pub fn default_timeout(&self) -> Option<Duration> { self.tracked.lock().default_timeout() }
}

impl<C> CommandHandle<C> {
    /// Identity of the command.
    #[must_use]
    pub fn id(&self) -> CommandId { self.tracked.id }

    /// Diagnostic name of the command.
    #[must_use]
    pub fn name(&self) -> &'static str { self.tracked.name }

    /// Classification captured when the handle was created.
    #[must_use]
    pub fn profile(&self) -> CommandProfile { self.tracked.profile }

    /// Current status.
    #[must_use]
    pub fn status(&self) -> CommandStatus { self.tracked.lifecycle.status() }

    /// Error detail, present once the status is [`CommandStatus::Error`].
    #[must_use]
    pub fn error_detail(&self) -> Option<String> { self.tracked.lifecycle.error_detail() }

    /// Borrow the command, for example to read decoded results.
    ///
    /// Holding the guard blocks the response matcher from delivering frames
    /// to this command; drop it promptly.
    pub fn command(&self) -> MutexGuard<'_, C> { self.tracked.lock() }

    /// Wait until the command completes or fails, without a deadline.
    pub async fn settled(&self) -> CommandStatus { self.tracked.lifecycle.settled().await }

    pub(crate) fn lifecycle(&self) -> &Lifecycle { &self.tracked.lifecycle }
}
