//! The transaction-correlation engine.
//!
//! An [`Engine`] owns one half-duplex gateway link. Commands submitted by
//! callers wait in a bounded queue; the request dispatcher writes them one at a
//! time, pacing writes and holding back a command whose node already has one
//! in flight. The response matcher reads frames in arrival order, resolves the
//! command each frame answers and forwards watched notifications to
//! registered observers. A keep-alive task feeds heartbeats through the same
//! queue.
//!
//! ```text
//! caller -> PendingQueue -> dispatcher -> transport
//!                                             |
//!         observers <- fan-out <- matcher <---+
//!                                    |
//!                     InFlightSet ---+--> command lifecycle
//! ```

mod builder;
mod dispatcher;
mod keepalive;
mod matcher;

use std::{
    fmt,
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
    time::Duration,
};

pub use builder::EngineBuilder;
use tokio::{sync::watch, task::JoinHandle};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    command::{Command, CommandHandle, CommandStatus, Login, Transaction},
    config::LinkConfig,
    error::{ExecuteError, LinkDown, LinkError, Rejected},
    events::{EventFanout, EventObserver, ObserverId},
    in_flight::InFlightSet,
    metrics,
    queue::PendingQueue,
    transport,
};

/// Delay before retrying a command held back by a same-node conflict.
///
/// The conflicting command is whatever is still in flight for the node,
/// including one whose `execute` deadline already passed: a timed-out command
/// stays in flight until a response for it arrives or the engine shuts down.
/// Until then every later session-less command for that node, and with it
/// the head of the queue, is retried at this interval.
pub const CONFLICT_RETRY_DELAY: Duration = Duration::from_millis(500);
/// Minimum gap between two physical writes.
pub const COMMAND_PACING: Duration = Duration::from_millis(250);
/// Capacity of the transport read buffer.
pub const READ_BUFFER_SIZE: usize = 4096;
/// How long [`Engine::shutdown`] lets the dispatcher drain the queue before
/// cancelling it.
pub const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Error detail recorded when `execute` gives up on a command.
pub const TIMEOUT_DETAIL: &str = "command did not complete within the time allocated";
/// Error detail recorded on commands abandoned by [`Engine::shutdown`].
pub const SHUTDOWN_DETAIL: &str = "engine shut down before the command completed";

/// State shared between the engine handle and its workers.
pub(crate) struct Shared {
    queue: PendingQueue,
    in_flight: InFlightSet,
    events: EventFanout,
    authenticated: AtomicBool,
    running: AtomicBool,
    command_timeout_ms: AtomicU64,
    link_down: watch::Sender<Option<LinkDown>>,
    shutdown: CancellationToken,
}

impl Shared {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire) && self.link_down.borrow().is_none()
    }

    fn is_authenticated(&self) -> bool { self.authenticated.load(Ordering::Acquire) }

    fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.load(Ordering::Relaxed))
    }

    /// Queue `command`, moving it to `QUEUED` or, when refused, to `ERROR`.
    fn submit(&self, command: Arc<dyn Transaction>) -> Result<(), Rejected> {
        if command.lifecycle().status() != CommandStatus::Created {
            return Err(Rejected::AlreadySubmitted);
        }
        if !self.is_running() {
            command.lifecycle().fail(Rejected::ShutDown.to_string());
            return Err(Rejected::ShutDown);
        }
        let id = command.id();
        let name = command.name();
        match self.queue.offer(Arc::clone(&command)) {
            Ok(()) => {
                tracing::debug!(command = name, %id, pending = self.queue.len(), "command queued");
                Ok(())
            }
            Err(rejected) => {
                if matches!(rejected, Rejected::QueueFull { .. }) {
                    command.lifecycle().fail(rejected.to_string());
                    tracing::warn!(command = name, %id, %rejected, "command rejected");
                }
                Err(rejected)
            }
        }
    }

    /// Record the first unrecoverable condition. Later ones are only logged.
    fn signal_link_down(&self, condition: LinkDown) {
        let reported = condition.to_string();
        let first = self.link_down.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(condition);
            true
        });
        if first {
            log::warn!("gateway link down: {reported}");
        } else {
            tracing::debug!(condition = %reported, "link already down");
        }
    }

    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot {
            in_flight: self.in_flight.names(),
            pending: self.queue.snapshot(),
        }
    }
}

/// Names of commands awaiting responses and commands waiting to be written.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct QueueSnapshot {
    /// In-flight commands, oldest first.
    pub in_flight: Vec<&'static str>,
    /// Pending commands, head of the queue first.
    pub pending: Vec<&'static str>,
}

impl fmt::Display for QueueSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in flight: [{}], pending: [{}]",
            self.in_flight.join(", "),
            self.pending.join(", ")
        )
    }
}

/// Handle to a running gateway link.
///
/// Dropping the engine cancels its workers without draining the queue; call
/// [`Engine::shutdown`] for an orderly stop.
pub struct Engine {
    shared: Arc<Shared>,
    tracker: TaskTracker,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    keepalive_started: AtomicBool,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("running", &self.is_running())
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Start configuring an engine over a caller-supplied stream.
    #[must_use]
    pub fn builder() -> EngineBuilder { EngineBuilder::new() }

    /// Connect to the gateway, log in and start the keep-alive heartbeat.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::Config`] for an unusable configuration,
    /// [`LinkError::Connect`] or [`LinkError::Tls`] if the link cannot be
    /// opened and [`LinkError::LoginRejected`] if the gateway refuses the
    /// password. A rejected login shuts the engine down before returning.
    pub async fn connect(config: &LinkConfig) -> Result<Self, LinkError> {
        config.validate()?;
        let stream = transport::connect(config).await?;
        let engine = Self::builder()
            .queue_depth(config.max_queue_depth)
            .command_timeout(config.command_timeout())
            .start(stream);
        if let Err(error) = engine.login(&config.password).await {
            engine.shutdown().await;
            return Err(LinkError::LoginRejected(error));
        }
        engine.start_keepalive(config.keepalive_period());
        Ok(engine)
    }

    /// Submit `handle` without waiting for it to finish.
    ///
    /// # Errors
    ///
    /// Returns [`Rejected::QueueFull`] or [`Rejected::ShutDown`], in which
    /// case the command is moved to `ERROR`, or
    /// [`Rejected::AlreadySubmitted`] if the handle has left `CREATED`.
    pub fn submit<C: Command>(&self, handle: &CommandHandle<C>) -> Result<(), Rejected> {
        self.shared.submit(handle.transaction())
    }

    /// Submit `handle` and wait until it completes, fails or times out.
    ///
    /// The deadline is `timeout` if given, otherwise the command's own default,
    /// otherwise the engine's command timeout. On expiry the command is forced
    /// to `ERROR`; it stays in flight so a late response is absorbed.
    ///
    /// A node-specific command that times out this way keeps its node busy:
    /// later session-less commands for the same node are held back (see
    /// [`CONFLICT_RETRY_DELAY`]) until the gateway answers the stale one.
    ///
    /// # Errors
    ///
    /// Returns [`ExecuteError::Rejected`] if the command was not queued,
    /// [`ExecuteError::Failed`] if it reached `ERROR` and
    /// [`ExecuteError::Timeout`] if the deadline passed first.
    pub async fn execute<C: Command>(
        &self,
        handle: &CommandHandle<C>,
        timeout: Option<Duration>,
    ) -> Result<(), ExecuteError> {
        let deadline = timeout
            .or_else(|| handle.default_timeout())
            .unwrap_or_else(|| self.shared.command_timeout());
        self.submit(handle)?;

        let settled = match tokio::time::timeout(deadline, handle.settled()).await {
            Ok(status) => status,
            Err(_) if handle.lifecycle().fail(TIMEOUT_DETAIL) => {
                metrics::inc_timed_out();
                tracing::warn!(
                    command = handle.name(),
                    id = %handle.id(),
                    after_ms = deadline.as_millis(),
                    "command timed out"
                );
                return Err(ExecuteError::Timeout { after: deadline });
            }
            Err(_) => handle.status(),
        };
        match settled {
            CommandStatus::Complete => Ok(()),
            _ => Err(ExecuteError::Failed {
                detail: handle.error_detail().unwrap_or_default(),
            }),
        }
    }

    /// Authenticate the link with `password`.
    ///
    /// # Errors
    ///
    /// Returns the [`ExecuteError`] of the login command. The link stays
    /// unauthenticated on failure.
    pub async fn login(&self, password: &str) -> Result<(), ExecuteError> {
        let handle = CommandHandle::new(Login::new(password));
        self.execute(&handle, None).await?;
        self.shared.authenticated.store(true, Ordering::Release);
        log::info!("gateway login accepted");
        Ok(())
    }

    /// Start the heartbeat, sending the first one immediately.
    ///
    /// Returns `false` if the heartbeat is already running, the engine has
    /// stopped or `period` is zero.
    pub fn start_keepalive(&self, period: Duration) -> bool {
        if period.is_zero() || !self.is_running() {
            return false;
        }
        if self.keepalive_started.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.tracker
            .spawn(keepalive::run(Arc::clone(&self.shared), period));
        true
    }

    /// Register an observer for watched notifications.
    pub fn register_event_observer(&self, observer: impl EventObserver) -> ObserverId {
        self.shared.events.register(Arc::new(observer))
    }

    /// Remove an observer. Returns `false` if it was not registered.
    pub fn deregister_event_observer(&self, id: ObserverId) -> bool {
        self.shared.events.deregister(id)
    }

    /// Whether a login has succeeded on this link.
    #[must_use]
    pub fn is_authenticated(&self) -> bool { self.shared.is_authenticated() }

    /// Whether the engine accepts commands: not shut down and the link is up.
    #[must_use]
    pub fn is_running(&self) -> bool { self.shared.is_running() }

    /// Default `execute` timeout in whole seconds.
    #[must_use]
    pub fn command_timeout(&self) -> u64 { self.shared.command_timeout().as_secs() }

    /// Change the default `execute` timeout.
    pub fn set_command_timeout(&self, secs: u64) {
        self.shared
            .command_timeout_ms
            .store(secs.saturating_mul(1000), Ordering::Relaxed);
    }

    /// Names of in-flight and pending commands.
    #[must_use]
    pub fn queue_snapshot(&self) -> QueueSnapshot { self.shared.snapshot() }

    /// Receiver yielding the first unrecoverable link condition.
    #[must_use]
    pub fn link_down(&self) -> watch::Receiver<Option<LinkDown>> {
        self.shared.link_down.subscribe()
    }

    /// Stop the engine.
    ///
    /// Commands already queued are written first; the dispatcher then closes
    /// the write half and the matcher is cancelled. If the gateway stops
    /// accepting writes, draining is cut off after [`SHUTDOWN_DRAIN_TIMEOUT`]
    /// and the command being written is failed. Anything still queued or in
    /// flight afterwards is failed. Calling this more than once is a no-op.
    pub async fn shutdown(&self) {
        if !self.shared.running.swap(false, Ordering::AcqRel) {
            return;
        }
        log::info!("gateway engine shutting down");
        self.shared.queue.terminate();
        let dispatcher = self.dispatcher.lock().expect("lock poisoned").take();
        if let Some(mut dispatcher) = dispatcher {
            let joined =
                match tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, &mut dispatcher).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        tracing::warn!(
                            timeout = ?SHUTDOWN_DRAIN_TIMEOUT,
                            "gateway is not accepting writes, abandoning queued commands"
                        );
                        self.shared.shutdown.cancel();
                        dispatcher.await
                    }
                };
            if let Err(error) = joined {
                tracing::error!(%error, "request dispatcher task failed");
            }
        }
        self.shared.shutdown.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        for command in self.shared.queue.drain() {
            command.lifecycle().fail(SHUTDOWN_DETAIL);
        }
        for name in self.shared.in_flight.names() {
            tracing::debug!(command = name, "abandoning in-flight command");
        }
        self.shared.in_flight.fail_all(SHUTDOWN_DETAIL);
        log::info!("gateway engine stopped");
    }
}

impl Drop for Engine {
    fn drop(&mut self) { self.shared.shutdown.cancel(); }
}
