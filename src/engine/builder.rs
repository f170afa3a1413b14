//! Builder for [`Engine`].

use std::{
    sync::{
        Arc,
        Mutex,
        atomic::{AtomicBool, AtomicU64},
    },
    time::Duration,
};

use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::watch,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use super::{Engine, Shared, dispatcher, matcher};
use crate::{
    config::{DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_QUEUE_DEPTH},
    events::EventFanout,
    frame::{FrameCode, codes},
    in_flight::InFlightSet,
    queue::PendingQueue,
};

/// Configures and starts an [`Engine`] over any byte stream.
///
/// ```
/// use std::time::Duration;
///
/// use gatewire::Engine;
///
/// # #[tokio::main]
/// # async fn main() {
/// let (stream, _gateway) = tokio::io::duplex(4096);
/// let engine = Engine::builder()
///     .queue_depth(5)
///     .command_timeout(Duration::from_secs(10))
///     .start(stream);
/// assert!(engine.is_running());
/// assert_eq!(engine.command_timeout(), 10);
/// engine.shutdown().await;
/// assert!(!engine.is_running());
/// # }
/// ```
#[derive(Clone, Debug)]
#[must_use]
pub struct EngineBuilder {
    queue_depth: usize,
    command_timeout: Duration,
    watch_list: Vec<FrameCode>,
    authenticated: bool,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            command_timeout: Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS),
            watch_list: codes::DEFAULT_WATCH_LIST.to_vec(),
            authenticated: false,
        }
    }
}

impl EngineBuilder {
    /// Builder with the gateway defaults.
    pub fn new() -> Self { Self::default() }

    /// Capacity of the pending queue. Values below one are raised to one.
    pub fn queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    /// Default `execute` timeout.
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Notification codes forwarded to event observers.
    pub fn watch_list(mut self, codes: impl IntoIterator<Item = FrameCode>) -> Self {
        self.watch_list = codes.into_iter().collect();
        self
    }

    /// Treat the link as already authenticated, for streams that were
    /// authenticated before being handed over.
    pub fn authenticated(mut self, authenticated: bool) -> Self {
        self.authenticated = authenticated;
        self
    }

    /// Split `stream` and spawn the dispatcher and matcher on the current
    /// Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start<S>(self, stream: S) -> Engine
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (link_down, _) = watch::channel(None);
        let timeout_ms = u64::try_from(self.command_timeout.as_millis()).unwrap_or(u64::MAX);
        let shared = Arc::new(Shared {
            queue: PendingQueue::new(self.queue_depth),
            in_flight: InFlightSet::new(),
            events: EventFanout::new(self.watch_list),
            authenticated: AtomicBool::new(self.authenticated),
            running: AtomicBool::new(true),
            command_timeout_ms: AtomicU64::new(timeout_ms),
            link_down,
            shutdown: CancellationToken::new(),
        });

        let (reader, writer) = tokio::io::split(stream);
        let tracker = TaskTracker::new();
        let dispatcher = tracker.spawn(dispatcher::run(Arc::clone(&shared), writer));
        tracker.spawn(matcher::run(Arc::clone(&shared), reader));
        log::info!(
            "gateway engine started: queue_depth={}, command_timeout_ms={timeout_ms}",
            shared.queue.capacity()
        );

        Engine {
            shared,
            tracker,
            dispatcher: Mutex::new(Some(dispatcher)),
            keepalive_started: AtomicBool::new(false),
        }
    }
}
