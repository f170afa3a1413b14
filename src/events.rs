//! Fan-out of unsolicited gateway notifications.
//!
//! Frames whose code is on the watch list are handed to every registered
//! observer, in registration order, on the response matcher's task. Each
//! observer call is isolated: an observer that returns an error or panics is
//! logged and skipped, and the remaining observers still see the frame.

use std::{
    fmt,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc,
        RwLock,
        atomic::{AtomicU64, Ordering},
    },
};

use crate::{
    frame::{Frame, FrameCode, codes},
    panic::PanicMessage,
};

/// Error type observers may return.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Receiver of watched notification frames.
///
/// Observers run inline on the matcher task and must return quickly; a slow
/// observer delays the matching of every later frame.
///
/// Closures of the right shape implement the trait:
///
/// ```
/// use gatewire::{events::EventObserver, frame::Frame};
///
/// fn assert_observer(_: impl EventObserver) {}
/// assert_observer(|frame: &Frame| -> Result<(), gatewire::events::ObserverError> {
///     println!("event {}", frame.code());
///     Ok(())
/// });
/// ```
pub trait EventObserver: Send + Sync + 'static {
    /// Handle one watched frame.
    ///
    /// # Errors
    ///
    /// Any error is logged by the engine; it does not affect other observers.
    fn on_event(&self, frame: &Frame) -> Result<(), ObserverError>;
}

impl<F> EventObserver for F
where
    F: Fn(&Frame) -> Result<(), ObserverError> + Send + Sync + 'static,
{
    fn on_event(&self, frame: &Frame) -> Result<(), ObserverError> { self(frame) }
}

/// Registration token returned by [`crate::Engine::register_event_observer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "ObserverId({})", self.0) }
}

type Registered = (ObserverId, Arc<dyn EventObserver>);

pub(crate) struct EventFanout {
    watch_list: Vec<FrameCode>,
    observers: RwLock<Vec<Registered>>,
    next_id: AtomicU64,
}

impl Default for EventFanout {
    fn default() -> Self { Self::new(codes::DEFAULT_WATCH_LIST.to_vec()) }
}

impl EventFanout {
    pub(crate) fn new(watch_list: Vec<FrameCode>) -> Self {
        Self {
            watch_list,
            observers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub(crate) fn is_watched(&self, code: FrameCode) -> bool { self.watch_list.contains(&code) }

    pub(crate) fn watch_list(&self) -> &[FrameCode] { &self.watch_list }

    pub(crate) fn register(&self, observer: Arc<dyn EventObserver>) -> ObserverId {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.observers
            .write()
            .expect("lock poisoned")
            .push((id, observer));
        id
    }

    /// Remove an observer. Returns `false` if `id` was not registered.
    pub(crate) fn deregister(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write().expect("lock poisoned");
        let before = observers.len();
        observers.retain(|(registered, _)| *registered != id);
        observers.len() != before
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.observers.read().expect("lock poisoned").len()
    }

    /// Deliver `frame` to every observer registered at the time of the call.
    ///
    /// The registry lock is released before observers run, so an observer may
    /// register or deregister observers without deadlocking.
    pub(crate) fn notify(&self, frame: &Frame) {
        let observers: Vec<Registered> = self.observers.read().expect("lock poisoned").clone();
        for (id, observer) in observers {
            match catch_unwind(AssertUnwindSafe(|| observer.on_event(frame))) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::warn!(
                        observer = %id,
                        code = %frame.code(),
                        %error,
                        "event observer failed"
                    );
                }
                Err(payload) => {
                    let message = PanicMessage::new(payload);
                    tracing::error!(
                        observer = %id,
                        code = %frame.code(),
                        panic = %message,
                        "event observer panicked"
                    );
                }
            }
        }
    }
}
