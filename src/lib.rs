#![doc(html_root_url = "https://docs.rs/gatewire/latest")]
//! Public API for the `gatewire` library.
//!
//! `gatewire` correlates commands and responses on a single half-duplex
//! gateway link. Callers submit [`Command`]s through an [`Engine`], which
//! writes them one at a time, matches the frames that come back and forwards
//! unsolicited device notifications to registered observers.

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame;
mod in_flight;
pub mod metrics;
pub mod panic;
mod queue;
pub mod transport;

pub use command::{
    Command,
    CommandError,
    CommandHandle,
    CommandId,
    CommandProfile,
    CommandStatus,
    ConnectivityCheck,
    Login,
    NodeId,
    Progress,
};
pub use config::{ConfigError, LinkConfig};
pub use engine::{Engine, EngineBuilder, QueueSnapshot};
pub use error::{ExecuteError, LinkDown, LinkError, Rejected};
pub use events::{EventObserver, ObserverError, ObserverId};
pub use frame::{Frame, FrameCode, FrameError};
