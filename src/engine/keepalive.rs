//! Periodic heartbeat keeping the gateway from closing an idle link.

use std::{sync::Arc, time::Duration};

use tokio::time::MissedTickBehavior;

use super::Shared;
use crate::{
    command::{CommandHandle, ConnectivityCheck},
    error::Rejected,
};

/// Submit a connectivity check every `period`, the first one immediately.
///
/// Heartbeats go through the ordinary queue and are fire-and-forget; a
/// rejected heartbeat is logged and the next tick tries again.
pub(super) async fn run(shared: Arc<Shared>, period: Duration) {
    let mut ticks = tokio::time::interval(period);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => break,
            _ = ticks.tick() => {}
        }
        let heartbeat = CommandHandle::new(ConnectivityCheck::new());
        match shared.submit(heartbeat.transaction()) {
            Ok(()) => tracing::trace!(id = %heartbeat.id(), "heartbeat queued"),
            Err(Rejected::ShutDown) => break,
            Err(rejected) => tracing::warn!(%rejected, "heartbeat not queued"),
        }
    }
    tracing::debug!("keep-alive stopped");
}
