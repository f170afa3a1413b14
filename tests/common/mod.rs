//! Shared utilities for integration tests.

// Items in this shared module may not be used by all test binaries that import it.
#![allow(
    dead_code,
    reason = "shared test utilities are not used by all test binaries"
)]

use gatewire::{CommandHandle, Engine};
use gatewire_testing::NodeCommand;

/// Submit one [`NodeCommand`] per entry in `nodes`, in order.
///
/// # Panics
///
/// Panics if any submission is rejected.
pub fn submit_nodes(engine: &Engine, nodes: &[u8]) -> Vec<CommandHandle<NodeCommand>> {
    nodes
        .iter()
        .map(|node| {
            let handle = CommandHandle::new(NodeCommand::new(*node));
            engine.submit(&handle).expect("command queued");
            handle
        })
        .collect()
}
