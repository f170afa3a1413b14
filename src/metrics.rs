//! Metric helpers for `gatewire`.
//!
//! This module defines metric names and simple helper functions wrapping the
//! [`metrics`](https://docs.rs/metrics) crate. Without the `metrics` feature
//! every helper compiles to nothing.

#[cfg(feature = "metrics")]
use metrics::{counter, gauge};

/// Name of the counter tracking commands written to the gateway.
pub const COMMANDS_DISPATCHED: &str = "gatewire_commands_dispatched_total";
/// Name of the counter tracking same-node requeues.
pub const COMMANDS_REQUEUED: &str = "gatewire_commands_requeued_total";
/// Name of the counter tracking `execute` calls that hit their deadline.
pub const COMMANDS_TIMED_OUT: &str = "gatewire_commands_timed_out_total";
/// Name of the counter tracking decoded frames.
pub const FRAMES_RECEIVED: &str = "gatewire_frames_received_total";
/// Name of the counter tracking frames the decoder refused.
pub const FRAMES_REJECTED: &str = "gatewire_frames_rejected_total";
/// Name of the counter tracking frames no command or observer wanted.
pub const FRAMES_UNMATCHED: &str = "gatewire_frames_unmatched_total";
/// Name of the gauge tracking commands awaiting responses.
pub const COMMANDS_IN_FLIGHT: &str = "gatewire_commands_in_flight";

/// Record a command written to the gateway.
pub fn inc_dispatched() {
    #[cfg(feature = "metrics")]
    counter!(COMMANDS_DISPATCHED).increment(1);
}

/// Record a command pushed back because its node was busy.
pub fn inc_requeued() {
    #[cfg(feature = "metrics")]
    counter!(COMMANDS_REQUEUED).increment(1);
}

/// Record an `execute` deadline expiring.
pub fn inc_timed_out() {
    #[cfg(feature = "metrics")]
    counter!(COMMANDS_TIMED_OUT).increment(1);
}

/// Record a decoded frame.
pub fn inc_frames_received() {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_RECEIVED).increment(1);
}

/// Record a frame rejected by the decoder.
pub fn inc_frames_rejected() {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_REJECTED).increment(1);
}

/// Record a frame nobody claimed.
pub fn inc_frames_unmatched() {
    #[cfg(feature = "metrics")]
    counter!(FRAMES_UNMATCHED).increment(1);
}

/// Publish the number of in-flight commands.
#[cfg_attr(not(feature = "metrics"), allow(unused_variables))]
#[allow(clippy::cast_precision_loss)]
pub fn set_in_flight(count: usize) {
    #[cfg(feature = "metrics")]
    gauge!(COMMANDS_IN_FLIGHT).set(count as f64);
}
