//! Command line interface for the `gatewire` link checker.
//!
//! The binary connects to a gateway, logs in and runs connectivity checks.
//! This file is also compiled by the build script to render the man page, so
//! it only depends on `clap` and the standard library.

use clap::Parser;

/// Command line arguments for the `gatewire` binary.
#[derive(Debug, Parser)]
#[command(name = "gatewire", version, about = "Check a gateway link")]
pub struct Cli {
    /// Host name or address of the gateway.
    #[arg(long)]
    pub host: String,
    /// TLS port of the gateway.
    #[arg(long, default_value_t = 51200)]
    pub port: u16,
    /// Gateway password.
    #[arg(long)]
    pub password: String,
    /// Default command timeout in seconds.
    #[arg(long, default_value_t = 60)]
    pub timeout: u64,
    /// Heartbeat period in minutes.
    #[arg(long, default_value_t = 10)]
    pub keepalive: u64,
    /// Maximum number of queued commands.
    #[arg(long, default_value_t = 20)]
    pub queue_depth: usize,
    /// Number of connectivity checks to run before disconnecting.
    #[arg(short = 'n', long, default_value_t = 1)]
    pub checks: u32,
}
