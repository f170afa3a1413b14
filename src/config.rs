//! Link configuration.
//!
//! [`LinkConfig`] carries the options recognised when connecting to a
//! gateway. Loading it from a file is left to the embedding application; the
//! type derives `Deserialize` with every field defaulted so partial documents
//! work.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// TLS port the gateway listens on.
pub const DEFAULT_PORT: u16 = 51200;
/// Default `execute` timeout in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 60;
/// Default heartbeat period in minutes.
pub const DEFAULT_KEEPALIVE_MINUTES: u64 = 10;
/// Default pending queue capacity.
pub const DEFAULT_QUEUE_DEPTH: usize = 20;

/// Problems found by [`LinkConfig::validate`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// No host was given.
    #[error("gateway host must not be empty")]
    EmptyHost,
    /// Port zero cannot be dialled.
    #[error("gateway port must not be zero")]
    ZeroPort,
    /// A zero timeout would fail every command immediately.
    #[error("command timeout must be at least one second")]
    ZeroTimeout,
    /// A zero period would flood the gateway with heartbeats.
    #[error("keep-alive period must be at least one minute")]
    ZeroKeepalive,
    /// A zero-depth queue rejects every submission.
    #[error("queue depth must be at least one")]
    ZeroQueueDepth,
}

/// Options for connecting to a gateway.
///
/// ```
/// use gatewire::config::{DEFAULT_PORT, LinkConfig};
///
/// let config = LinkConfig {
///     host: "192.168.1.40".into(),
///     password: "velux123".into(),
///     ..LinkConfig::default()
/// };
/// assert_eq!(config.port, DEFAULT_PORT);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LinkConfig {
    /// Host name or address of the gateway.
    pub host: String,
    /// TLS port.
    pub port: u16,
    /// Gateway password.
    pub password: String,
    /// Default `execute` timeout, in seconds.
    pub command_timeout_secs: u64,
    /// Heartbeat period, in minutes.
    pub keepalive_minutes: u64,
    /// Pending queue capacity.
    pub max_queue_depth: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            password: String::new(),
            command_timeout_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            keepalive_minutes: DEFAULT_KEEPALIVE_MINUTES,
            max_queue_depth: DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl std::fmt::Debug for LinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("password", &"<redacted>")
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("keepalive_minutes", &self.keepalive_minutes)
            .field("max_queue_depth", &self.max_queue_depth)
            .finish()
    }
}

impl LinkConfig {
    /// Check every option is usable.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.port == 0 {
            return Err(ConfigError::ZeroPort);
        }
        if self.command_timeout_secs == 0 {
            return Err(ConfigError::ZeroTimeout);
        }
        if self.keepalive_minutes == 0 {
            return Err(ConfigError::ZeroKeepalive);
        }
        if self.max_queue_depth == 0 {
            return Err(ConfigError::ZeroQueueDepth);
        }
        Ok(())
    }

    /// Default `execute` timeout.
    #[must_use]
    pub fn command_timeout(&self) -> Duration { Duration::from_secs(self.command_timeout_secs) }

    /// Heartbeat period.
    #[must_use]
    pub fn keepalive_period(&self) -> Duration {
        Duration::from_secs(self.keepalive_minutes.saturating_mul(60))
    }

    /// `host:port` string used to dial the gateway.
    #[must_use]
    pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
