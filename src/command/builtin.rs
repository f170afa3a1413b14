//! Commands the engine itself needs: connectivity check and login.

use std::time::Duration;

use super::{Command, CommandError, CommandProfile, Progress};
use crate::frame::{Frame, FrameShape, codes};

/// Default timeout of a [`ConnectivityCheck`].
pub const CONNECTIVITY_CHECK_TIMEOUT: Duration = Duration::from_millis(1000);

/// Longest password the gateway accepts.
pub const MAX_PASSWORD_LEN: usize = 32;

/// Status byte reported by a successful confirm or ack.
const STATUS_OK: u8 = 0;

/// Asks the gateway for its state and expects a short confirm frame.
///
/// Also used as the keep-alive heartbeat.
#[derive(Clone, Debug, Default)]
pub struct ConnectivityCheck {
    state: Option<u8>,
}

impl ConnectivityCheck {
    /// Create a new connectivity check.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Gateway state byte, once the confirm has arrived.
    #[must_use]
    pub fn gateway_state(&self) -> Option<u8> { self.state }
}

impl Command for ConnectivityCheck {
    fn name(&self) -> &'static str { "ConnectivityCheck" }

    fn profile(&self) -> CommandProfile { CommandProfile::gateway() }

    fn default_timeout(&self) -> Option<Duration> { Some(CONNECTIVITY_CHECK_TIMEOUT) }

    fn request(&self) -> Frame { Frame::new(codes::GET_STATE_REQ, Vec::new()) }

    fn matches(&self, frame: &Frame) -> bool {
        frame.code() == codes::GET_STATE_CFM && frame.shape() == FrameShape::Confirm
    }

    fn on_frame(&mut self, frame: &Frame) -> Progress {
        self.state = frame.status();
        Progress::Complete
    }
}

/// Authenticates the link with the gateway password.
#[derive(Clone)]
pub struct Login {
    password: String,
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login").finish_non_exhaustive()
    }
}

impl Login {
    /// Create a login command for `password`.
    #[must_use]
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
        }
    }
}

impl Command for Login {
    fn name(&self) -> &'static str { "Login" }

    fn profile(&self) -> CommandProfile { CommandProfile::gateway() }

    fn validate(&self) -> Result<(), CommandError> {
        let len = self.password.len();
        if len == 0 {
            return Err(CommandError::Invalid("password is empty".into()));
        }
        if len > MAX_PASSWORD_LEN {
            return Err(CommandError::Invalid(format!(
                "password is {len} bytes, at most {MAX_PASSWORD_LEN} are allowed"
            )));
        }
        Ok(())
    }

    fn request(&self) -> Frame {
        let mut payload = vec![0u8; MAX_PASSWORD_LEN];
        let bytes = self.password.as_bytes();
        let len = bytes.len().min(MAX_PASSWORD_LEN);
        payload[..len].copy_from_slice(&bytes[..len]);
        Frame::new(codes::PASSWORD_ENTER_REQ, payload)
    }

    fn matches(&self, frame: &Frame) -> bool {
        frame.code() == codes::PASSWORD_ENTER_CFM && frame.shape() == FrameShape::Ack
    }

    fn on_frame(&mut self, frame: &Frame) -> Progress {
        match frame.status() {
            Some(STATUS_OK) => Progress::Complete,
            Some(status) => Progress::Failed(format!("password rejected (status {status})")),
            None => Progress::Failed("password confirm carried no status".into()),
        }
    }
}
