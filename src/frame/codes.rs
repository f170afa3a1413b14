//! Registry of known frame codes.
//!
//! Codes are plain bytes on the wire. The registry is a compile-time table so
//! diagnostics can name a code without any runtime registration step.

use std::fmt;

/// The type byte of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameCode(u8);

impl FrameCode {
    /// Wrap a raw type byte.
    #[must_use]
    pub const fn new(code: u8) -> Self { Self(code) }

    /// Return the raw type byte.
    #[must_use]
    pub const fn as_u8(self) -> u8 { self.0 }

    /// Diagnostic name for known codes.
    #[must_use]
    pub fn name(self) -> Option<&'static str> {
        KNOWN_CODES
            .iter()
            .find(|(code, _)| *code == self)
            .map(|(_, name)| *name)
    }
}

impl From<u8> for FrameCode {
    fn from(value: u8) -> Self { Self(value) }
}

impl fmt::Display for FrameCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}(0x{:02X})", self.0),
            None => write!(f, "0x{:02X}", self.0),
        }
    }
}

/// General error notification raised by the gateway.
pub const ERROR_NTF: FrameCode = FrameCode(0x00);
/// Connectivity check request.
pub const GET_STATE_REQ: FrameCode = FrameCode(0x0C);
/// Connectivity check confirm.
pub const GET_STATE_CFM: FrameCode = FrameCode(0x0D);
/// Node information changed notification.
pub const NODE_INFORMATION_CHANGED_NTF: FrameCode = FrameCode(0x20);
/// Node state or position changed notification.
pub const NODE_STATE_POSITION_CHANGED_NTF: FrameCode = FrameCode(0x21);
/// Password (login) request.
pub const PASSWORD_ENTER_REQ: FrameCode = FrameCode(0x30);
/// Password (login) confirm.
pub const PASSWORD_ENTER_CFM: FrameCode = FrameCode(0x31);

const KNOWN_CODES: &[(FrameCode, &str)] = &[
    (ERROR_NTF, "ERROR_NTF"),
    (GET_STATE_REQ, "GET_STATE_REQ"),
    (GET_STATE_CFM, "GET_STATE_CFM"),
    (NODE_INFORMATION_CHANGED_NTF, "NODE_INFORMATION_CHANGED_NTF"),
    (NODE_STATE_POSITION_CHANGED_NTF, "NODE_STATE_POSITION_CHANGED_NTF"),
    (PASSWORD_ENTER_REQ, "PASSWORD_ENTER_REQ"),
    (PASSWORD_ENTER_CFM, "PASSWORD_ENTER_CFM"),
];

/// Notification codes treated as unsolicited device events by default.
pub const DEFAULT_WATCH_LIST: &[FrameCode] =
    &[NODE_INFORMATION_CHANGED_NTF, NODE_STATE_POSITION_CHANGED_NTF];

/// Reason carried by an [`ERROR_NTF`] frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ErrorReason {
    #[error("not further defined error")]
    Undefined,
    #[error("unknown command or command not accepted in this state")]
    UnknownCommand,
    #[error("error on frame structure")]
    FrameStructure,
    #[error("busy, try again later")]
    Busy,
    #[error("bad system table index")]
    BadSystemTableIndex,
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("unknown error code {0}")]
    Unknown(u8),
}

impl From<u8> for ErrorReason {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Undefined,
            1 => Self::UnknownCommand,
            2 => Self::FrameStructure,
            7 => Self::Busy,
            8 => Self::BadSystemTableIndex,
            12 => Self::NotAuthenticated,
            other => Self::Unknown(other),
        }
    }
}

impl ErrorReason {
    /// Decode the reason from an error notification payload.
    ///
    /// An empty payload is reported as [`ErrorReason::Undefined`].
    #[must_use]
    pub fn from_payload(payload: &[u8]) -> Self {
        payload.first().copied().map_or(Self::Undefined, Self::from)
    }
}
