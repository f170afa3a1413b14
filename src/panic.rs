//! Helpers for reporting caught panic payloads.
//!
//! Observers run inside `catch_unwind`; the payload they leave behind is
//! rendered through [`PanicMessage`] when the failure is logged.

use std::{any::Any, fmt};

/// Displayable wrapper around a panic payload.
///
/// String payloads (from `panic!("...")` with or without formatting) are shown
/// verbatim; anything else is reported as an opaque payload.
///
/// ```
/// use gatewire::panic::PanicMessage;
///
/// let caught = std::panic::catch_unwind(|| panic!("observer {} failed", 7)).unwrap_err();
/// assert_eq!(PanicMessage::new(caught).to_string(), "observer 7 failed");
///
/// let opaque = PanicMessage::new(Box::new(5_u32));
/// assert_eq!(opaque.as_str(), None);
/// assert_eq!(opaque.to_string(), "<non-string panic payload>");
/// ```
#[derive(Debug)]
#[must_use]
pub struct PanicMessage(Box<dyn Any + Send>);

impl PanicMessage {
    /// Wrap a payload returned by `catch_unwind`.
    pub fn new(payload: Box<dyn Any + Send>) -> Self { Self(payload) }

    /// The panic message, if the payload was a string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.0
            .downcast_ref::<String>()
            .map(String::as_str)
            .or_else(|| self.0.downcast_ref::<&'static str>().copied())
    }
}

impl fmt::Display for PanicMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str().unwrap_or("<non-string panic payload>"))
    }
}
