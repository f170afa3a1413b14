//! Gateway frame model and checksum handling.
//!
//! Every unit exchanged with the gateway is a single frame:
//!
//! ```text
//! [START_MARKER][LEN][TYPE][PAYLOAD ...][CHECKSUM]
//! ```
//!
//! `LEN` is the total frame length including the marker and the checksum.
//! The checksum byte makes the sum of every byte in the frame a multiple of
//! 256. Frames of five or six bytes are *confirm* frames, seven byte frames are
//! *ack* frames and everything else is a plain data frame.
//!
//! [`Frame::encode`] and [`Frame::decode`] are pure functions over complete
//! frames. [`GatewayCodec`] adapts them to a byte stream and resynchronises on
//! the start marker after corruption.

use bytes::{BufMut, Bytes, BytesMut};
use static_assertions::const_assert;

mod codec;
pub mod codes;
mod error;

pub use codec::{Decoded, GatewayCodec};
pub use codes::{ErrorReason, FrameCode};
pub use error::FrameError;

/// First byte of every frame.
pub const START_MARKER: u8 = 0xAA;

/// Bytes surrounding the payload: marker, length, type and checksum.
pub const FRAME_OVERHEAD: usize = 4;

/// Smallest well-formed frame (empty payload).
pub const MIN_FRAME_LEN: usize = FRAME_OVERHEAD;

/// Largest frame the single length byte can describe.
pub const MAX_FRAME_LEN: usize = u8::MAX as usize;

/// Largest payload that fits in a frame.
pub const MAX_PAYLOAD_LEN: usize = MAX_FRAME_LEN - FRAME_OVERHEAD;

/// Total length of an ack frame.
pub const ACK_FRAME_LEN: usize = 7;

const_assert!(ACK_FRAME_LEN <= MAX_FRAME_LEN);
const_assert!(MIN_FRAME_LEN < ACK_FRAME_LEN);

/// Structural class of a frame, derived from its total length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameShape {
    /// Short acknowledgement used by connectivity checks (5 or 6 bytes).
    Confirm,
    /// Ordinary command result (7 bytes).
    Ack,
    /// Any other frame, typically a notification carrying data.
    Data,
}

impl FrameShape {
    /// Classify a frame by its total encoded length.
    #[must_use]
    pub fn classify(frame_len: usize) -> Self {
        match frame_len {
            5 | 6 => Self::Confirm,
            ACK_FRAME_LEN => Self::Ack,
            _ => Self::Data,
        }
    }
}

/// Compute the checksum byte for the bytes preceding it.
///
/// ```
/// use gatewire::frame::checksum;
///
/// assert_eq!(checksum(&[]), 0);
/// assert_eq!(checksum(&[0x01]), 0xFF);
/// assert_eq!(checksum(&[0xAA, 0x04, 0x01]), 0x51);
/// ```
#[must_use]
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes
        .iter()
        .fold(0u8, |sum, byte| sum.wrapping_add(*byte))
        .wrapping_neg()
}

/// A single decoded gateway frame.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Frame {
    code: FrameCode,
    payload: Bytes,
}

impl Frame {
    /// Build a frame from a code and payload.
    #[must_use]
    pub fn new(code: FrameCode, payload: impl Into<Bytes>) -> Self {
        Self {
            code,
            payload: payload.into(),
        }
    }

    /// Build a five byte confirm frame carrying a status byte.
    #[must_use]
    pub fn confirm(code: FrameCode, status: u8) -> Self { Self::new(code, vec![status]) }

    /// Build a seven byte ack frame for `node` with an optional session.
    #[must_use]
    pub fn ack(code: FrameCode, status: u8, node: u8, session: u8) -> Self {
        Self::new(code, vec![status, node, session])
    }

    /// Frame code (the type byte).
    #[must_use]
    pub fn code(&self) -> FrameCode { self.code }

    /// Payload bytes between the type byte and the checksum.
    #[must_use]
    pub fn payload(&self) -> &[u8] { &self.payload }

    /// Status byte of a confirm or ack frame.
    #[must_use]
    pub fn status(&self) -> Option<u8> { self.payload.first().copied() }

    /// Node addressed by an ack frame.
    #[must_use]
    pub fn node(&self) -> Option<u8> {
        match self.shape() {
            FrameShape::Ack => self.payload.get(1).copied(),
            FrameShape::Confirm | FrameShape::Data => None,
        }
    }

    /// Total encoded length including marker and checksum.
    #[must_use]
    pub fn encoded_len(&self) -> usize { self.payload.len() + FRAME_OVERHEAD }

    /// Structural class of this frame.
    #[must_use]
    pub fn shape(&self) -> FrameShape { FrameShape::classify(self.encoded_len()) }

    /// Encode the frame into a standalone buffer.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLong`] if the payload does not fit in
    /// a single frame.
    pub fn encode(&self) -> Result<Bytes, FrameError> {
        let mut dst = BytesMut::with_capacity(self.encoded_len());
        self.encode_into(&mut dst)?;
        Ok(dst.freeze())
    }

    /// Append the encoded frame to `dst`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::PayloadTooLong`] if the payload does not fit in
    /// a single frame.
    pub fn encode_into(&self, dst: &mut BytesMut) -> Result<(), FrameError> {
        let len = u8::try_from(self.encoded_len()).map_err(|_| FrameError::PayloadTooLong {
            len: self.payload.len(),
            max: MAX_PAYLOAD_LEN,
        })?;
        let start = dst.len();
        dst.reserve(self.encoded_len());
        dst.put_u8(START_MARKER);
        dst.put_u8(len);
        dst.put_u8(self.code.as_u8());
        dst.put_slice(&self.payload);
        let sum = checksum(&dst[start..]);
        dst.put_u8(sum);
        Ok(())
    }

    /// Decode exactly one complete frame.
    ///
    /// The slice must contain the whole frame and nothing else.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] describing the first structural problem found:
    /// a wrong start marker, a declared length that disagrees with the slice,
    /// a frame shorter than the minimum, or a checksum mismatch.
    pub fn decode(bytes: &[u8]) -> Result<Self, FrameError> {
        let (&marker, rest) = bytes.split_first().ok_or(FrameError::Truncated {
            have: 0,
            need: MIN_FRAME_LEN,
        })?;
        if marker != START_MARKER {
            return Err(FrameError::BadStartMarker { found: marker });
        }
        if bytes.len() < MIN_FRAME_LEN {
            return Err(FrameError::Truncated {
                have: bytes.len(),
                need: MIN_FRAME_LEN,
            });
        }
        let declared = usize::from(rest[0]);
        if declared != bytes.len() {
            return Err(FrameError::LengthMismatch {
                declared,
                actual: bytes.len(),
            });
        }
        let (body, trailer) = bytes.split_at(bytes.len() - 1);
        let expected = checksum(body);
        if trailer[0] != expected {
            return Err(FrameError::ChecksumMismatch {
                expected,
                actual: trailer[0],
            });
        }
        Ok(Self {
            code: FrameCode::new(body[2]),
            payload: Bytes::copy_from_slice(&body[3..]),
        })
    }
}

#[cfg(test)]
mod tests;
