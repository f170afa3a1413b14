//! Errors raised while encoding or validating frames.

use thiserror::Error;

/// Structural problems with a frame.
///
/// None of these are fatal to a link: the response matcher logs and drops
/// the offending bytes and keeps reading.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The first byte was not the start marker.
    #[error("bad start marker 0x{found:02X}")]
    BadStartMarker {
        /// Byte found where the marker was expected.
        found: u8,
    },

    /// Fewer bytes than a complete frame requires.
    #[error("truncated frame: have {have}, need {need}")]
    Truncated {
        /// Bytes available.
        have: usize,
        /// Bytes required.
        need: usize,
    },

    /// The length byte disagrees with the number of bytes supplied.
    #[error("declared length {declared} does not match frame length {actual}")]
    LengthMismatch {
        /// Length carried in the frame.
        declared: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// The length byte describes a frame shorter than the minimum.
    #[error("declared length {declared} is below the minimum frame length")]
    LengthOutOfRange {
        /// Length carried in the frame.
        declared: usize,
    },

    /// Checksum byte did not match the frame contents.
    #[error("frame checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch {
        /// Checksum computed from the frame.
        expected: u8,
        /// Checksum carried in the frame.
        actual: u8,
    },

    /// Bytes preceding a start marker were discarded.
    #[error("skipped {skipped} bytes while resynchronising on the start marker")]
    Resynchronised {
        /// Number of discarded bytes.
        skipped: usize,
    },

    /// The payload does not fit in a single frame.
    #[error("payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLong {
        /// Payload length.
        len: usize,
        /// Largest payload a frame can carry.
        max: usize,
    },
}

impl From<FrameError> for std::io::Error {
    fn from(error: FrameError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidData, error)
    }
}
