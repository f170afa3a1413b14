//! Streaming codec splitting the gateway byte stream into frames.

use std::io;

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{Frame, FrameError, MIN_FRAME_LEN, START_MARKER};

/// Outcome of decoding one unit from the stream.
///
/// Corrupt input is reported as [`Decoded::Rejected`] rather than as a
/// decoder error: a decoder error terminates a `FramedRead`, whereas a
/// rejected frame only needs to be logged and dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decoded {
    /// A frame that passed structural and checksum validation.
    Frame(Frame),
    /// Bytes that were discarded, with the reason.
    Rejected(FrameError),
}

/// Tokio codec for gateway frames.
///
/// The decoder skips bytes until it finds a start marker, waits for the full
/// declared length and then validates the frame. A frame that fails
/// validation, or whose declared length is below the minimum, consumes only
/// its marker so the next marker can be found. While waiting for a long
/// declared length, a complete valid frame further along the buffer wins and
/// the bytes before it are skipped.
#[derive(Clone, Copy, Debug, Default)]
pub struct GatewayCodec;

impl GatewayCodec {
    /// Create a new codec.
    #[must_use]
    pub fn new() -> Self { Self }
}

impl Decoder for GatewayCodec {
    type Item = Decoded;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(start) = src.iter().position(|byte| *byte == START_MARKER) else {
            if src.is_empty() {
                return Ok(None);
            }
            let skipped = src.len();
            src.clear();
            return Ok(Some(Decoded::Rejected(FrameError::Resynchronised { skipped })));
        };
        if start > 0 {
            src.advance(start);
            return Ok(Some(Decoded::Rejected(FrameError::Resynchronised {
                skipped: start,
            })));
        }

        let Some(&len) = src.get(1) else {
            return Ok(None);
        };
        let declared = usize::from(len);
        if declared < MIN_FRAME_LEN {
            src.advance(1);
            return Ok(Some(Decoded::Rejected(FrameError::LengthOutOfRange {
                declared,
            })));
        }
        if src.len() < declared {
            // A corrupted length byte would otherwise hold back every frame
            // that arrives behind it.
            if let Some(skipped) = embedded_frame_start(src) {
                src.advance(skipped);
                return Ok(Some(Decoded::Rejected(FrameError::Resynchronised {
                    skipped,
                })));
            }
            src.reserve(declared - src.len());
            return Ok(None);
        }

        match Frame::decode(&src[..declared]) {
            Ok(frame) => {
                src.advance(declared);
                Ok(Some(Decoded::Frame(frame)))
            }
            Err(error) => {
                // Only the marker is consumed; the span may hold valid frames.
                src.advance(1);
                Ok(Some(Decoded::Rejected(error)))
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(src)? {
            return Ok(Some(item));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let have = src.len();
        let need = src.get(1).map_or(MIN_FRAME_LEN, |len| usize::from(*len));
        src.clear();
        tracing::debug!(have, need, "stream closed mid-frame");
        Ok(Some(Decoded::Rejected(FrameError::Truncated { have, need })))
    }
}

/// Offset of the first complete, valid frame starting after position zero.
fn embedded_frame_start(src: &[u8]) -> Option<usize> {
    (1..src.len()).find(|&start| {
        if src[start] != START_MARKER {
            return false;
        }
        let Some(&len) = src.get(start + 1) else {
            return false;
        };
        let end = start + usize::from(len);
        usize::from(len) >= MIN_FRAME_LEN
            && end <= src.len()
            && Frame::decode(&src[start..end]).is_ok()
    })
}

impl Encoder<Frame> for GatewayCodec {
    type Error = io::Error;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode_into(dst).map_err(io::Error::from)
    }
}
