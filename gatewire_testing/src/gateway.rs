//! In-memory stand-in for the gateway end of a link.

use std::{io, time::Duration};

use futures::{SinkExt, StreamExt};
use gatewire::{
    Engine,
    EngineBuilder,
    frame::{Decoded, Frame, GatewayCodec},
};
use tokio::{
    io::{AsyncWriteExt, DuplexStream},
    time::Instant,
};
use tokio_util::codec::Framed;

/// Buffer size of the duplex pipe between engine and fake gateway.
pub const PIPE_CAPACITY: usize = 4096;

/// The gateway side of a duplex pipe, speaking gateway frames.
///
/// Requests written by the engine are decoded and returned by
/// [`FakeGateway::next_request`]; responses are encoded with the same codec the
/// engine uses.
pub struct FakeGateway {
    framed: Framed<DuplexStream, GatewayCodec>,
}

impl FakeGateway {
    /// Wrap the gateway half of a duplex pipe.
    #[must_use]
    pub fn new(stream: DuplexStream) -> Self {
        Self {
            framed: Framed::new(stream, GatewayCodec::new()),
        }
    }

    /// Wait for the next well-formed request.
    ///
    /// Returns `None` once the engine has closed its write half.
    ///
    /// # Panics
    ///
    /// Panics if the engine writes bytes that do not decode as a frame.
    pub async fn next_request(&mut self) -> Option<Frame> {
        match self.framed.next().await? {
            Ok(Decoded::Frame(frame)) => Some(frame),
            Ok(Decoded::Rejected(error)) => panic!("engine wrote a malformed frame: {error}"),
            Err(error) => panic!("reading from engine failed: {error}"),
        }
    }

    /// Wait up to `within` for a request.
    ///
    /// Returns `None` if nothing arrives in time or the engine closed its
    /// write half.
    pub async fn request_within(&mut self, within: Duration) -> Option<Frame> {
        tokio::time::timeout(within, self.next_request())
            .await
            .ok()
            .flatten()
    }

    /// Wait for the next request and report when it arrived.
    pub async fn timed_request(&mut self) -> Option<(Frame, Instant)> {
        let frame = self.next_request().await?;
        Some((frame, Instant::now()))
    }

    /// Send a response or notification frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be encoded or the pipe is closed.
    pub async fn send(&mut self, frame: Frame) -> io::Result<()> { self.framed.send(frame).await }

    /// Write raw bytes, bypassing the encoder.
    ///
    /// # Errors
    ///
    /// Returns an error if the pipe is closed.
    pub async fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        let stream = self.framed.get_mut();
        stream.write_all(bytes).await?;
        stream.flush().await
    }

    /// Close the gateway side, which the engine observes as end of stream.
    pub fn close(self) { drop(self.framed); }
}

/// Start `builder` over a fresh duplex pipe and return both ends.
///
/// # Panics
///
/// Panics if called outside a Tokio runtime.
#[must_use]
pub fn start_engine(builder: EngineBuilder) -> (Engine, FakeGateway) {
    let (engine_side, gateway_side) = tokio::io::duplex(PIPE_CAPACITY);
    let engine = builder.start(engine_side);
    (engine, FakeGateway::new(gateway_side))
}

/// Start an engine with default settings that is already authenticated.
#[must_use]
pub fn authenticated_engine() -> (Engine, FakeGateway) {
    start_engine(Engine::builder().authenticated(true))
}
