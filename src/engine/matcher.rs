//! Response matcher: routes decoded frames to commands and observers.

use std::sync::Arc;

use futures::StreamExt;
use tokio::io::AsyncRead;
use tokio_util::codec::FramedRead;

use super::{READ_BUFFER_SIZE, Shared};
use crate::{
    error::LinkDown,
    frame::{Decoded, ErrorReason, Frame, GatewayCodec, codes},
    metrics,
};

/// Read frames until end of stream, a read error or cancellation.
pub(super) async fn run<R>(shared: Arc<Shared>, reader: R)
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::with_capacity(reader, GatewayCodec::new(), READ_BUFFER_SIZE);
    loop {
        let next = tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => break,
            next = frames.next() => next,
        };
        match next {
            Some(Ok(Decoded::Frame(frame))) => handle_frame(&shared, &frame),
            Some(Ok(Decoded::Rejected(error))) => {
                metrics::inc_frames_rejected();
                tracing::warn!(%error, "discarding malformed frame");
            }
            Some(Err(error)) => {
                shared.signal_link_down(LinkDown::ReadFailed(error.to_string()));
                break;
            }
            None => {
                shared.signal_link_down(LinkDown::EndOfStream);
                break;
            }
        }
    }
    tracing::debug!("response matcher stopped");
}

/// Process one decoded frame.
pub(super) fn handle_frame(shared: &Shared, frame: &Frame) {
    metrics::inc_frames_received();
    let code = frame.code();
    if code == codes::ERROR_NTF {
        attribute_error(shared, frame);
        return;
    }

    let watched = shared.events.is_watched(code);
    if watched {
        shared.events.notify(frame);
    }

    let Some(command) = shared.in_flight.find_match(frame) else {
        if !watched {
            metrics::inc_frames_unmatched();
            tracing::warn!(
                %code,
                len = frame.encoded_len(),
                "no in-flight command matches frame"
            );
        }
        return;
    };
    let status = command.deliver(frame);
    tracing::debug!(
        command = command.name(),
        id = %command.id(),
        %code,
        %status,
        "frame delivered"
    );
    if status.is_terminal() {
        shared.in_flight.remove(command.id());
    }
}

/// Fail the in-flight command a general error refers to, if that is
/// unambiguous.
fn attribute_error(shared: &Shared, frame: &Frame) {
    let reason = ErrorReason::from_payload(frame.payload());
    match shared.in_flight.sole() {
        Some(command) => {
            tracing::warn!(
                command = command.name(),
                id = %command.id(),
                %reason,
                "gateway reported an error"
            );
            command.lifecycle().fail(format!("gateway error: {reason}"));
            shared.in_flight.remove(command.id());
        }
        None => {
            tracing::warn!(
                in_flight = shared.in_flight.len(),
                %reason,
                "gateway reported an error that cannot be attributed"
            );
        }
    }
}
