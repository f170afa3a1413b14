//! Request dispatcher: drains the pending queue onto the transport.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use super::{COMMAND_PACING, CONFLICT_RETRY_DELAY, SHUTDOWN_DETAIL, Shared};
use crate::{
    command::{CommandError, Transaction},
    error::LinkDown,
    metrics,
    queue::Dispatch,
};

/// Run until the terminate marker is reached, the engine is cancelled or a
/// write fails.
pub(super) async fn run<W>(shared: Arc<Shared>, mut writer: W)
where
    W: AsyncWrite + Unpin,
{
    loop {
        let item = tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => break,
            item = shared.queue.next() => item,
        };
        let command = match item {
            Dispatch::Command(command) => command,
            Dispatch::Terminate => {
                tracing::debug!("dispatcher received terminate marker");
                break;
            }
        };
        let id = command.id();
        let name = command.name();

        if command.lifecycle().status().is_terminal() {
            tracing::debug!(
                command = name,
                %id,
                status = %command.lifecycle().status(),
                "skipping finished command"
            );
            continue;
        }

        if let Some(node) = command.profile().serialised_node() {
            if shared.in_flight.has_node(node) {
                if !shared.is_running() {
                    command.lifecycle().fail(SHUTDOWN_DETAIL);
                    continue;
                }
                shared.queue.requeue_front(command);
                metrics::inc_requeued();
                tracing::debug!(
                    command = name,
                    %id,
                    %node,
                    queue = %shared.snapshot(),
                    "node busy, requeued command"
                );
                if !pause(&shared, CONFLICT_RETRY_DELAY).await {
                    break;
                }
                continue;
            }
        }

        let bytes = match prepare(&shared, command.as_ref()) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(command = name, %id, %error, "command refused before write");
                command.lifecycle().fail(error.to_string());
                continue;
            }
        };

        shared.in_flight.insert(Arc::clone(&command));
        if !command.lifecycle().mark_processing() {
            // Timed out between the status check and now.
            shared.in_flight.remove(id);
            continue;
        }

        let written = tokio::select! {
            biased;
            () = shared.shutdown.cancelled() => None,
            result = write_frame(&mut writer, &bytes) => Some(result),
        };
        match written {
            Some(Ok(())) => {}
            Some(Err(error)) => {
                shared.in_flight.remove(id);
                command.lifecycle().fail(format!("write failed: {error}"));
                shared.signal_link_down(LinkDown::WriteFailed(error.to_string()));
                break;
            }
            None => {
                shared.in_flight.remove(id);
                command.lifecycle().fail(SHUTDOWN_DETAIL);
                tracing::debug!(command = name, %id, "write abandoned at shutdown");
                break;
            }
        }
        metrics::inc_dispatched();
        tracing::debug!(command = name, %id, len = bytes.len(), "command written");

        if !pause(&shared, COMMAND_PACING).await {
            break;
        }
    }

    // A peer that stopped reading can also stall the close itself.
    tokio::select! {
        biased;
        () = shared.shutdown.cancelled() => {}
        result = writer.shutdown() => {
            if let Err(error) = result {
                tracing::debug!(%error, "closing gateway write half failed");
            }
        }
    }
    tracing::debug!("request dispatcher stopped");
}

/// Sleep for `delay`. Returns `false` if the engine was cancelled first.
async fn pause(shared: &Shared, delay: Duration) -> bool {
    tokio::select! {
        biased;
        () = shared.shutdown.cancelled() => false,
        () = tokio::time::sleep(delay) => true,
    }
}

/// Validate the command, check authentication and encode its request.
fn prepare(shared: &Shared, command: &dyn Transaction) -> Result<Bytes, CommandError> {
    let bytes = command.prepare()?;
    if command.profile().requires_authentication && !shared.is_authenticated() {
        return Err(CommandError::NotAuthenticated);
    }
    Ok(bytes)
}

async fn write_frame<W>(writer: &mut W, bytes: &[u8]) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(bytes).await?;
    writer.flush().await
}
