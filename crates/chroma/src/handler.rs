//! Per-connection handler.
//!
//! Each accepted connection gets its own Tokio task running this handler.
//! The flow is:
//!   1. Register with the coordinator → client id, `connect` queued
//!   2. Spawn a writer that drains the client's outbound queue
//!   3. Loop: receive frames → hand each to the coordinator
//!   4. On close, tell the coordinator the client is gone

use std::sync::Arc;

use chroma_protocol::ClientId;
use chroma_registry::{ClientReceiver, outbound_queue};
use chroma_transport::{Connection, WebSocketConnection};

use crate::{ChromaError, CoordinatorHandle};

/// Drop guard that reports the disconnect when the handler exits.
///
/// Runs even if the handler returns early or panics. `Drop` is
/// synchronous, so the report goes out from a fire-and-forget task.
struct DisconnectGuard {
    client_id: ClientId,
    coordinator: CoordinatorHandle,
}

impl Drop for DisconnectGuard {
    fn drop(&mut self) {
        let client_id = self.client_id.clone();
        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            let _ = coordinator.disconnect(client_id).await;
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    coordinator: CoordinatorHandle,
) -> Result<(), ChromaError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    let peer = conn.peer_addr();

    let (tx, rx) = outbound_queue();
    let client_id = coordinator.connect(tx).await?;
    let _guard = DisconnectGuard {
        client_id: client_id.clone(),
        coordinator: coordinator.clone(),
    };
    tracing::debug!(%conn_id, %peer, %client_id, "connection registered");

    let writer = tokio::spawn(write_frames(Arc::clone(&conn), rx, client_id.clone()));

    let result = read_frames(conn.as_ref(), &coordinator, &client_id).await;

    writer.abort();
    if let Err(e) = conn.close().await {
        tracing::trace!(%client_id, error = %e, "close failed");
    }

    // _guard drops here → disconnect reported.
    result
}

/// Forwards inbound frames until the peer goes away.
async fn read_frames(
    conn: &WebSocketConnection,
    coordinator: &CoordinatorHandle,
    client_id: &ClientId,
) -> Result<(), ChromaError> {
    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%client_id, "connection closed cleanly");
                return Ok(());
            }
            Err(e) => {
                tracing::debug!(%client_id, error = %e, "recv error");
                return Ok(());
            }
        };

        let outcome = coordinator.frame(client_id.clone(), data).await?;
        tracing::trace!(%client_id, ?outcome, "frame handled");
    }
}

/// Drains the client's outbound queue onto the socket.
///
/// Ends when the queue closes (the client was unregistered) or a send
/// fails.
async fn write_frames(
    conn: Arc<WebSocketConnection>,
    mut rx: ClientReceiver,
    client_id: ClientId,
) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = conn.send(&frame).await {
            tracing::debug!(%client_id, error = %e, "send failed, stopping writer");
            break;
        }
    }
}
