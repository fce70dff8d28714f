//! Client types: the server's record of one open channel.
//!
//! A client exists from the moment its channel opens until it closes.
//! The record owns the only server-side handle for pushing frames to
//! that channel; everything else refers to the client by [`ClientId`].

use std::sync::Arc;
use std::time::Duration;

use chroma_protocol::ClientId;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// An encoded text frame, ready to write to a socket.
///
/// `Arc<str>` so one encoding of a game snapshot can be queued to every
/// participant without copying the text.
pub type Frame = Arc<str>;

/// How many frames may wait in a client's outbound queue. Frames pushed
/// beyond this are dropped until the writer catches up.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// The sending half of a client's outbound queue.
///
/// The coordinator only ever `try_send`s on it; the connection's writer
/// task drains it onto the socket.
pub type ClientSender = mpsc::Sender<Frame>;

/// The receiving half of a client's outbound queue.
pub type ClientReceiver = mpsc::Receiver<Frame>;

/// Creates an outbound queue holding up to [`OUTBOUND_QUEUE_CAPACITY`]
/// frames.
pub fn outbound_queue() -> (ClientSender, ClientReceiver) {
    mpsc::channel(OUTBOUND_QUEUE_CAPACITY)
}

/// A single connected client.
#[derive(Debug)]
pub struct Client {
    /// The identity announced to the client in its `connect` message.
    pub id: ClientId,

    /// When the channel was registered.
    pub connected_at: Instant,

    pub(crate) sender: ClientSender,
}

impl Client {
    pub(crate) fn new(id: ClientId, sender: ClientSender) -> Self {
        Self {
            id,
            connected_at: Instant::now(),
            sender,
        }
    }

    /// The client's outbound queue.
    pub fn sender(&self) -> &ClientSender {
        &self.sender
    }

    /// How long the client has been registered.
    pub fn connected_for(&self) -> Duration {
        self.connected_at.elapsed()
    }

    /// `true` once the connection's writer has gone away.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}
