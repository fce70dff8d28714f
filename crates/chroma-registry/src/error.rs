//! Error types for the registry layer.

use chroma_protocol::{ClientId, ProtocolError};

/// Errors that can occur while delivering to a registered client.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// No client is registered under this identity.
    /// Either it never connected or its channel has already closed.
    #[error("client {0} is not registered")]
    UnknownClient(ClientId),

    /// The client is registered but its outbound queue has no reader
    /// (the connection's writer task has exited).
    #[error("channel for client {0} is closed")]
    ChannelClosed(ClientId),

    /// The client's outbound queue is full; the frame was dropped.
    #[error("outbound queue for client {0} is full")]
    QueueFull(ClientId),

    /// The message could not be encoded into a frame.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
