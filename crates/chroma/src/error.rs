//! Unified error type for the Chroma server.

use chroma_game::GameError;
use chroma_protocol::ProtocolError;
use chroma_registry::RegistryError;
use chroma_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum ChromaError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A registry-level error (unknown client, closed channel).
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// A game-level error (not found, full, duplicate, missing field).
    #[error(transparent)]
    Game(#[from] GameError),

    /// The coordinator task has stopped and no longer accepts commands.
    #[error("coordinator is not running")]
    CoordinatorUnavailable,
}
