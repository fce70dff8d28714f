//! # Chroma
//!
//! Real-time multiplayer server for a small colour-claiming game.
//!
//! Clients connect over WebSockets and receive an identity. They create
//! games, join them (each participant gets a colour from a fixed
//! palette, three by default) and claim balls with plays. The server
//! pushes every game's full state to its participants twice a second.
//!
//! All state lives in a single [`Coordinator`] task; see the
//! [`coordinator`] module for the concurrency model.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use chroma::prelude::*;
//!
//! # async fn start() -> Result<(), ChromaError> {
//! let server = ChromaServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .config(CoordinatorConfig::default())
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

pub mod coordinator;
mod error;
mod handler;
mod server;

pub use coordinator::{
    Coordinator, CoordinatorConfig, CoordinatorHandle, MALFORMED_MESSAGE, Outcome,
};
pub use error::ChromaError;
pub use server::{ChromaServer, ChromaServerBuilder, DEFAULT_HANDSHAKE_TIMEOUT};

pub mod prelude {
    pub use crate::{
        ChromaError, ChromaServer, ChromaServerBuilder, Coordinator, CoordinatorConfig,
        CoordinatorHandle, Outcome,
    };
    pub use chroma_game::{GameConfig, GameError, GamePhase};
    pub use chroma_protocol::{
        ClientId, ClientMessage, GameId, GameSnapshot, MoveId, Participant, ServerMessage,
        SlotLabel,
    };
    pub use chroma_tick::TickConfig;
}
