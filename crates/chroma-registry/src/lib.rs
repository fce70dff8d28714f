//! Client identity registry for Chroma.
//!
//! When a channel opens, the server mints an opaque [`ClientId`] for it,
//! announces that id over the channel, and remembers the channel here so
//! later messages (replies, join broadcasts, periodic updates) can find it.
//!
//! # How it fits in the stack
//!
//! ```text
//! Coordinator (above)  ← looks up channels by ClientId
//!     ↕
//! Registry (this crate)  ← ClientId → outbound queue
//!     ↕
//! Protocol (below)  ← ClientId, ServerMessage, Codec
//! ```
//!
//! [`ClientId`]: chroma_protocol::ClientId

mod client;
mod error;
mod registry;

pub use client::{
    Client, ClientReceiver, ClientSender, Frame, OUTBOUND_QUEUE_CAPACITY, outbound_queue,
};
pub use error::RegistryError;
pub use registry::ClientRegistry;
