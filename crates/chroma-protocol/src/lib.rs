//! Wire protocol for Chroma.
//!
//! This crate defines the "language" that browser clients and the server
//! speak:
//!
//! - **Identities** ([`ClientId`], [`GameId`], [`MoveId`], [`SlotLabel`])
//! - **Messages** ([`ClientMessage`], [`ServerMessage`], [`GameSnapshot`])
//!   — JSON objects discriminated by their `method` field.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how messages become text
//!   frames and back.
//! - **Errors** ([`ProtocolError`]).
//!
//! # Architecture
//!
//! ```text
//! Transport (frames) → Protocol (messages) → Registry / Game store
//! ```
//!
//! The protocol layer knows nothing about connections or game rules.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientId, ClientMessage, GameId, GameSnapshot, MoveId, Participant, ServerMessage, SlotLabel,
};
