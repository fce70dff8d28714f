//! Game (session) management for Chroma.
//!
//! A game is a small group of clients (three by default) sharing one play-state. The
//! [`SessionStore`] owns every game and enforces the join rules: existing
//! game, known client, free slot, no duplicates. Each participant receives
//! a permanent slot label from the [`GameConfig`] palette in join order.
//!
//! # Key types
//!
//! - [`SessionStore`] — creates games, applies joins and plays
//! - [`Game`] — one game's participants and play-state
//! - [`GameConfig`] — palette (and therefore capacity) and board size
//! - [`GamePhase`] — waiting vs. active
//! - [`GameError`] — why a join or play was rejected

mod config;
mod error;
mod game;
mod store;

pub use config::{DEFAULT_BALLS, DEFAULT_PALETTE, GameConfig, GamePhase};
pub use error::GameError;
pub use game::Game;
pub use store::{JoinOutcome, SessionStore};
