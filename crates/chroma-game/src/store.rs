//! The session store: creates games and applies joins and plays to them.

use std::collections::HashMap;

use chroma_protocol::{ClientId, Codec, GameId, MoveId, SlotLabel};
use chroma_registry::ClientRegistry;

use crate::{Game, GameConfig, GameError};

/// The result of a successful join.
#[derive(Debug)]
pub struct JoinOutcome<'a> {
    /// The game after the join.
    pub game: &'a Game,
    /// The label the new participant received.
    pub label: SlotLabel,
    /// `true` exactly when this join filled the game for the first time
    /// (the transition from waiting to active).
    pub started: bool,
}

/// Owns every game on the server.
///
/// Games are never removed: they live for the remainder of the process.
/// Like the registry, the store is plain data owned by the coordinator
/// task, so it needs no locking of its own.
pub struct SessionStore {
    games: HashMap<GameId, Game>,
    config: GameConfig,
}

impl SessionStore {
    /// Creates an empty store whose games follow `config` (after
    /// [`GameConfig::validated`]).
    pub fn new(config: GameConfig) -> Self {
        Self {
            games: HashMap::new(),
            config: config.validated(),
        }
    }

    /// The configuration every game is created with.
    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Allocates a new, empty game and returns it.
    pub fn create(&mut self) -> &Game {
        let mut id = GameId::random();
        while self.games.contains_key(&id) {
            id = GameId::random();
        }

        tracing::info!(game_id = %id, games = self.games.len() + 1, "game created");
        self.games
            .entry(id.clone())
            .or_insert_with(|| Game::new(id, &self.config))
    }

    /// Seats `client_id` in `game_id`.
    ///
    /// Checks run in a fixed order and the first failure wins:
    /// `NotFound`, `ClientUnknown`, `Full`, `Duplicate`. In particular a
    /// participant re-joining a full game sees `Full`, not `Duplicate`.
    ///
    /// # Errors
    /// - [`GameError::NotFound`] — no such game
    /// - [`GameError::ClientUnknown`] — `client_id` is not in `clients`
    /// - [`GameError::Full`] — every slot is taken
    /// - [`GameError::Duplicate`] — the client already holds a slot
    pub fn join<C: Codec>(
        &mut self,
        game_id: &GameId,
        client_id: &ClientId,
        clients: &ClientRegistry<C>,
    ) -> Result<JoinOutcome<'_>, GameError> {
        let game = self
            .games
            .get_mut(game_id)
            .ok_or_else(|| GameError::NotFound(game_id.clone()))?;

        if !clients.contains(client_id) {
            return Err(GameError::ClientUnknown(client_id.clone()));
        }

        let label = match game.free_label(&self.config.palette) {
            Some(label) if !game.is_full() => label.clone(),
            _ => {
                return Err(GameError::Full {
                    game_id: game_id.clone(),
                    capacity: game.capacity(),
                });
            }
        };

        if game.contains(client_id) {
            return Err(GameError::Duplicate(client_id.clone(), game_id.clone()));
        }

        let started = game.seat(client_id.clone(), label.clone());
        tracing::info!(
            %game_id,
            %client_id,
            color = %label,
            players = game.player_count(),
            "player joined"
        );
        if started {
            tracing::info!(%game_id, "game started");
        }

        Ok(JoinOutcome {
            game,
            label,
            started,
        })
    }

    /// Records `label` for `move_id` in `game_id`, replacing any earlier
    /// value. Returns the replaced value.
    ///
    /// Any client may play in any existing game; membership is not checked.
    ///
    /// # Errors
    /// Returns [`GameError::NotFound`] if the game does not exist.
    pub fn record_play(
        &mut self,
        game_id: &GameId,
        move_id: MoveId,
        label: SlotLabel,
    ) -> Result<Option<SlotLabel>, GameError> {
        let game = self
            .games
            .get_mut(game_id)
            .ok_or_else(|| GameError::NotFound(game_id.clone()))?;

        tracing::trace!(%game_id, %move_id, color = %label, "play recorded");
        Ok(game.record(move_id, label))
    }

    /// Removes `client_id` from every game it sits in.
    ///
    /// Returns the games that lost a participant. Labels held by the
    /// remaining participants do not change.
    pub fn remove_client(&mut self, client_id: &ClientId) -> Vec<GameId> {
        let mut affected = Vec::new();
        for game in self.games.values_mut() {
            if game.unseat(client_id) {
                tracing::info!(
                    game_id = %game.id(),
                    %client_id,
                    players = game.player_count(),
                    "player removed"
                );
                affected.push(game.id().clone());
            }
        }
        affected
    }

    /// Looks up a game.
    pub fn get(&self, game_id: &GameId) -> Option<&Game> {
        self.games.get(game_id)
    }

    /// Iterates over every game.
    pub fn games(&self) -> impl Iterator<Item = &Game> {
        self.games.values()
    }

    /// Lists all game identities.
    pub fn ids(&self) -> Vec<GameId> {
        self.games.keys().cloned().collect()
    }

    /// Returns the number of games.
    pub fn len(&self) -> usize {
        self.games.len()
    }

    /// Returns `true` if there are no games.
    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
