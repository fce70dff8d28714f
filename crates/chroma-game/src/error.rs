//! Error types for the game layer.

use chroma_protocol::{ClientId, GameId};

/// Errors that can occur during game operations.
///
/// Only [`GameError::Full`] is ever reported back to a client; the rest
/// are logged server-side and otherwise dropped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The game does not exist.
    #[error("game {0} not found")]
    NotFound(GameId),

    /// The client named in the request is not registered.
    #[error("client {0} not found")]
    ClientUnknown(ClientId),

    /// Every slot in the game is taken.
    #[error("game {game_id} is full ({capacity} players)")]
    Full { game_id: GameId, capacity: usize },

    /// The client already holds a slot in this game.
    #[error("client {0} already in game {1}")]
    Duplicate(ClientId, GameId),

    /// A request arrived without one of its required fields, or with one
    /// that is empty or of the wrong type.
    #[error("{method} request missing {field}")]
    MissingField {
        method: &'static str,
        field: &'static str,
    },
}

impl GameError {
    /// The text sent to the requester, for the errors clients get to see.
    pub fn client_message(&self) -> Option<String> {
        match self {
            Self::Full { capacity, .. } => Some(format!(
                "Game is full. Maximum {capacity} players allowed."
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_full_is_client_visible() {
        let full = GameError::Full {
            game_id: "g".into(),
            capacity: 3,
        };
        assert_eq!(
            full.client_message().as_deref(),
            Some("Game is full. Maximum 3 players allowed.")
        );
        assert!(GameError::NotFound("g".into()).client_message().is_none());
        assert!(
            GameError::Duplicate("c".into(), "g".into())
                .client_message()
                .is_none()
        );
    }

    #[test]
    fn test_missing_field_display() {
        let err = GameError::MissingField {
            method: "join",
            field: "gameId",
        };
        assert_eq!(err.to_string(), "join request missing gameId");
    }
}
