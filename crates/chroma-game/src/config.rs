//! Game configuration and lifecycle phase.

use std::collections::HashSet;

use chroma_protocol::SlotLabel;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// The labels handed out by default, in slot order.
pub const DEFAULT_PALETTE: [&str; 3] = ["Red", "Green", "Blue"];

/// The `balls` value carried in every game record by default.
pub const DEFAULT_BALLS: u32 = 20;

/// Configuration shared by every game in a store.
///
/// The palette is the single source of truth for how many players a game
/// holds: slot N gets `palette[N]`, and a game is full once every label is
/// taken. Changing the player count means changing the palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Slot labels in join order.
    pub palette: Vec<SlotLabel>,

    /// Board size reported to clients in the `balls` field.
    pub balls: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            palette: DEFAULT_PALETTE.iter().copied().map(SlotLabel::from).collect(),
            balls: DEFAULT_BALLS,
        }
    }
}

impl GameConfig {
    /// Maximum number of participants per game.
    pub fn capacity(&self) -> usize {
        self.palette.len()
    }

    /// The label for a given slot index, if the slot exists.
    pub fn label_for_slot(&self, slot: usize) -> Option<&SlotLabel> {
        self.palette.get(slot)
    }

    /// Returns the config with repeated palette labels removed.
    ///
    /// Called by [`SessionStore::new`](crate::SessionStore::new). Labels
    /// tell participants apart, so each may appear once; later repeats
    /// are dropped and the capacity shrinks to match.
    pub fn validated(mut self) -> Self {
        let mut seen = HashSet::new();
        let before = self.palette.len();
        self.palette.retain(|label| seen.insert(label.clone()));

        if self.palette.len() != before {
            tracing::warn!(
                dropped = before - self.palette.len(),
                capacity = self.palette.len(),
                "duplicate palette labels removed"
            );
        }
        self
    }
}

// ---------------------------------------------------------------------------
// GamePhase
// ---------------------------------------------------------------------------

/// The lifecycle phase of a game, derived from its participants.
///
/// ```text
/// Waiting ──(last slot filled)──→ Active
/// ```
///
/// There is no way back and no terminal phase: games live as long as the
/// process does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Fewer participants than the game has ever needed to start.
    Waiting,
    /// The game has been full at least once.
    Active,
}

impl GamePhase {
    /// Returns `true` once the game has started.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl std::fmt::Display for GamePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "Waiting"),
            Self::Active => write!(f, "Active"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_config_default_is_three_colors() {
        let config = GameConfig::default();
        assert_eq!(config.capacity(), 3);
        assert_eq!(config.balls, 20);
        assert_eq!(config.label_for_slot(0), Some(&SlotLabel::from("Red")));
        assert_eq!(config.label_for_slot(1), Some(&SlotLabel::from("Green")));
        assert_eq!(config.label_for_slot(2), Some(&SlotLabel::from("Blue")));
        assert_eq!(config.label_for_slot(3), None);
    }

    #[test]
    fn test_capacity_follows_palette() {
        let config = GameConfig {
            palette: vec!["A".into(), "B".into()],
            ..GameConfig::default()
        };
        assert_eq!(config.capacity(), 2);
    }

    #[test]
    fn test_validated_drops_repeated_labels() {
        let config = GameConfig {
            palette: vec!["Red".into(), "Red".into(), "Blue".into(), "Red".into()],
            ..GameConfig::default()
        }
        .validated();
        assert_eq!(config.palette, vec![SlotLabel::from("Red"), SlotLabel::from("Blue")]);
        assert_eq!(config.capacity(), 2);

        assert_eq!(GameConfig::default().validated(), GameConfig::default());
    }

    #[test]
    fn test_game_phase_display_and_active() {
        assert_eq!(GamePhase::Waiting.to_string(), "Waiting");
        assert!(!GamePhase::Waiting.is_active());
        assert!(GamePhase::Active.is_active());
    }
}
