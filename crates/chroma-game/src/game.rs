//! A single game: its participants, their labels, and the shared play-state.

use std::collections::BTreeMap;

use chroma_protocol::{ClientId, GameId, GameSnapshot, MoveId, Participant, SlotLabel};

use crate::{GameConfig, GamePhase};

/// One game (a session of up to `capacity` players).
///
/// Participants are held by identity only. The game never owns a
/// client's channel; the registry does.
#[derive(Debug, Clone)]
pub struct Game {
    id: GameId,
    balls: u32,
    capacity: usize,
    clients: Vec<Participant>,
    state: BTreeMap<MoveId, SlotLabel>,
    /// Latched the first time every slot is filled.
    started: bool,
}

impl Game {
    pub(crate) fn new(id: GameId, config: &GameConfig) -> Self {
        Self {
            id,
            balls: config.balls,
            capacity: config.capacity(),
            clients: Vec::with_capacity(config.capacity()),
            state: BTreeMap::new(),
            started: false,
        }
    }

    /// The game's identity.
    pub fn id(&self) -> &GameId {
        &self.id
    }

    /// Participants in join order.
    pub fn participants(&self) -> &[Participant] {
        &self.clients
    }

    /// Identities of all participants, in join order.
    pub fn participant_ids(&self) -> impl Iterator<Item = &ClientId> {
        self.clients.iter().map(|p| &p.client_id)
    }

    /// Number of occupied slots.
    pub fn player_count(&self) -> usize {
        self.clients.len()
    }

    /// Maximum number of participants.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// `true` if every slot is occupied.
    pub fn is_full(&self) -> bool {
        self.clients.len() >= self.capacity
    }

    /// `true` if `client` holds a slot in this game.
    pub fn contains(&self, client: &ClientId) -> bool {
        self.clients.iter().any(|p| &p.client_id == client)
    }

    /// The label held by `client`, if it is a participant.
    pub fn label_of(&self, client: &ClientId) -> Option<&SlotLabel> {
        self.clients
            .iter()
            .find(|p| &p.client_id == client)
            .map(|p| &p.color)
    }

    /// The shared play-state: latest label per move.
    pub fn state(&self) -> &BTreeMap<MoveId, SlotLabel> {
        &self.state
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> GamePhase {
        if self.started {
            GamePhase::Active
        } else {
            GamePhase::Waiting
        }
    }

    /// A copy of the full record in wire form.
    pub fn snapshot(&self) -> GameSnapshot {
        GameSnapshot {
            id: self.id.clone(),
            balls: self.balls,
            clients: self.clients.clone(),
            state: self.state.clone(),
        }
    }

    /// The first palette label no current participant holds.
    pub fn free_label<'a>(&self, palette: &'a [SlotLabel]) -> Option<&'a SlotLabel> {
        palette
            .iter()
            .find(|label| !self.clients.iter().any(|p| &p.color == *label))
    }

    /// Seats `client` under `label`.
    ///
    /// Returns `true` if this seat filled the game for the first time.
    /// Callers check capacity and duplicates first.
    pub(crate) fn seat(&mut self, client: ClientId, label: SlotLabel) -> bool {
        self.clients.push(Participant {
            client_id: client,
            color: label,
        });

        let first_fill = !self.started && self.is_full();
        if first_fill {
            self.started = true;
        }
        first_fill
    }

    /// Removes `client` from the game. Remaining labels are untouched.
    pub(crate) fn unseat(&mut self, client: &ClientId) -> bool {
        let before = self.clients.len();
        self.clients.retain(|p| &p.client_id != client);
        self.clients.len() != before
    }

    /// Inserts or overwrites the label for a move; returns the old one.
    pub(crate) fn record(&mut self, move_id: MoveId, label: SlotLabel) -> Option<SlotLabel> {
        self.state.insert(move_id, label)
    }
}
