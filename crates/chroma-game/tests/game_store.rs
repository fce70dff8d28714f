//! Integration tests for the session store against a real client registry.

use std::collections::HashSet;

use chroma_game::{GameConfig, GameError, GamePhase, SessionStore};
use chroma_protocol::{ClientId, GameId, MoveId, SlotLabel};
use chroma_registry::{ClientReceiver, ClientRegistry, outbound_queue};

// =========================================================================
// Helpers
// =========================================================================

/// A registry plus the receivers that keep its channels open.
struct Clients {
    registry: ClientRegistry,
    _receivers: Vec<ClientReceiver>,
}

impl Clients {
    fn new() -> Self {
        Self {
            registry: ClientRegistry::new(),
            _receivers: Vec::new(),
        }
    }

    fn connect(&mut self) -> ClientId {
        let (tx, rx) = outbound_queue();
        self._receivers.push(rx);
        self.registry.register(tx)
    }
}

fn labels(store: &SessionStore, game: &GameId) -> Vec<(ClientId, SlotLabel)> {
    store
        .get(game)
        .expect("game exists")
        .participants()
        .iter()
        .map(|p| (p.client_id.clone(), p.color.clone()))
        .collect()
}

// =========================================================================
// create()
// =========================================================================

#[test]
fn test_create_returns_empty_game_with_unique_ids() {
    let mut store = SessionStore::default();
    let mut ids = HashSet::new();

    for _ in 0..50 {
        let game = store.create();
        assert_eq!(game.player_count(), 0);
        assert!(game.state().is_empty());
        assert_eq!(game.phase(), GamePhase::Waiting);
        assert!(ids.insert(game.id().clone()), "game ids must be unique");
    }
    assert_eq!(store.len(), 50);
}

// =========================================================================
// join()
// =========================================================================

#[test]
fn test_join_labels_follow_join_order() {
    let mut clients = Clients::new();
    let mut store = SessionStore::default();
    let game = store.create().id().clone();

    // Identity values play no part: order of arrival decides the label.
    let z = clients.connect();
    let x = clients.connect();
    let y = clients.connect();
    for c in [&x, &y, &z] {
        store.join(&game, c, &clients.registry).unwrap();
    }

    assert_eq!(
        labels(&store, &game),
        vec![
            (x, "Red".into()),
            (y, "Green".into()),
            (z, "Blue".into()),
        ]
    );
}

#[test]
fn test_join_started_only_on_filling_join() {
    let mut clients = Clients::new();
    let mut store = SessionStore::default();
    let game = store.create().id().clone();

    let started: Vec<bool> = (0..3)
        .map(|_| {
            let c = clients.connect();
            store.join(&game, &c, &clients.registry).unwrap().started
        })
        .collect();

    assert_eq!(started, vec![false, false, true]);
    assert_eq!(store.get(&game).unwrap().phase(), GamePhase::Active);
}

#[test]
fn test_join_fourth_client_is_full_and_changes_nothing() {
    let mut clients = Clients::new();
    let mut store = SessionStore::default();
    let game = store.create().id().clone();
    for _ in 0..3 {
        let c = clients.connect();
        store.join(&game, &c, &clients.registry).unwrap();
    }
    let before = labels(&store, &game);

    let d = clients.connect();
    let err = store.join(&game, &d, &clients.registry).unwrap_err();

    assert_eq!(
        err,
        GameError::Full {
            game_id: game.clone(),
            capacity: 3
        }
    );
    assert_eq!(labels(&store, &game), before);
}

#[test]
fn test_join_duplicate_does_not_grow_game() {
    let mut clients = Clients::new();
    let mut store = SessionStore::default();
    let game = store.create().id().clone();
    let a = clients.connect();

    store.join(&game, &a, &clients.registry).unwrap();
    let err = store.join(&game, &a, &clients.registry).unwrap_err();

    assert_eq!(err, GameError::Duplicate(a.clone(), game.clone()));
    assert_eq!(store.get(&game).unwrap().player_count(), 1);
}

#[test]
fn test_join_full_reported_before_duplicate() {
    let mut clients = Clients::new();
    let mut store = SessionStore::default();
    let game = store.create().id().clone();
    let members: Vec<ClientId> = (0..3).map(|_| clients.connect()).collect();
    for c in &members {
        store.join(&game, c, &clients.registry).unwrap();
    }

    let err = store.join(&game, &members[0], &clients.registry).unwrap_err();
    assert!(matches!(err, GameError::Full { .. }));
}

#[test]
fn test_join_unknown_game_is_not_found() {
    let mut clients = Clients::new();
    let mut store = SessionStore::default();
    let a = clients.connect();

    let err = store
        .join(&GameId::from("nope"), &a, &clients.registry)
        .unwrap_err();
    assert_eq!(err, GameError::NotFound("nope".into()));
}

#[test]
fn test_join_unregistered_client_is_unknown() {
    let clients = Clients::new();
    let mut store = SessionStore::default();
    let game = store.create().id().clone();

    let err = store
        .join(&game, &ClientId::from("ghost"), &clients.registry)
        .unwrap_err();
    assert_eq!(err, GameError::ClientUnknown("ghost".into()));
    assert_eq!(store.get(&game).unwrap().player_count(), 0);
}

#[test]
fn test_join_capacity_follows_custom_palette() {
    let mut clients = Clients::new();
    let mut store = SessionStore::new(GameConfig {
        palette: vec!["Cyan".into(), "Magenta".into()],
        ..GameConfig::default()
    });
    let game = store.create().id().clone();

    let a = clients.connect();
    let b = clients.connect();
    let c = clients.connect();
    store.join(&game, &a, &clients.registry).unwrap();
    let outcome = store.join(&game, &b, &clients.registry).unwrap();
    assert!(outcome.started);
    assert_eq!(outcome.label, SlotLabel::from("Magenta"));

    let err = store.join(&game, &c, &clients.registry).unwrap_err();
    assert_eq!(
        err.client_message().as_deref(),
        Some("Game is full. Maximum 2 players allowed.")
    );
}

#[test]
fn test_join_repeated_palette_labels_do_not_inflate_capacity() {
    let mut clients = Clients::new();
    let mut store = SessionStore::new(GameConfig {
        palette: vec!["Red".into(), "Red".into(), "Blue".into()],
        ..GameConfig::default()
    });
    assert_eq!(store.config().capacity(), 2);
    let game = store.create().id().clone();

    let a = clients.connect();
    let b = clients.connect();
    let c = clients.connect();
    assert_eq!(store.join(&game, &a, &clients.registry).unwrap().label, SlotLabel::from("Red"));
    let outcome = store.join(&game, &b, &clients.registry).unwrap();
    assert_eq!(outcome.label, SlotLabel::from("Blue"));
    assert!(outcome.started, "the game is full with two distinct labels");

    let err = store.join(&game, &c, &clients.registry).unwrap_err();
    assert_eq!(
        err.client_message().as_deref(),
        Some("Game is full. Maximum 2 players allowed.")
    );
    assert_eq!(store.get(&game).unwrap().player_count(), 2);
}

// =========================================================================
// record_play()
// =========================================================================

#[test]
fn test_record_play_is_idempotent_and_overwrites() {
    let mut store = SessionStore::default();
    let game = store.create().id().clone();
    let ball = MoveId::from("4");

    store
        .record_play(&game, ball.clone(), "Red".into())
        .unwrap();
    let once = store.get(&game).unwrap().state().clone();
    store
        .record_play(&game, ball.clone(), "Red".into())
        .unwrap();
    assert_eq!(store.get(&game).unwrap().state(), &once);

    let prev = store
        .record_play(&game, ball.clone(), "Blue".into())
        .unwrap();
    assert_eq!(prev, Some("Red".into()));
    assert_eq!(
        store.get(&game).unwrap().state().get(&ball),
        Some(&SlotLabel::from("Blue"))
    );
}

#[test]
fn test_record_play_needs_no_membership() {
    let mut store = SessionStore::default();
    let game = store.create().id().clone();

    // Nobody has joined, yet the play lands.
    store
        .record_play(&game, MoveId::from("1"), "Green".into())
        .unwrap();
    assert_eq!(store.get(&game).unwrap().state().len(), 1);
}

#[test]
fn test_record_play_unknown_game_is_not_found() {
    let mut store = SessionStore::default();
    let err = store
        .record_play(&GameId::from("nope"), MoveId::from("1"), "Red".into())
        .unwrap_err();
    assert_eq!(err, GameError::NotFound("nope".into()));
}

// =========================================================================
// remove_client()
// =========================================================================

#[test]
fn test_remove_client_leaves_every_game() {
    let mut clients = Clients::new();
    let mut store = SessionStore::default();
    let g1 = store.create().id().clone();
    let g2 = store.create().id().clone();
    let g3 = store.create().id().clone();
    let a = clients.connect();
    let b = clients.connect();

    store.join(&g1, &a, &clients.registry).unwrap();
    store.join(&g1, &b, &clients.registry).unwrap();
    store.join(&g2, &a, &clients.registry).unwrap();

    let mut affected = store.remove_client(&a);
    affected.sort();
    let mut expected = vec![g1.clone(), g2.clone()];
    expected.sort();
    assert_eq!(affected, expected);

    assert_eq!(labels(&store, &g1), vec![(b, "Green".into())]);
    assert_eq!(store.get(&g2).unwrap().player_count(), 0);
    assert_eq!(store.get(&g3).unwrap().player_count(), 0);
    assert!(store.remove_client(&a).is_empty());
}
