//! Core protocol types for Chroma's wire format.
//!
//! Every frame on the wire is a JSON object carrying a `method` field.
//! This module defines the identities that appear in those frames and the
//! two message enums: [`ClientMessage`] (client → server) and
//! [`ServerMessage`] (server → client).

use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Generates a random 32-character hex string (128 bits of entropy).
///
/// Used for both client and game identities. At 128 bits a collision
/// between two live identities is not a practical concern.
fn random_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// The identity the server assigns to a client when its channel opens.
///
/// Opaque to clients: they echo it back in `create` and `join` requests.
/// `#[serde(transparent)]` puts it on the wire as a bare string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(String);

impl ClientId {
    /// Mints a fresh random identity.
    pub fn random() -> Self {
        Self(random_token())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ClientId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity of a game (a session of up to three players).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    /// Mints a fresh random identity.
    pub fn random() -> Self {
        Self(random_token())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for GameId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The identity of a move (the `ballId` field on the wire).
///
/// Browser clients send ball ids as either strings or numbers, so the
/// deserializer accepts both and normalizes to the decimal string form.
/// It always serializes as a string, which is also what JSON object keys
/// in the `state` map require.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MoveId(String);

impl MoveId {
    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` if the id is the empty string, which counts as missing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for MoveId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<u64> for MoveId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl fmt::Display for MoveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

struct MoveIdVisitor;

impl Visitor<'_> for MoveIdVisitor {
    type Value = MoveId;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a string or a number")
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<MoveId, E> {
        Ok(MoveId(v.to_owned()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<MoveId, E> {
        Ok(MoveId(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<MoveId, E> {
        Ok(MoveId(v.to_string()))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<MoveId, E> {
        Ok(MoveId(v.to_string()))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<MoveId, E> {
        Ok(MoveId(v.to_string()))
    }
}

impl<'de> Deserialize<'de> for MoveId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(MoveIdVisitor)
    }
}

/// The label permanently given to a participant by join order
/// (`color` on the wire: `"Red"`, `"Green"`, `"Blue"` by default).
///
/// Also the value stored for a move in a game's play-state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotLabel(String);

impl SlotLabel {
    /// Returns the label as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` if the label is the empty string, which counts as missing.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SlotLabel {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game record
// ---------------------------------------------------------------------------

/// One occupied slot of a game: who sits there and which label they hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    #[serde(rename = "clientId")]
    pub client_id: ClientId,
    pub color: SlotLabel,
}

/// The full game record as it travels on the wire.
///
/// ```json
/// { "id": "…", "balls": 20,
///   "clients": [{ "clientId": "…", "color": "Red" }],
///   "state": { "7": "Red" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub id: GameId,
    /// Fixed board size carried for the client; no server logic reads it.
    pub balls: u32,
    /// Participants in join order.
    pub clients: Vec<Participant>,
    /// Latest label recorded for each move.
    pub state: BTreeMap<MoveId, SlotLabel>,
}

// ---------------------------------------------------------------------------
// ClientMessage — client → server
// ---------------------------------------------------------------------------

/// A request sent by a client.
///
/// `#[serde(tag = "method")]` reads the variant from the `method` field:
/// `{ "method": "join", "clientId": "…", "gameId": "…" }`.
///
/// Every field is an `Option`, and a field holding the wrong JSON type
/// reads as `None`. A frame that is well-formed JSON with a known
/// `method` but a missing or invalid field is a *validation* failure,
/// which the server handles silently; only frames that fail to decode
/// at all are answered with an `error` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ClientMessage {
    /// "Create a new game and tell `client_id` about it."
    Create {
        #[serde(rename = "clientId", default, deserialize_with = "lenient")]
        client_id: Option<ClientId>,
    },

    /// "Put `client_id` into game `game_id`."
    Join {
        #[serde(rename = "clientId", default, deserialize_with = "lenient")]
        client_id: Option<ClientId>,
        #[serde(rename = "gameId", default, deserialize_with = "lenient")]
        game_id: Option<GameId>,
    },

    /// "Record `color` for ball `ball_id` in game `game_id`."
    Play {
        #[serde(rename = "gameId", default, deserialize_with = "lenient")]
        game_id: Option<GameId>,
        #[serde(rename = "ballId", default, deserialize_with = "lenient")]
        ball_id: Option<MoveId>,
        #[serde(default, deserialize_with = "lenient")]
        color: Option<SlotLabel>,
    },
}

/// A request field as it arrived: either the expected shape or anything
/// else, which is swallowed.
#[derive(Deserialize)]
#[serde(untagged)]
enum FieldValue<T> {
    Valid(T),
    Invalid(de::IgnoredAny),
}

/// Reads an optional request field, mapping `null` and values of the
/// wrong type to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    match Option::<FieldValue<T>>::deserialize(deserializer)? {
        Some(FieldValue::Valid(value)) => Ok(Some(value)),
        Some(FieldValue::Invalid(_)) | None => Ok(None),
    }
}

impl ClientMessage {
    /// The wire name of this request's method.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Create { .. } => "create",
            Self::Join { .. } => "join",
            Self::Play { .. } => "play",
        }
    }
}

// ---------------------------------------------------------------------------
// ServerMessage — server → client
// ---------------------------------------------------------------------------

/// A message pushed by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Sent once, unprompted, as soon as a channel opens.
    Connect {
        #[serde(rename = "clientId")]
        client_id: ClientId,
    },

    /// Reply to `create`: the freshly created (empty) game.
    Create { game: GameSnapshot },

    /// Sent to every participant after a successful join.
    Join { game: GameSnapshot },

    /// Periodic full-state snapshot.
    Update { game: GameSnapshot },

    /// Something went wrong with the recipient's request.
    Error { message: String },
}

impl ServerMessage {
    /// The wire name of this message's method.
    pub fn method(&self) -> &'static str {
        match self {
            Self::Connect { .. } => "connect",
            Self::Create { .. } => "create",
            Self::Join { .. } => "join",
            Self::Update { .. } => "update",
            Self::Error { .. } => "error",
        }
    }

    /// The game carried by this message, if any.
    pub fn game(&self) -> Option<&GameSnapshot> {
        match self {
            Self::Create { game } | Self::Join { game } | Self::Update { game } => Some(game),
            Self::Connect { .. } | Self::Error { .. } => None,
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<ClientMessage, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_random_ids_are_32_hex_chars_and_distinct() {
        let a = ClientId::random();
        let b = ClientId::random();
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
        assert_ne!(GameId::random(), GameId::random());
    }

    #[test]
    fn test_decode_join_reads_camel_case_fields() {
        let msg = decode(r#"{"method":"join","clientId":"c2","gameId":"g1"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join {
                client_id: Some("c2".into()),
                game_id: Some("g1".into()),
            }
        );
        assert_eq!(msg.method(), "join");
    }

    #[test]
    fn test_decode_missing_field_is_none_not_error() {
        let msg = decode(r#"{"method":"create"}"#).unwrap();
        assert_eq!(msg, ClientMessage::Create { client_id: None });

        let msg = decode(r#"{"method":"play","gameId":"g1","color":null}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Play {
                game_id: Some("g1".into()),
                ball_id: None,
                color: None,
            }
        );
    }

    #[test]
    fn test_decode_play_accepts_numeric_ball_id() {
        let msg = decode(r#"{"method":"play","gameId":"g","ballId":7,"color":"Red"}"#).unwrap();
        match msg {
            ClientMessage::Play { ball_id, .. } => assert_eq!(ball_id, Some(MoveId::from(7u64))),
            other => panic!("expected Play, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_wrong_field_type_is_none_not_error() {
        let msg = decode(r#"{"method":"join","clientId":7,"gameId":"g1"}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Join {
                client_id: None,
                game_id: Some("g1".into()),
            }
        );

        let msg = decode(r#"{"method":"play","gameId":["g"],"ballId":true,"color":5}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Play {
                game_id: None,
                ball_id: None,
                color: None,
            }
        );

        let msg = decode(r#"{"method":"create","clientId":{"id":"c1"}}"#).unwrap();
        assert_eq!(msg, ClientMessage::Create { client_id: None });
    }

    #[test]
    fn test_decode_unknown_method_is_error() {
        assert!(decode(r#"{"method":"dance","clientId":"c1"}"#).is_err());
    }

    #[test]
    fn test_decode_missing_method_is_error() {
        assert!(decode(r#"{"clientId":"c1"}"#).is_err());
        assert!(decode("[1,2,3]").is_err());
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let msg = decode(r#"{"method":"create","clientId":"c1","extra":true}"#).unwrap();
        assert_eq!(msg, ClientMessage::Create { client_id: Some("c1".into()) });
    }

    #[test]
    fn test_connect_serializes_with_method_and_client_id() {
        let msg = ServerMessage::Connect { client_id: "abc".into() };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json, serde_json::json!({ "method": "connect", "clientId": "abc" }));
    }

    #[test]
    fn test_game_snapshot_wire_shape() {
        let mut state = BTreeMap::new();
        state.insert(MoveId::from(3u64), SlotLabel::from("Green"));
        let game = GameSnapshot {
            id: "g1".into(),
            balls: 20,
            clients: vec![Participant {
                client_id: "c2".into(),
                color: "Red".into(),
            }],
            state,
        };
        let json = serde_json::to_value(ServerMessage::Update { game }).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "method": "update",
                "game": {
                    "id": "g1",
                    "balls": 20,
                    "clients": [{ "clientId": "c2", "color": "Red" }],
                    "state": { "3": "Green" }
                }
            })
        );
    }

    #[test]
    fn test_server_message_game_accessor() {
        let err = ServerMessage::Error { message: "nope".into() };
        assert!(err.game().is_none());
        assert_eq!(err.method(), "error");
    }
}
