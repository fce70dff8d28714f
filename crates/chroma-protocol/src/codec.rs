//! Codec trait and implementations for serializing/deserializing messages.
//!
//! A "codec" (coder/decoder) converts between Rust types and wire frames.
//! Frames on a Chroma channel are UTF-8 text, so encoding produces a
//! `String` while decoding accepts raw bytes (the transport hands over
//! the payload of both text and binary frames).

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to text frames and decode them back.
///
/// `Send + Sync + 'static` because the codec is owned by long-lived
/// tasks (the coordinator and its registry) and may move between
/// Tokio worker threads.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a text frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError>;

    /// Deserializes a frame back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are not valid UTF-8,
    /// are malformed, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// JSON is the only format the browser client speaks, so this is the
/// codec every server uses. It sits behind the `json` feature flag
/// (enabled by default).
///
/// ## Example
///
/// ```rust
/// use chroma_protocol::{ClientId, Codec, JsonCodec, ServerMessage};
///
/// let codec = JsonCodec;
/// let msg = ServerMessage::Connect { client_id: ClientId::from("c1") };
///
/// let text = codec.encode(&msg).unwrap();
/// assert_eq!(text, r#"{"method":"connect","clientId":"c1"}"#);
///
/// let back: ServerMessage = codec.decode(text.as_bytes()).unwrap();
/// assert_eq!(back, msg);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<String, ProtocolError> {
        serde_json::to_string(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        // `from_slice` validates UTF-8 itself, so a binary frame holding
        // garbage surfaces as an ordinary decode error.
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
