//! Error types for the protocol layer.
//!
//! Each crate in Chroma defines its own error enum. A `ProtocolError`
//! always means a frame could not be turned into a message (or back),
//! never that the message was rejected by game rules.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into a frame).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning a frame into a Rust type).
    ///
    /// Common causes: malformed JSON, a frame that is not an object, or a
    /// missing or unknown `method`. Request fields of the wrong JSON
    /// type are not decode errors; they read as absent.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
