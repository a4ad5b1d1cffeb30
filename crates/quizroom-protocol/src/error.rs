//! Error types for the protocol layer.
//!
//! Each crate in Quizroom defines its own error enum. A `ProtocolError`
//! always means the bytes on the wire were the problem, never the network
//! or the room state.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, wrong data
    /// types, or truncated frames.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The frame parsed but breaks a protocol rule, e.g. an auth frame
    /// with the wrong `type` or an empty token.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
