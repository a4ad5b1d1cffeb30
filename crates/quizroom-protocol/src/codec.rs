//! Codec trait and the JSON implementation.
//!
//! A codec converts between Rust types and frame bytes. The adapter pumps
//! are generic over [`Codec`], so the hub never cares how envelopes look on
//! the wire. Quiz clients speak JSON, so [`JsonCodec`] is the only codec
//! shipped today.

use serde::{de::DeserializeOwned, Serialize};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// - `Send + Sync` → one codec instance is shared by every connection task.
/// - `'static` → it lives as long as the server.
/// - `Clone` → each pump task can hold its own copy.
pub trait Codec: Send + Sync + Clone + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use quizroom_protocol::{Codec, Envelope, JsonCodec, MessageKind, QuizId, UserId};
///
/// let codec = JsonCodec;
///
/// let envelope = Envelope {
///     quiz_id: QuizId::from("Q1"),
///     kind: MessageKind::Question,
///     content: serde_json::json!({ "text": "2+2?" }),
///     user_id: Some(UserId::from("alice")),
/// };
///
/// let bytes = codec.encode(&envelope).unwrap();
/// let decoded: Envelope = codec.decode(&bytes).unwrap();
/// assert_eq!(envelope, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(
        &self,
        value: &T,
    ) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(
        &self,
        data: &[u8],
    ) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}
