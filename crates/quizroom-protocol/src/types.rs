//! Core protocol types for Quizroom's wire format.
//!
//! One WebSocket frame carries one [`Envelope`]:
//!
//! ```text
//! { "quiz_id": "Q1", "type": "question", "content": { ... }, "user_id": "u-1" }
//! ```
//!
//! `content` is opaque to everything below the quiz UI: the hub routes it
//! without looking inside.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Identifier of a live quiz session (one room per quiz id).
///
/// Newtype over `String` so a quiz id can never be passed where a user id
/// is expected. `#[serde(transparent)]` keeps it a plain JSON string.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct QuizId(String);

impl QuizId {
    /// Creates a quiz id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QuizId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for QuizId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for QuizId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of an authenticated user, as issued by the user service.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Creates a user id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for UserId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// MessageKind
// ---------------------------------------------------------------------------

/// The `type` tag of an envelope.
///
/// `join` and `leave` are produced by the hub itself. `answer`, `question`
/// and `result` come from room members and are fanned out unchanged.
/// Any other tag decodes into [`MessageKind::Unknown`] instead of failing,
/// so the hub can drop it without tearing the connection down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A participant entered the room.
    Join,
    /// A participant left the room.
    Leave,
    /// A participant submitted an answer.
    Answer,
    /// The host pushed a question.
    Question,
    /// The host published results.
    Result,
    /// Unrecognized tag.
    #[serde(other)]
    Unknown,
}

impl MessageKind {
    /// Returns `true` for kinds that room members may send for fan-out.
    pub fn is_broadcast(self) -> bool {
        matches!(self, Self::Answer | Self::Question | Self::Result)
    }

    /// Returns `true` for membership notices only the hub may produce.
    pub fn is_system(self) -> bool {
        matches!(self, Self::Join | Self::Leave)
    }

    /// The wire spelling of this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Join => "join",
            Self::Leave => "leave",
            Self::Answer => "answer",
            Self::Question => "question",
            Self::Result => "result",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// The unit of exchange between the hub and room members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// The room this envelope belongs to.
    pub quiz_id: QuizId,

    /// What the envelope means.
    #[serde(rename = "type")]
    pub kind: MessageKind,

    /// Arbitrary structured payload, never inspected by the hub.
    #[serde(default)]
    pub content: Value,

    /// Who sent it. Absent on hub-generated join/leave notices.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl Envelope {
    /// Builds the notice broadcast when `user_id` enters `quiz_id`.
    pub fn join(quiz_id: QuizId, user_id: UserId) -> Self {
        Self::notice(quiz_id, MessageKind::Join, user_id, "New participant joined")
    }

    /// Builds the notice broadcast when `user_id` leaves `quiz_id`.
    pub fn leave(quiz_id: QuizId, user_id: UserId) -> Self {
        Self::notice(quiz_id, MessageKind::Leave, user_id, "Participant left")
    }

    fn notice(
        quiz_id: QuizId,
        kind: MessageKind,
        user_id: UserId,
        message: &str,
    ) -> Self {
        Self {
            quiz_id,
            kind,
            content: serde_json::json!({
                "user_id": user_id,
                "message": message,
            }),
            user_id: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound frames
// ---------------------------------------------------------------------------

/// What a client actually sends.
///
/// Clients may include `quiz_id` and `user_id`, but neither is trusted:
/// the connection's room and authenticated identity are stamped on by
/// [`InboundFrame::into_envelope`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InboundFrame {
    /// The envelope kind the client claims.
    #[serde(rename = "type")]
    pub kind: MessageKind,

    /// Opaque payload.
    #[serde(default)]
    pub content: Value,
}

impl InboundFrame {
    /// Stamps the connection's room and sender identity onto the frame.
    pub fn into_envelope(self, quiz_id: QuizId, user_id: UserId) -> Envelope {
        Envelope {
            quiz_id,
            kind: self.kind,
            content: self.content,
            user_id: Some(user_id),
        }
    }
}

/// First-frame credential: `{"type":"auth","content":{"token":"..."}}`.
///
/// Browser WebSocket clients cannot set an `Authorization` header, so the
/// quiz frontend sends its token in this frame right after opening.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthFrame {
    #[serde(rename = "type")]
    kind: String,
    content: AuthContent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AuthContent {
    token: String,
}

impl AuthFrame {
    /// The `type` tag an auth frame must carry.
    pub const TYPE: &'static str = "auth";

    /// Builds an auth frame carrying `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            kind: Self::TYPE.to_string(),
            content: AuthContent {
                token: token.into(),
            },
        }
    }

    /// Validates the frame and returns the token it carries.
    ///
    /// # Errors
    /// [`ProtocolError::InvalidMessage`] if the tag is not `auth` or the
    /// token is blank.
    pub fn into_token(self) -> Result<String, ProtocolError> {
        if self.kind != Self::TYPE {
            return Err(ProtocolError::InvalidMessage(format!(
                "expected auth frame, got type {:?}",
                self.kind
            )));
        }
        if self.content.token.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "auth frame carries an empty token".into(),
            ));
        }
        Ok(self.content.token)
    }
}

// =========================================================================
// Tests
// =========================================================================
