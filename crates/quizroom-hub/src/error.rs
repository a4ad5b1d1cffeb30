//! Error types for the hub layer.

use quizroom_protocol::QuizId;

use crate::ClientId;

/// Errors that can occur during hub operations.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// The room already holds the configured maximum of members.
    #[error("room {quiz_id} is full ({limit} members)")]
    RoomFull {
        /// The room that refused the member.
        quiz_id: QuizId,
        /// The configured member limit.
        limit: usize,
    },

    /// A member's mailbox overflowed and the member was evicted.
    ///
    /// Only ever logged; other members never see it.
    #[error("mailbox of {0} is full, member evicted")]
    Backpressure(ClientId),

    /// The hub task is no longer running.
    #[error("hub is unavailable")]
    Unavailable,
}
