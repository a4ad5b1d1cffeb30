//! Unified error type for the Quizroom server.

use quizroom_auth::AuthError;
use quizroom_hub::HubError;
use quizroom_protocol::ProtocolError;
use quizroom_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant generates the `From` impl, so
/// `?` converts layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum QuizRoomError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid message).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The connection failed authentication.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The hub refused or is gone.
    #[error(transparent)]
    Hub(#[from] HubError),

    /// The connection was refused before authentication, e.g. a request
    /// path that names no room.
    #[error("admission refused: {0}")]
    Admission(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::ConnectionClosed("gone".into());
        let err: QuizRoomError = err.into();
        assert!(matches!(err, QuizRoomError::Transport(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::InvalidMessage("bad".into());
        let err: QuizRoomError = err.into();
        assert!(matches!(err, QuizRoomError::Protocol(_)));
    }

    #[test]
    fn test_from_auth_error() {
        let err: QuizRoomError = AuthError::MissingCredential.into();
        assert!(matches!(err, QuizRoomError::Auth(_)));
        assert_eq!(err.to_string(), "credential is required");
    }

    #[test]
    fn test_from_hub_error() {
        let err: QuizRoomError = HubError::RoomFull {
            quiz_id: "Q1".into(),
            limit: 2,
        }
        .into();
        assert!(matches!(err, QuizRoomError::Hub(HubError::RoomFull { .. })));
        assert!(err.to_string().contains("Q1"));
    }

    #[test]
    fn test_admission_message() {
        let err = QuizRoomError::Admission("invalid room path".into());
        assert_eq!(err.to_string(), "admission refused: invalid room path");
    }
}
