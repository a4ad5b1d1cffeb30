//! Error types for the authentication gate.

/// Why a connection was refused admission.
///
/// Every variant ends the connection before a client handle exists; none
/// of them is ever seen by a room.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The client presented no credential at all.
    #[error("credential is required")]
    MissingCredential,

    /// The credential was malformed, badly signed, or expired.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The token verified but lacks a claim the gate needs.
    #[error("token is missing the {0} claim")]
    MissingClaim(&'static str),
}
