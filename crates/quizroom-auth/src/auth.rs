//! The authentication hook consumed by connection admission.
//!
//! Quizroom does not own user accounts. The user service issues tokens;
//! the live-room server only needs to turn a presented credential into a
//! [`UserId`] once, before the connection joins a room. [`Authenticator`]
//! is that seam: production wires in [`JwtAuthenticator`](crate::JwtAuthenticator),
//! tests wire in something trivial.

use std::future::Future;

use quizroom_protocol::UserId;

use crate::AuthError;

/// Validates a bearer credential and returns the caller's identity.
///
/// Called exactly once per connection. The identity is attached to the
/// client handle for the connection's whole lifetime; nothing re-validates
/// it later.
///
/// # Example
///
/// ```rust
/// use quizroom_auth::{AuthError, Authenticator};
/// use quizroom_protocol::UserId;
///
/// /// Treats the credential itself as the user id. Development only.
/// struct DevAuthenticator;
///
/// impl Authenticator for DevAuthenticator {
///     async fn authenticate(&self, credential: &str) -> Result<UserId, AuthError> {
///         if credential.is_empty() {
///             return Err(AuthError::MissingCredential);
///         }
///         Ok(UserId::from(credential))
///     }
/// }
/// ```
pub trait Authenticator: Send + Sync + 'static {
    /// Validates `credential` and returns who presented it.
    ///
    /// # Errors
    /// Any [`AuthError`]; the connection is then refused.
    fn authenticate(
        &self,
        credential: &str,
    ) -> impl Future<Output = Result<UserId, AuthError>> + Send;
}
