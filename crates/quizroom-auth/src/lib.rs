//! Authentication gate for Quizroom.
//!
//! Admission runs exactly once per connection, before any client handle
//! exists:
//!
//! 1. **Credential lookup**: [`Credential::from_request`] finds the bearer
//!    token on the upgrade request (header or `token` query parameter).
//! 2. **Verification**: an [`Authenticator`] turns the token into a
//!    [`UserId`](quizroom_protocol::UserId) or an [`AuthError`].
//!
//! # How it fits in the stack
//!
//! ```text
//! Adapter (above)   ← admits connections, attaches the identity
//!     ↕
//! Auth gate (this crate)   ← credential → identity
//!     ↕
//! Transport/Protocol (below)   ← upgrade request, UserId
//! ```

mod auth;
mod credential;
mod error;
mod jwt;

pub use auth::Authenticator;
pub use credential::{Credential, TOKEN_QUERY_PARAM};
pub use error::AuthError;
pub use jwt::JwtAuthenticator;
