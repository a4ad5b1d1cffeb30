//! HS256 token verification compatible with the quiz user service.
//!
//! The user service signs tokens with a shared secret and puts the account
//! id in a string `user_id` claim. Tokens carry `exp`, but older ones may
//! not, so expiry is enforced only when the claim is present.

use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use quizroom_protocol::UserId;
use serde::Deserialize;

use crate::{AuthError, Authenticator};

/// Claims the gate reads; everything else in the token is ignored.
#[derive(Debug, Deserialize)]
struct Claims {
    #[serde(default)]
    user_id: Option<String>,
}

/// Verifies HS256 tokens signed with a shared secret.
#[derive(Clone)]
pub struct JwtAuthenticator {
    key: DecodingKey,
    validation: Validation,
}

impl JwtAuthenticator {
    /// Creates an authenticator for tokens signed with `secret`.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.required_spec_claims.clear();
        validation.validate_aud = false;
        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    /// Verifies `token` and extracts the user id.
    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.key, &self.validation)
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        match data.claims.user_id {
            Some(id) if !id.trim().is_empty() => Ok(UserId::from(id)),
            _ => Err(AuthError::MissingClaim("user_id")),
        }
    }
}

impl std::fmt::Debug for JwtAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuthenticator")
            .field("algorithms", &self.validation.algorithms)
            .finish_non_exhaustive()
    }
}

impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, credential: &str) -> Result<UserId, AuthError> {
        let result = self.verify(credential);
        if let Err(e) = &result {
            tracing::debug!(error = %e, "token rejected");
        }
        result
    }
}
