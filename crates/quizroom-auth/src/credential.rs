//! Locating the bearer credential on an upgrade request.

use quizroom_transport::UpgradeRequest;

/// Query parameter carrying the token for clients that cannot set headers.
pub const TOKEN_QUERY_PARAM: &str = "token";

/// A bearer credential found on the opening request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Extracts the credential from the request, if one was presented.
    ///
    /// An `Authorization: Bearer <token>` header takes precedence over the
    /// `token` query parameter. Blank values count as absent.
    pub fn from_request(request: &UpgradeRequest) -> Option<Self> {
        request
            .authorization
            .as_deref()
            .and_then(bearer_token)
            .or_else(|| request.query_param(TOKEN_QUERY_PARAM))
            .filter(|token| !token.trim().is_empty())
            .map(Self)
    }

    /// Wraps a token received some other way (e.g. an auth frame).
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Parses `Bearer <token>`; the scheme is case-insensitive.
fn bearer_token(header: &str) -> Option<String> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}
