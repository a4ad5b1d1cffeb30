//! Transport abstraction layer for Quizroom.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the network protocol a quiz client speaks, plus the [`UpgradeRequest`]
//! captured while the connection was being established (the room path and
//! any credential the client presented).
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{
    DEFAULT_MAX_MESSAGE_SIZE, PendingWebSocket, WebSocketConnection,
    WebSocketTransport,
};

use std::fmt;
use std::future::Future;

/// Close code for a peer that violated server policy (RFC 6455 §7.4.1).
pub const CLOSE_POLICY_VIOLATION: u16 = 1008;

/// Close code asking the peer to retry later (RFC 6455 registry).
pub const CLOSE_TRY_AGAIN_LATER: u16 = 1013;

/// Close code for a normal shutdown of the connection.
pub const CLOSE_NORMAL: u16 = 1000;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// The parts of the client's opening request that outlive the handshake.
///
/// Framing and handshake mechanics stay inside the transport; higher layers
/// only need the addressing (path and query) and the `Authorization` header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpgradeRequest {
    /// Request path, e.g. `/ws/quiz123`.
    pub path: String,
    /// Raw query string without the leading `?`.
    pub query: Option<String>,
    /// Value of the `Authorization` header, if sent.
    pub authorization: Option<String>,
}

impl UpgradeRequest {
    /// Parses a request target such as `/ws/q1?token=abc`.
    pub fn from_target(target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, Some(query.to_string())),
            None => (target, None),
        };
        Self {
            path: path.to_string(),
            query,
            authorization: None,
        }
    }

    /// Returns the percent-decoded value of a query parameter.
    ///
    /// The first occurrence wins. Values that are not valid UTF-8 after
    /// decoding are treated as absent.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.query.as_deref()?;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('=').or(Some((pair, ""))))
            .find(|(key, _)| *key == name)
            .and_then(|(_, value)| {
                let value = value.replace('+', " ");
                urlencoding::decode(&value).ok().map(|v| v.into_owned())
            })
    }

    /// Returns the percent-decoded non-empty path segments.
    pub fn path_segments(&self) -> Vec<String> {
        self.path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .filter_map(|segment| {
                urlencoding::decode(segment).ok().map(|s| s.into_owned())
            })
            .collect()
    }
}

/// Accepts new incoming connections.
///
/// Accepting and upgrading are separate steps: [`accept`](Self::accept)
/// only takes the raw stream off the listener, and the protocol handshake
/// runs later through [`Handshake::complete`], so a peer that stalls its
/// handshake never holds up the accept loop.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// An accepted stream whose handshake has not run yet.
    type Pending: Handshake<Connection = Self::Connection, Error = Self::Error>;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming stream.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Pending, Self::Error>> + Send;
}

/// The second half of accepting a connection.
pub trait Handshake: Send + 'static {
    /// The connection produced once the handshake succeeds.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync;

    /// Runs the protocol handshake. Callers bound this with a timeout.
    fn complete(
        self,
    ) -> impl Future<Output = Result<Self::Connection, Self::Error>> + Send;
}

/// A single message-framed duplex connection.
///
/// Reads and writes may run concurrently from different tasks: one task
/// awaiting [`recv`](Self::recv) never blocks another inside
/// [`send`](Self::send).
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Sends a binary frame to the remote peer.
    fn send(
        &self,
        data: &[u8],
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Sends a text frame to the remote peer.
    ///
    /// Defaults to a binary send for transports without text framing.
    fn send_text(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send {
        self.send(text.as_bytes())
    }

    /// Receives the next frame from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, Self::Error>> + Send;

    /// Closes the connection with a status code and a short reason.
    fn close_with(
        &self,
        code: u16,
        reason: &str,
    ) -> impl Future<Output = Result<(), Self::Error>> + Send;

    /// Closes the connection normally.
    fn close(&self) -> impl Future<Output = Result<(), Self::Error>> + Send {
        self.close_with(CLOSE_NORMAL, "")
    }

    /// Returns the request the client opened this connection with.
    fn request(&self) -> &UpgradeRequest;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_id_new_and_into_inner() {
        let id = ConnectionId::new(42);
        assert_eq!(id.into_inner(), 42);
    }

    #[test]
    fn test_connection_id_display() {
        let id = ConnectionId::new(7);
        assert_eq!(id.to_string(), "conn-7");
    }

    #[test]
    fn test_upgrade_request_splits_path_and_query() {
        let req = UpgradeRequest::from_target("/ws/quiz123?token=abc");
        assert_eq!(req.path, "/ws/quiz123");
        assert_eq!(req.query.as_deref(), Some("token=abc"));
        assert!(req.authorization.is_none());
    }

    #[test]
    fn test_query_param_is_percent_decoded() {
        let req = UpgradeRequest::from_target("/ws/q?a=1&token=x%2By%3D&b");
        assert_eq!(req.query_param("token").as_deref(), Some("x+y="));
        assert_eq!(req.query_param("a").as_deref(), Some("1"));
        assert_eq!(req.query_param("b").as_deref(), Some(""));
        assert_eq!(req.query_param("missing"), None);
    }

    #[test]
    fn test_query_param_first_occurrence_wins() {
        let req = UpgradeRequest::from_target("/?token=first&token=second");
        assert_eq!(req.query_param("token").as_deref(), Some("first"));
    }

    #[test]
    fn test_path_segments_skip_empty_and_decode() {
        let req = UpgradeRequest::from_target("//ws/quiz%20night/");
        assert_eq!(req.path_segments(), vec!["ws", "quiz night"]);
    }

    #[test]
    fn test_path_without_query() {
        let req = UpgradeRequest::from_target("/ws/q1");
        assert_eq!(req.query, None);
        assert_eq!(req.query_param("token"), None);
    }
}
