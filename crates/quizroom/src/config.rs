//! Per-connection limits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Limits applied to every admitted connection.
///
/// Timeouts are whole seconds, as they are set from the command line and
/// environment. Zero disables the idle timeout and the rate limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Bounds the WebSocket upgrade and, for a client without a header or
    /// query credential, the wait for its auth frame.
    pub handshake_timeout_secs: u64,

    /// Disconnect a member after this long without an inbound frame.
    pub idle_timeout_secs: u64,

    /// Inbound frames accepted per one-second window; the rest are dropped.
    pub max_frames_per_second: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_secs: 5,
            idle_timeout_secs: 300,
            max_frames_per_second: 20,
        }
    }
}

impl ConnectionConfig {
    /// The auth-frame deadline. Never zero, so a client always gets a
    /// chance to send it.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_secs.max(1))
    }

    /// The idle deadline, or `None` when disabled.
    pub fn idle_timeout(&self) -> Option<Duration> {
        (self.idle_timeout_secs > 0).then(|| Duration::from_secs(self.idle_timeout_secs))
    }
}
