//! Hub configuration.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// HubConfig
// ---------------------------------------------------------------------------

/// Bounds and delivery policy for one hub instance.
///
/// Every limit here is fixed for the hub's lifetime: a mailbox never grows,
/// and a full mailbox costs its owner the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Envelopes a member's mailbox holds before the member is evicted.
    pub mailbox_capacity: usize,

    /// Capacity of each of the hub's input queues (register, unregister,
    /// inbound envelopes, queries).
    pub queue_capacity: usize,

    /// Maximum members per room. Registration beyond this fails.
    pub max_room_size: usize,

    /// Whether the sender of an `answer`/`question`/`result` receives its
    /// own envelope back.
    pub echo_to_sender: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            mailbox_capacity: 64,
            queue_capacity: 1024,
            max_room_size: 512,
            echo_to_sender: true,
        }
    }
}

impl HubConfig {
    /// Clamps zero capacities up to one; tokio channels reject zero.
    pub(crate) fn normalized(mut self) -> Self {
        self.mailbox_capacity = self.mailbox_capacity.max(1);
        self.queue_capacity = self.queue_capacity.max(1);
        self
    }
}
