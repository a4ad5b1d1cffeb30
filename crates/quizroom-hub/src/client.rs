//! Client handles and their mailboxes.
//!
//! A connection that passed admission is represented by a [`ClientHandle`]
//! (who it is, which room it belongs to, whether it is still active) and a
//! [`Mailbox`] (its bounded outbound queue). The hub keeps the producing
//! half of the mailbox; the connection's writer drains the consuming half.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use quizroom_protocol::{Envelope, QuizId, UserId};
use tokio::sync::mpsc;

/// Counter for generating unique client IDs.
static NEXT_CLIENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of one admitted connection.
///
/// The same user connected twice is two clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClientId(u64);

impl ClientId {
    pub(crate) fn next() -> Self {
        Self(NEXT_CLIENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client-{}", self.0)
    }
}

/// Lifecycle of a client handle.
///
/// ```text
/// Active ──(unregister / eviction)──→ Closing
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Member of its room; receives broadcasts.
    Active,
    /// Removed from its room; its mailbox is closed or about to be.
    Closing,
}

/// Identity and room of one admitted connection.
///
/// Cheap to clone; clones share the same state flag, so the hub marking a
/// handle closing is visible to the connection's reader.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    id: ClientId,
    quiz_id: QuizId,
    user_id: UserId,
    closing: Arc<AtomicBool>,
}

impl ClientHandle {
    pub(crate) fn new(quiz_id: QuizId, user_id: UserId) -> Self {
        Self {
            id: ClientId::next(),
            quiz_id,
            user_id,
            closing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// This client's unique id.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// The room this client belongs to.
    pub fn quiz_id(&self) -> &QuizId {
        &self.quiz_id
    }

    /// The authenticated identity attached at admission.
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        if self.closing.load(Ordering::Acquire) {
            ClientState::Closing
        } else {
            ClientState::Active
        }
    }

    /// Shorthand for `state() == ClientState::Active`.
    pub fn is_active(&self) -> bool {
        self.state() == ClientState::Active
    }

    pub(crate) fn mark_closing(&self) {
        self.closing.store(true, Ordering::Release);
    }
}

/// Producing half of a mailbox, owned by the hub.
pub(crate) type Outbox = mpsc::Sender<Arc<Envelope>>;

/// Consuming half of a client's bounded outbound queue.
///
/// Envelopes come out in the order the hub enqueued them. Once the hub
/// closes the mailbox, [`recv`](Self::recv) drains what is left and then
/// returns `None`.
#[derive(Debug)]
pub struct Mailbox {
    receiver: mpsc::Receiver<Arc<Envelope>>,
}

impl Mailbox {
    /// Creates a mailbox with a fixed capacity.
    pub(crate) fn bounded(capacity: usize) -> (Outbox, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { receiver: rx })
    }

    /// Waits for the next envelope; `None` once closed and drained.
    pub async fn recv(&mut self) -> Option<Arc<Envelope>> {
        self.receiver.recv().await
    }

    /// Takes the next envelope if one is already queued.
    pub fn try_recv(&mut self) -> Option<Arc<Envelope>> {
        self.receiver.try_recv().ok()
    }

    /// Number of envelopes waiting to be written.
    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    /// Returns `true` if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }

    /// Returns `true` once the hub has dropped the producing half.
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}
