//! The hub actor: sole owner of room membership.
//!
//! One Tokio task owns every room. Connections talk to it only through a
//! [`HubHandle`], whose methods push onto the hub's input queues:
//!
//! ```text
//! register   ─┐
//! unregister ─┼─→ Hub::run (select!, one event at a time) ─→ member mailboxes
//! inbound    ─┤
//! query      ─┘
//! ```
//!
//! Because every membership change and every fan-out decision happens in
//! that single loop, there is no lock around the room map.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use quizroom_protocol::{Envelope, QuizId, UserId};
use tokio::sync::{mpsc, oneshot};

use crate::client::{ClientHandle, ClientId, Mailbox, Outbox};
use crate::room::{Member, Refusal, Room};
use crate::{HubConfig, HubError};

/// A snapshot of one room's membership.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomInfo {
    /// The quiz session the room serves.
    pub quiz_id: QuizId,
    /// Members in join order (a user connected twice appears twice).
    pub members: Vec<UserId>,
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

struct Register {
    handle: ClientHandle,
    outbox: Outbox,
    reply: oneshot::Sender<Result<(), HubError>>,
}

struct Unregister {
    client_id: ClientId,
    reply: oneshot::Sender<bool>,
}

struct Inbound {
    envelope: Envelope,
    origin: Option<ClientId>,
}

enum Query {
    RoomSize {
        quiz_id: QuizId,
        reply: oneshot::Sender<Option<usize>>,
    },
    RoomCount {
        reply: oneshot::Sender<usize>,
    },
    Rooms {
        reply: oneshot::Sender<Vec<RoomInfo>>,
    },
}

// ---------------------------------------------------------------------------
// HubHandle
// ---------------------------------------------------------------------------

/// Handle to a running hub. Cheap to clone.
///
/// The hub task stops once every handle has been dropped.
#[derive(Clone)]
pub struct HubHandle {
    register: mpsc::Sender<Register>,
    unregister: mpsc::Sender<Unregister>,
    inbound: mpsc::Sender<Inbound>,
    query: mpsc::Sender<Query>,
    mailbox_capacity: usize,
}

impl HubHandle {
    /// Admits an authenticated connection into the room `quiz_id`.
    ///
    /// On success the member is in the room, a `join` notice naming
    /// `user_id` has been offered to every member (the new one included),
    /// and the returned [`Mailbox`] is ready to drain.
    ///
    /// # Errors
    /// - [`HubError::RoomFull`]: the room is at `max_room_size`
    /// - [`HubError::Unavailable`]: the hub task is gone
    pub async fn register(
        &self,
        quiz_id: QuizId,
        user_id: UserId,
    ) -> Result<(ClientHandle, Mailbox), HubError> {
        let handle = ClientHandle::new(quiz_id, user_id);
        let (outbox, mailbox) = Mailbox::bounded(self.mailbox_capacity);
        let (reply_tx, reply_rx) = oneshot::channel();
        self.register
            .send(Register {
                handle: handle.clone(),
                outbox,
                reply: reply_tx,
            })
            .await
            .map_err(|_| HubError::Unavailable)?;
        reply_rx.await.map_err(|_| HubError::Unavailable)??;
        Ok((handle, mailbox))
    }

    /// Removes a client from its room and closes its mailbox.
    ///
    /// Idempotent: returns `true` if this call removed the client, `false`
    /// if it was already gone (or the hub has stopped). Resolves once the
    /// hub has processed the request.
    pub async fn unregister(&self, client_id: ClientId) -> bool {
        let (reply_tx, reply_rx) = oneshot::channel();
        let sent = self
            .unregister
            .send(Unregister {
                client_id,
                reply: reply_tx,
            })
            .await;
        if sent.is_err() {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    /// Routes an envelope to its room on behalf of a connected client.
    ///
    /// `origin` identifies the sending connection so the hub can apply the
    /// echo policy and ignore senders that are no longer members.
    pub async fn dispatch_from(
        &self,
        origin: ClientId,
        envelope: Envelope,
    ) -> Result<(), HubError> {
        self.inbound
            .send(Inbound {
                envelope,
                origin: Some(origin),
            })
            .await
            .map_err(|_| HubError::Unavailable)
    }

    /// Routes an envelope that did not come from a room member, e.g. a
    /// question pushed by the quiz host service.
    pub async fn dispatch(&self, envelope: Envelope) -> Result<(), HubError> {
        self.inbound
            .send(Inbound {
                envelope,
                origin: None,
            })
            .await
            .map_err(|_| HubError::Unavailable)
    }

    /// Number of members in `quiz_id`, or `None` if the room does not exist.
    pub async fn room_size(
        &self,
        quiz_id: &QuizId,
    ) -> Result<Option<usize>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.ask(Query::RoomSize {
            quiz_id: quiz_id.clone(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| HubError::Unavailable)
    }

    /// Number of rooms currently in the registry.
    pub async fn room_count(&self) -> Result<usize, HubError> {
        let (reply, rx) = oneshot::channel();
        self.ask(Query::RoomCount { reply }).await?;
        rx.await.map_err(|_| HubError::Unavailable)
    }

    /// Snapshot of every room, ordered by quiz id.
    pub async fn rooms(&self) -> Result<Vec<RoomInfo>, HubError> {
        let (reply, rx) = oneshot::channel();
        self.ask(Query::Rooms { reply }).await?;
        rx.await.map_err(|_| HubError::Unavailable)
    }

    async fn ask(&self, query: Query) -> Result<(), HubError> {
        self.query
            .send(query)
            .await
            .map_err(|_| HubError::Unavailable)
    }
}

// ---------------------------------------------------------------------------
// Hub actor
// ---------------------------------------------------------------------------

/// What removing a member left behind.
struct Departure {
    quiz_id: QuizId,
    user_id: UserId,
    room_deleted: bool,
}

/// The hub's state. Lives inside the task started by [`Hub::spawn`].
pub struct Hub {
    config: HubConfig,
    rooms: HashMap<QuizId, Room>,
    /// Every registered client and the room it is in. A client is in
    /// exactly one room; absence here means it was already removed.
    clients: HashMap<ClientId, QuizId>,
    register_rx: mpsc::Receiver<Register>,
    unregister_rx: mpsc::Receiver<Unregister>,
    inbound_rx: mpsc::Receiver<Inbound>,
    query_rx: mpsc::Receiver<Query>,
}

impl Hub {
    /// Starts a hub task and returns a handle to it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(config: HubConfig) -> HubHandle {
        let config = config.normalized();
        let (register, register_rx) = mpsc::channel(config.queue_capacity);
        let (unregister, unregister_rx) =
            mpsc::channel(config.queue_capacity);
        let (inbound, inbound_rx) = mpsc::channel(config.queue_capacity);
        let (query, query_rx) = mpsc::channel(config.queue_capacity);

        let handle = HubHandle {
            register,
            unregister,
            inbound,
            query,
            mailbox_capacity: config.mailbox_capacity,
        };

        let hub = Hub {
            config,
            rooms: HashMap::new(),
            clients: HashMap::new(),
            register_rx,
            unregister_rx,
            inbound_rx,
            query_rx,
        };
        tokio::spawn(hub.run());

        handle
    }

    /// The control loop. Whichever queue is ready gets serviced next;
    /// `select!` picks among ready branches at random, so no queue can
    /// starve the others.
    async fn run(mut self) {
        tracing::info!(
            mailbox_capacity = self.config.mailbox_capacity,
            max_room_size = self.config.max_room_size,
            echo_to_sender = self.config.echo_to_sender,
            "hub started"
        );

        loop {
            tokio::select! {
                Some(cmd) = self.register_rx.recv() => self.handle_register(cmd),
                Some(cmd) = self.unregister_rx.recv() => {
                    let removed = self.handle_unregister(cmd.client_id);
                    let _ = cmd.reply.send(removed);
                }
                Some(msg) = self.inbound_rx.recv() => self.handle_inbound(msg),
                Some(query) = self.query_rx.recv() => self.handle_query(query),
                else => break,
            }
        }

        tracing::info!(rooms = self.rooms.len(), "hub stopped");
    }

    fn handle_register(&mut self, cmd: Register) {
        let Register {
            handle,
            outbox,
            reply,
        } = cmd;
        let quiz_id = handle.quiz_id().clone();
        let size = self.rooms.get(&quiz_id).map_or(0, Room::len);

        if size >= self.config.max_room_size {
            tracing::warn!(
                %quiz_id,
                user_id = %handle.user_id(),
                limit = self.config.max_room_size,
                "room full, registration refused"
            );
            let _ = reply.send(Err(HubError::RoomFull {
                quiz_id,
                limit: self.config.max_room_size,
            }));
            return;
        }

        // The caller gave up before we got here; nobody would drain or
        // unregister this client.
        if reply.send(Ok(())).is_err() {
            tracing::debug!(%quiz_id, "registration abandoned by caller");
            return;
        }

        let client_id = handle.id();
        let user_id = handle.user_id().clone();
        let room = self.rooms.entry(quiz_id.clone()).or_insert_with(|| {
            tracing::info!(%quiz_id, "room created");
            Room::default()
        });
        room.insert(Member::new(handle, outbox));
        let members = room.len();
        self.clients.insert(client_id, quiz_id.clone());

        tracing::info!(%quiz_id, %client_id, %user_id, members, "member joined");

        self.deliver(quiz_id.clone(), Envelope::join(quiz_id, user_id), None);
    }

    fn handle_unregister(&mut self, client_id: ClientId) -> bool {
        match self.remove_member(client_id) {
            Some(departure) => {
                tracing::info!(
                    quiz_id = %departure.quiz_id,
                    %client_id,
                    user_id = %departure.user_id,
                    "member left"
                );
                if !departure.room_deleted {
                    let notice = Envelope::leave(
                        departure.quiz_id.clone(),
                        departure.user_id,
                    );
                    self.deliver(departure.quiz_id, notice, None);
                }
                true
            }
            None => {
                tracing::debug!(%client_id, "unregister for unknown client ignored");
                false
            }
        }
    }

    fn handle_inbound(&mut self, msg: Inbound) {
        let Inbound { envelope, origin } = msg;
        let quiz_id = envelope.quiz_id.clone();

        if !envelope.kind.is_broadcast() {
            if envelope.kind.is_system() {
                tracing::debug!(
                    %quiz_id,
                    kind = %envelope.kind,
                    "membership notices are hub-generated, dropping"
                );
            } else {
                tracing::debug!(%quiz_id, "unrecognized message kind, dropping");
            }
            return;
        }

        if let Some(origin) = origin {
            if self.clients.get(&origin) != Some(&quiz_id) {
                tracing::debug!(
                    %quiz_id,
                    client_id = %origin,
                    "message from non-member, ignoring"
                );
                return;
            }
        }

        if !self.rooms.contains_key(&quiz_id) {
            tracing::debug!(%quiz_id, "no such room, dropping message");
            return;
        }

        let skip = if self.config.echo_to_sender { None } else { origin };
        self.deliver(quiz_id, envelope, skip);
    }

    fn handle_query(&self, query: Query) {
        match query {
            Query::RoomSize { quiz_id, reply } => {
                let _ = reply.send(self.rooms.get(&quiz_id).map(Room::len));
            }
            Query::RoomCount { reply } => {
                let _ = reply.send(self.rooms.len());
            }
            Query::Rooms { reply } => {
                let mut rooms: Vec<RoomInfo> = self
                    .rooms
                    .iter()
                    .map(|(quiz_id, room)| RoomInfo {
                        quiz_id: quiz_id.clone(),
                        members: room.user_ids(),
                    })
                    .collect();
                rooms.sort_by(|a, b| a.quiz_id.cmp(&b.quiz_id));
                let _ = reply.send(rooms);
            }
        }
    }

    /// Fans `envelope` out to its room, evicting members that cannot keep
    /// up. Each eviction produces a `leave` notice for the rest of the
    /// room, which is delivered the same way.
    fn deliver(&mut self, quiz_id: QuizId, envelope: Envelope, skip: Option<ClientId>) {
        let mut pending = VecDeque::from([(quiz_id, Arc::new(envelope), skip)]);

        while let Some((quiz_id, envelope, skip)) = pending.pop_front() {
            let refused = match self.rooms.get(&quiz_id) {
                Some(room) => room.offer(&quiz_id, &envelope, skip),
                None => continue,
            };

            for (client_id, refusal) in refused {
                let Some(departure) = self.remove_member(client_id) else {
                    continue;
                };
                if refusal == Refusal::Full {
                    tracing::warn!(
                        quiz_id = %departure.quiz_id,
                        user_id = %departure.user_id,
                        error = %HubError::Backpressure(client_id),
                        "slow member disconnected"
                    );
                }
                if !departure.room_deleted {
                    let notice = Envelope::leave(
                        departure.quiz_id.clone(),
                        departure.user_id,
                    );
                    pending.push_back((departure.quiz_id, Arc::new(notice), None));
                }
            }
        }
    }

    /// Removes a client from its room, marks it closing, and closes its
    /// mailbox. Deletes the room if it is now empty.
    fn remove_member(&mut self, client_id: ClientId) -> Option<Departure> {
        let quiz_id = self.clients.remove(&client_id)?;
        let room = self.rooms.get_mut(&quiz_id)?;
        let member = room.remove(client_id)?;
        let room_deleted = room.is_empty();

        member.handle.mark_closing();
        let user_id = member.handle.user_id().clone();
        // Dropping the member drops the only sender: the mailbox is closed.
        drop(member);

        if room_deleted {
            self.rooms.remove(&quiz_id);
            tracing::info!(%quiz_id, "room deleted");
        }

        Some(Departure {
            quiz_id,
            user_id,
            room_deleted,
        })
    }
}
