//! A room: the members of one live quiz and the fan-out over them.

use std::collections::BTreeMap;
use std::sync::Arc;

use quizroom_protocol::{Envelope, QuizId, UserId};
use tokio::sync::mpsc::error::TrySendError;

use crate::client::{ClientHandle, ClientId, Outbox};

/// A room member as the hub sees it: the handle plus the producing half of
/// its mailbox. Dropping a `Member` closes the mailbox.
pub(crate) struct Member {
    pub(crate) handle: ClientHandle,
    outbox: Outbox,
}

impl Member {
    pub(crate) fn new(handle: ClientHandle, outbox: Outbox) -> Self {
        Self { handle, outbox }
    }
}

/// Why an offer to a member failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Refusal {
    /// Mailbox at capacity: the consumer is too slow.
    Full,
    /// Mailbox consumer already gone.
    Closed,
}

/// Members of one quiz session, keyed (and therefore iterated) in join
/// order because client ids increase monotonically.
#[derive(Default)]
pub(crate) struct Room {
    members: BTreeMap<ClientId, Member>,
}

impl Room {
    pub(crate) fn len(&self) -> usize {
        self.members.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub(crate) fn insert(&mut self, member: Member) {
        self.members.insert(member.handle.id(), member);
    }

    pub(crate) fn remove(&mut self, id: ClientId) -> Option<Member> {
        self.members.remove(&id)
    }

    pub(crate) fn user_ids(&self) -> Vec<UserId> {
        self.members
            .values()
            .map(|m| m.handle.user_id().clone())
            .collect()
    }

    /// Offers `envelope` to every member except `skip` without waiting.
    ///
    /// Returns the members that could not take it; the caller must evict
    /// them. Membership itself is left untouched.
    pub(crate) fn offer(
        &self,
        quiz_id: &QuizId,
        envelope: &Arc<Envelope>,
        skip: Option<ClientId>,
    ) -> Vec<(ClientId, Refusal)> {
        let mut refused = Vec::new();
        for (id, member) in &self.members {
            if Some(*id) == skip {
                continue;
            }
            match member.outbox.try_send(Arc::clone(envelope)) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        %quiz_id,
                        client_id = %id,
                        user_id = %member.handle.user_id(),
                        kind = %envelope.kind,
                        "mailbox full, evicting slow member"
                    );
                    refused.push((*id, Refusal::Full));
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::debug!(
                        %quiz_id,
                        client_id = %id,
                        "mailbox already closed, evicting member"
                    );
                    refused.push((*id, Refusal::Closed));
                }
            }
        }
        refused
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Mailbox;

    fn member(user: &str, capacity: usize) -> (Member, Mailbox) {
        let (outbox, mailbox) = Mailbox::bounded(capacity);
        let handle = ClientHandle::new("Q1".into(), user.into());
        (Member::new(handle, outbox), mailbox)
    }

    #[test]
    fn test_offer_reaches_everyone_but_skip() {
        let mut room = Room::default();
        let (a, mut inbox_a) = member("a", 4);
        let (b, mut inbox_b) = member("b", 4);
        let a_id = a.handle.id();
        room.insert(a);
        room.insert(b);

        let envelope = Arc::new(Envelope::join("Q1".into(), "x".into()));
        let refused = room.offer(&"Q1".into(), &envelope, Some(a_id));

        assert!(refused.is_empty());
        assert!(inbox_a.try_recv().is_none());
        assert!(inbox_b.try_recv().is_some());
    }

    #[test]
    fn test_offer_reports_full_and_closed_without_removing() {
        let mut room = Room::default();
        let (full, _inbox_full) = member("full", 1);
        let (gone, inbox_gone) = member("gone", 4);
        let full_id = full.handle.id();
        let gone_id = gone.handle.id();
        room.insert(full);
        room.insert(gone);
        drop(inbox_gone);

        let envelope = Arc::new(Envelope::join("Q1".into(), "x".into()));
        room.offer(&"Q1".into(), &envelope, None);
        let refused = room.offer(&"Q1".into(), &envelope, None);

        assert!(refused.contains(&(full_id, Refusal::Full)));
        assert!(refused.contains(&(gone_id, Refusal::Closed)));
        assert_eq!(room.len(), 2);
    }
}
