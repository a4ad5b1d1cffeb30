//! Room registry and broadcast hub for Quizroom.
//!
//! Every live quiz has a room; every admitted connection is a member of
//! exactly one room. A single [`Hub`] task owns all rooms and is the only
//! code that ever touches membership, so joins, leaves and fan-out are
//! serialized without locks.
//!
//! # Key types
//!
//! - [`Hub`]: the actor; [`Hub::spawn`] starts it
//! - [`HubHandle`]: register, unregister, dispatch and inspect
//! - [`ClientHandle`]: identity and state of one member
//! - [`Mailbox`]: a member's bounded outbound queue
//! - [`HubConfig`]: capacities and echo policy
//!
//! # Delivery
//!
//! Fan-out never waits on a member. An envelope that does not fit into a
//! member's mailbox costs that member its membership, and the rest of the
//! room is told with a `leave` notice.

mod client;
mod config;
mod error;
mod hub;
mod room;

pub use client::{ClientHandle, ClientId, ClientState, Mailbox};
pub use config::HubConfig;
pub use error::HubError;
pub use hub::{Hub, HubHandle, RoomInfo};
