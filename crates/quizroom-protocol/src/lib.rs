//! Wire protocol for Quizroom live rooms.
//!
//! This crate defines what travels between a quiz client and the hub:
//!
//! - **Types** ([`Envelope`], [`MessageKind`], [`InboundFrame`],
//!   [`AuthFrame`]): the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw frames) and the hub
//! (room membership). It knows nothing about connections or rooms, only
//! how to turn frames into envelopes and back.
//!
//! ```text
//! Transport (bytes) → Protocol (Envelope) → Hub (rooms, fan-out)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    AuthFrame, Envelope, InboundFrame, MessageKind, QuizId, UserId,
};
