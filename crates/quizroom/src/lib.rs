//! # Quizroom
//!
//! Real-time broadcast server for live quiz sessions.
//!
//! Clients open a WebSocket on `/ws/{quiz_id}`, authenticate once, and
//! become members of that quiz's room. Everything a member sends
//! (`answer`, `question`, `result`) is fanned out to the whole room, and
//! the room is told when someone joins or leaves.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use quizroom::prelude::*;
//!
//! # async fn run() -> Result<(), QuizRoomError> {
//! let server = QuizRoomServerBuilder::new()
//!     .bind("0.0.0.0:8083")
//!     .build(JwtAuthenticator::new(b"shared-secret"))
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::ConnectionConfig;
pub use error::QuizRoomError;
pub use quizroom_transport::DEFAULT_MAX_MESSAGE_SIZE;
pub use server::{QuizRoomServer, QuizRoomServerBuilder};

pub mod prelude {
    //! Everything needed to run a server or embed the hub.

    pub use crate::{ConnectionConfig, QuizRoomError, QuizRoomServer, QuizRoomServerBuilder};
    pub use quizroom_auth::{AuthError, Authenticator, JwtAuthenticator};
    pub use quizroom_hub::{Hub, HubConfig, HubError, HubHandle};
    pub use quizroom_protocol::{Envelope, MessageKind, QuizId, UserId};
}
