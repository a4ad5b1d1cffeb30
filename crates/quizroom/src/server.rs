//! `QuizRoomServer` builder and accept loop.
//!
//! This is the entry point for running a quiz room server. It ties the
//! layers together: transport → auth gate → hub, with the per-connection
//! handler in between.

use std::net::SocketAddr;
use std::sync::Arc;

use quizroom_auth::Authenticator;
use quizroom_hub::{Hub, HubConfig, HubHandle};
use quizroom_protocol::{Codec, JsonCodec};
use quizroom_transport::{
    DEFAULT_MAX_MESSAGE_SIZE, Handshake, Transport, WebSocketTransport,
};

use crate::handler::handle_connection;
use crate::{ConnectionConfig, QuizRoomError};

/// Shared server state passed to each connection handler task.
///
/// Nothing in here needs a lock: room membership lives inside the hub
/// task and is reached through the cloneable [`HubHandle`].
pub(crate) struct ServerState<A, C> {
    pub(crate) hub: HubHandle,
    pub(crate) auth: A,
    pub(crate) codec: C,
    pub(crate) connection: ConnectionConfig,
}

/// Builder for configuring and starting a quiz room server.
///
/// # Example
///
/// ```rust,no_run
/// use quizroom::prelude::*;
///
/// # async fn run() -> Result<(), QuizRoomError> {
/// let server = QuizRoomServer::builder()
///     .bind("0.0.0.0:8083")
///     .build(JwtAuthenticator::new(b"secret"))
///     .await?;
/// server.run().await
/// # }
/// ```
pub struct QuizRoomServerBuilder {
    bind_addr: String,
    hub_config: HubConfig,
    connection_config: ConnectionConfig,
    max_message_size: usize,
}

impl QuizRoomServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            bind_addr: "127.0.0.1:8083".to_string(),
            hub_config: HubConfig::default(),
            connection_config: ConnectionConfig::default(),
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.bind_addr = addr.to_string();
        self
    }

    /// Sets mailbox, queue and room limits.
    pub fn hub_config(mut self, config: HubConfig) -> Self {
        self.hub_config = config;
        self
    }

    /// Sets per-connection timeouts and rate limit.
    pub fn connection_config(mut self, config: ConnectionConfig) -> Self {
        self.connection_config = config;
        self
    }

    /// Sets the largest inbound message accepted from a client.
    pub fn max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Binds the listener and starts the hub.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`.
    pub async fn build<A: Authenticator>(
        self,
        auth: A,
    ) -> Result<QuizRoomServer<A, JsonCodec>, QuizRoomError> {
        let transport = WebSocketTransport::bind(&self.bind_addr)
            .await?
            .with_max_message_size(self.max_message_size);

        let state = Arc::new(ServerState {
            hub: Hub::spawn(self.hub_config),
            auth,
            codec: JsonCodec,
            connection: self.connection_config,
        });

        Ok(QuizRoomServer { transport, state })
    }
}

impl Default for QuizRoomServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A quiz room server, bound and ready.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct QuizRoomServer<A, C> {
    transport: WebSocketTransport,
    state: Arc<ServerState<A, C>>,
}

impl QuizRoomServer<(), JsonCodec> {
    /// Creates a new builder.
    pub fn builder() -> QuizRoomServerBuilder {
        QuizRoomServerBuilder::new()
    }
}

impl<A, C> QuizRoomServer<A, C>
where
    A: Authenticator,
    C: Codec,
{
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// A handle to the server's hub, e.g. to push questions into a room
    /// or inspect membership.
    pub fn hub(&self) -> HubHandle {
        self.state.hub.clone()
    }

    /// Runs the accept loop.
    ///
    /// Each accepted stream gets its own task, which runs the WebSocket
    /// upgrade (bounded by the handshake timeout) and then the handler.
    /// Runs until the process is terminated; a failed accept is logged and
    /// skipped.
    pub async fn run(mut self) -> Result<(), QuizRoomError> {
        tracing::info!(addr = ?self.local_addr().ok(), "quiz room server running");

        loop {
            match self.transport.accept().await {
                Ok(pending) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        let peer = pending.peer_addr();
                        let timeout = state.connection.handshake_timeout();
                        let conn = match tokio::time::timeout(timeout, pending.complete()).await {
                            Ok(Ok(conn)) => conn,
                            Ok(Err(e)) => {
                                tracing::debug!(%peer, error = %e, "upgrade failed");
                                return;
                            }
                            Err(_) => {
                                tracing::debug!(%peer, "upgrade timed out");
                                return;
                            }
                        };
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
