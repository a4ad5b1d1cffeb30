//! WebSocket transport implementation using `tokio-tungstenite`.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request, Response,
};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, WebSocketConfig};
use tokio_tungstenite::tungstenite::Message;

use crate::{
    Connection, ConnectionId, Handshake, Transport, TransportError,
    UpgradeRequest,
};

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Default upper bound on a single inbound message.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    max_message_size: usize,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr, "WebSocket transport listening");
        Ok(Self {
            listener,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
        })
    }

    /// Sets the largest inbound message accepted before the connection is
    /// failed by the WebSocket layer.
    pub fn with_max_message_size(mut self, bytes: usize) -> Self {
        self.max_message_size = bytes;
        self
    }

    /// Returns the local address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    fn config(&self) -> WebSocketConfig {
        let mut config = WebSocketConfig::default();
        config.max_message_size = Some(self.max_message_size);
        config.max_frame_size = Some(self.max_message_size);
        config
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;
    type Pending = PendingWebSocket;
    type Error = TransportError;

    async fn accept(&mut self) -> Result<Self::Pending, Self::Error> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        Ok(PendingWebSocket {
            stream,
            peer,
            config: self.config(),
        })
    }
}

/// A TCP stream taken off the listener, waiting for its HTTP upgrade.
pub struct PendingWebSocket {
    stream: TcpStream,
    peer: SocketAddr,
    config: WebSocketConfig,
}

impl PendingWebSocket {
    /// Returns the remote peer's address.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Handshake for PendingWebSocket {
    type Connection = WebSocketConnection;
    type Error = TransportError;

    async fn complete(self) -> Result<Self::Connection, Self::Error> {
        let Self {
            stream,
            peer,
            config,
        } = self;

        // The callback runs during the HTTP upgrade; keep what we need
        // from the request before it is discarded.
        let mut captured: Option<UpgradeRequest> = None;
        let callback = |req: &Request,
                        resp: Response|
         -> Result<Response, ErrorResponse> {
            let target = req
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            let mut request = UpgradeRequest::from_target(target);
            request.authorization = req
                .headers()
                .get("authorization")
                .and_then(|value| value.to_str().ok())
                .map(str::to_string);
            captured = Some(request);
            Ok(resp)
        };

        let ws = tokio_tungstenite::accept_hdr_async_with_config(
            stream,
            callback,
            Some(config),
        )
        .await
        .map_err(|e| {
            TransportError::AcceptFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                e,
            ))
        })?;

        let request = captured.ok_or_else(|| {
            TransportError::AcceptFailed(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                "upgrade completed without a request",
            ))
        })?;

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %peer, path = %request.path, "accepted WebSocket connection");

        let (sink, stream) = ws.split();
        Ok(WebSocketConnection {
            id,
            request,
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
        })
    }
}

/// A single WebSocket connection.
///
/// The read and write halves sit behind separate locks so a reader parked
/// in [`recv`](Connection::recv) never holds up a writer.
pub struct WebSocketConnection {
    id: ConnectionId,
    request: UpgradeRequest,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl WebSocketConnection {
    async fn write(&self, msg: Message) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(msg)
            .await
            .map_err(TransportError::send)
    }
}

impl Connection for WebSocketConnection {
    type Error = TransportError;

    async fn send(&self, data: &[u8]) -> Result<(), Self::Error> {
        self.write(Message::Binary(data.to_vec().into())).await
    }

    async fn send_text(&self, text: &str) -> Result<(), Self::Error> {
        self.write(Message::text(text.to_string())).await
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error> {
        let mut stream = self.stream.lock().await;
        loop {
            match stream.next().await {
                Some(Ok(Message::Binary(data))) => {
                    return Ok(Some(data.into()));
                }
                Some(Ok(Message::Text(text))) => {
                    return Ok(Some(text.as_bytes().to_vec()));
                }
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong are answered by tungstenite
                Some(Err(e)) => return Err(TransportError::recv(e)),
            }
        }
    }

    async fn close_with(
        &self,
        code: u16,
        reason: &str,
    ) -> Result<(), Self::Error> {
        let frame = CloseFrame {
            code: CloseCode::from(code),
            reason: reason.to_string().into(),
        };
        // Sending the close frame starts the closing handshake; the read
        // half observes the peer's reply.
        self.write(Message::Close(Some(frame))).await
    }

    fn request(&self) -> &UpgradeRequest {
        &self.request
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
