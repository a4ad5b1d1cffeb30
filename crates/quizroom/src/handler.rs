//! Per-connection handler: admission, then the reader and writer pumps.
//!
//! Each accepted connection gets its own Tokio task running
//! [`handle_connection`]. The flow is:
//!   1. Resolve the room from the request path (`/ws/{quiz_id}`)
//!   2. Find the credential (header, query, or auth frame) → authenticate
//!   3. Register with the hub → client handle + mailbox
//!   4. Run the reader and writer pumps until either one stops
//!   5. Unregister (idempotent) and close the socket

use std::sync::Arc;
use std::time::{Duration, Instant};

use quizroom_auth::{AuthError, Authenticator, Credential};
use quizroom_hub::{ClientHandle, ClientId, HubError, HubHandle, Mailbox};
use quizroom_protocol::{AuthFrame, Codec, InboundFrame, QuizId};
use quizroom_transport::{
    CLOSE_POLICY_VIOLATION, CLOSE_TRY_AGAIN_LATER, Connection, TransportError,
    UpgradeRequest,
};

use crate::server::ServerState;
use crate::{ConnectionConfig, QuizRoomError};

/// First path segment of a room URL.
const ROOM_PATH_PREFIX: &str = "ws";

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<Conn, A, C>(
    conn: Conn,
    state: Arc<ServerState<A, C>>,
) -> Result<(), QuizRoomError>
where
    Conn: Connection<Error = TransportError>,
    A: Authenticator,
    C: Codec,
{
    let conn_id = conn.id();
    let conn = Arc::new(conn);

    let (client, mailbox) = match admit(&*conn, &state).await {
        Ok(admitted) => admitted,
        Err(e) => {
            let (code, reason) = rejection(&e);
            tracing::warn!(
                %conn_id,
                path = %conn.request().path,
                error = %e,
                code,
                "connection refused"
            );
            if let Err(close_err) = conn.close_with(code, reason).await {
                tracing::debug!(%conn_id, error = %close_err, "close after refusal failed");
            }
            return Err(e);
        }
    };

    tracing::debug!(
        %conn_id,
        client_id = %client.id(),
        quiz_id = %client.quiz_id(),
        user_id = %client.user_id(),
        "connection admitted"
    );

    run_pumps(
        conn,
        state.hub.clone(),
        client,
        mailbox,
        state.codec.clone(),
        state.connection.clone(),
    )
    .await;

    Ok(())
}

/// Resolves room and identity, then registers with the hub.
///
/// Nothing is registered unless every step before it succeeded.
async fn admit<Conn, A, C>(
    conn: &Conn,
    state: &ServerState<A, C>,
) -> Result<(ClientHandle, Mailbox), QuizRoomError>
where
    Conn: Connection<Error = TransportError>,
    A: Authenticator,
    C: Codec,
{
    let quiz_id = room_from_path(conn.request()).ok_or_else(|| {
        QuizRoomError::Admission(format!(
            "invalid room path {:?}",
            conn.request().path
        ))
    })?;

    let credential = match Credential::from_request(conn.request()) {
        Some(credential) => credential,
        None => {
            await_auth_frame(
                conn,
                &state.codec,
                state.connection.handshake_timeout(),
            )
            .await?
        }
    };

    let user_id = state.auth.authenticate(credential.as_str()).await?;
    let registered = state.hub.register(quiz_id, user_id).await?;
    Ok(registered)
}

/// Extracts the room from `/ws/{quiz_id}`. Any other shape names no room.
fn room_from_path(request: &UpgradeRequest) -> Option<QuizId> {
    match request.path_segments().as_slice() {
        [prefix, quiz_id]
            if prefix.as_str() == ROOM_PATH_PREFIX
                && !quiz_id.trim().is_empty() =>
        {
            Some(QuizId::new(quiz_id.as_str()))
        }
        _ => None,
    }
}

/// Waits for `{"type":"auth","content":{"token":..}}` as the first frame.
async fn await_auth_frame<Conn, C>(
    conn: &Conn,
    codec: &C,
    timeout: Duration,
) -> Result<Credential, QuizRoomError>
where
    Conn: Connection<Error = TransportError>,
    C: Codec,
{
    let data = match tokio::time::timeout(timeout, conn.recv()).await {
        Ok(Ok(Some(data))) => data,
        Ok(Ok(None)) => {
            return Err(TransportError::ConnectionClosed(
                "closed before authenticating".into(),
            )
            .into());
        }
        Ok(Err(e)) => return Err(e.into()),
        Err(_) => {
            tracing::debug!(conn_id = %conn.id(), "no auth frame before handshake timeout");
            return Err(AuthError::MissingCredential.into());
        }
    };

    let token = codec
        .decode::<AuthFrame>(&data)
        .and_then(AuthFrame::into_token)
        .map_err(|e| {
            tracing::debug!(conn_id = %conn.id(), error = %e, "first frame is not an auth frame");
            AuthError::MissingCredential
        })?;

    Ok(Credential::new(token))
}

/// Close code and reason sent to a client that failed admission.
fn rejection(err: &QuizRoomError) -> (u16, &'static str) {
    match err {
        QuizRoomError::Admission(_) => {
            (CLOSE_POLICY_VIOLATION, "invalid room path")
        }
        QuizRoomError::Hub(HubError::RoomFull { .. }) => {
            (CLOSE_TRY_AGAIN_LATER, "room full")
        }
        QuizRoomError::Hub(_) => (CLOSE_TRY_AGAIN_LATER, "try again later"),
        QuizRoomError::Auth(_)
        | QuizRoomError::Protocol(_)
        | QuizRoomError::Transport(_) => {
            (CLOSE_POLICY_VIOLATION, "unauthorized")
        }
    }
}

// ---------------------------------------------------------------------------
// Pumps
// ---------------------------------------------------------------------------

/// Runs the reader and writer as separate tasks and tears the connection
/// down as soon as either one stops.
async fn run_pumps<Conn, C>(
    conn: Arc<Conn>,
    hub: HubHandle,
    client: ClientHandle,
    mailbox: Mailbox,
    codec: C,
    config: ConnectionConfig,
) where
    Conn: Connection<Error = TransportError>,
    C: Codec,
{
    let client_id = client.id();
    let quiz_id = client.quiz_id().clone();

    let mut reader = tokio::spawn(read_pump(
        Arc::clone(&conn),
        hub.clone(),
        client,
        codec.clone(),
        config,
    ));
    let mut writer = tokio::spawn(write_pump(
        Arc::clone(&conn),
        hub.clone(),
        client_id,
        mailbox,
        codec,
    ));

    tokio::select! {
        _ = &mut reader => {
            writer.abort();
            let _ = writer.await;
        }
        _ = &mut writer => {
            reader.abort();
            let _ = reader.await;
        }
    }

    hub.unregister(client_id).await;
    if let Err(e) = conn.close().await {
        tracing::debug!(%client_id, error = %e, "close failed");
    }
    tracing::debug!(%client_id, %quiz_id, "connection finished");
}

/// Decodes inbound frames, stamps room and sender, and hands them to the hub.
async fn read_pump<Conn, C>(
    conn: Arc<Conn>,
    hub: HubHandle,
    client: ClientHandle,
    codec: C,
    config: ConnectionConfig,
) where
    Conn: Connection<Error = TransportError>,
    C: Codec,
{
    let client_id = client.id();
    let idle_timeout = config.idle_timeout();
    let mut budget =
        FrameBudget::new(config.max_frames_per_second, Instant::now());

    loop {
        if !client.is_active() {
            tracing::debug!(%client_id, "client closing, reader stopping");
            break;
        }

        let next = match idle_timeout {
            Some(limit) => match tokio::time::timeout(limit, conn.recv()).await {
                Ok(next) => next,
                Err(_) => {
                    tracing::info!(%client_id, user_id = %client.user_id(), "idle timeout");
                    break;
                }
            },
            None => conn.recv().await,
        };

        let data = match next {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::debug!(%client_id, "peer closed the connection");
                break;
            }
            Err(e) => {
                tracing::debug!(%client_id, error = %e, "read failed");
                break;
            }
        };

        if !budget.try_take(Instant::now()) {
            tracing::debug!(%client_id, "rate limit exceeded, dropping frame");
            continue;
        }

        let frame: InboundFrame = match codec.decode(&data) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::debug!(%client_id, error = %e, "malformed frame dropped");
                continue;
            }
        };

        let envelope = frame
            .into_envelope(client.quiz_id().clone(), client.user_id().clone());
        if let Err(e) = hub.dispatch_from(client_id, envelope).await {
            tracing::warn!(%client_id, error = %e, "hub unavailable, reader stopping");
            break;
        }
    }

    hub.unregister(client_id).await;
}

/// Drains the mailbox onto the socket, one text frame per envelope.
async fn write_pump<Conn, C>(
    conn: Arc<Conn>,
    hub: HubHandle,
    client_id: ClientId,
    mut mailbox: Mailbox,
    codec: C,
) where
    Conn: Connection<Error = TransportError>,
    C: Codec,
{
    while let Some(envelope) = mailbox.recv().await {
        let bytes = match codec.encode(&*envelope) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(%client_id, error = %e, "failed to encode envelope");
                continue;
            }
        };

        let sent = match String::from_utf8(bytes) {
            Ok(text) => conn.send_text(&text).await,
            Err(e) => conn.send(&e.into_bytes()).await,
        };
        if let Err(e) = sent {
            tracing::debug!(%client_id, error = %e, "write failed");
            hub.unregister(client_id).await;
            return;
        }
    }

    tracing::debug!(%client_id, "mailbox closed, writer stopping");
}

/// Fixed one-second window over inbound frames.
#[derive(Debug)]
struct FrameBudget {
    limit: u32,
    window_start: Instant,
    used: u32,
}

impl FrameBudget {
    const WINDOW: Duration = Duration::from_secs(1);

    /// `limit == 0` means unlimited.
    fn new(limit: u32, now: Instant) -> Self {
        Self {
            limit,
            window_start: now,
            used: 0,
        }
    }

    fn try_take(&mut self, now: Instant) -> bool {
        if self.limit == 0 {
            return true;
        }
        if now.duration_since(self.window_start) >= Self::WINDOW {
            self.window_start = now;
            self.used = 0;
        }
        if self.used < self.limit {
            self.used += 1;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quizroom_hub::{Hub, HubConfig};
    use quizroom_protocol::{JsonCodec, UserId};
    use quizroom_transport::{CLOSE_NORMAL, ConnectionId};
    use tokio::sync::{Mutex, mpsc};

    // =====================================================================
    // In-memory connection
    // =====================================================================

    #[derive(Debug, PartialEq)]
    enum Sent {
        Text(String),
        Binary(Vec<u8>),
        Close(u16, String),
    }

    struct MockConnection {
        id: ConnectionId,
        request: UpgradeRequest,
        inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
        outbound: mpsc::UnboundedSender<Sent>,
    }

    impl MockConnection {
        fn push(&self, sent: Sent) -> Result<(), TransportError> {
            self.outbound
                .send(sent)
                .map_err(|_| TransportError::ConnectionClosed("peer gone".into()))
        }
    }

    impl Connection for MockConnection {
        type Error = TransportError;

        async fn send(&self, data: &[u8]) -> Result<(), TransportError> {
            self.push(Sent::Binary(data.to_vec()))
        }

        async fn send_text(&self, text: &str) -> Result<(), TransportError> {
            self.push(Sent::Text(text.to_string()))
        }

        async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
            Ok(self.inbound.lock().await.recv().await)
        }

        async fn close_with(&self, code: u16, reason: &str) -> Result<(), TransportError> {
            self.push(Sent::Close(code, reason.to_string()))
        }

        fn request(&self) -> &UpgradeRequest {
            &self.request
        }

        fn id(&self) -> ConnectionId {
            self.id
        }
    }

    /// The client side of a [`MockConnection`].
    struct Peer {
        to_server: mpsc::UnboundedSender<Vec<u8>>,
        from_server: mpsc::UnboundedReceiver<Sent>,
    }

    impl Peer {
        fn send_json(&self, value: serde_json::Value) {
            self.to_server.send(value.to_string().into_bytes()).unwrap();
        }

        fn send_raw(&self, data: &[u8]) {
            self.to_server.send(data.to_vec()).unwrap();
        }

        async fn next(&mut self) -> Sent {
            tokio::time::timeout(Duration::from_secs(2), self.from_server.recv())
                .await
                .expect("timed out waiting for the server")
                .expect("server side dropped")
        }

        async fn next_envelope(&mut self) -> serde_json::Value {
            match self.next().await {
                Sent::Text(text) => serde_json::from_str(&text).unwrap(),
                other => panic!("expected a text frame, got {other:?}"),
            }
        }

        async fn assert_silent(&mut self, wait: Duration) {
            let result = tokio::time::timeout(wait, self.from_server.recv()).await;
            assert!(result.is_err(), "unexpected frame: {result:?}");
        }
    }

    fn mock(target: &str, authorization: Option<&str>) -> (MockConnection, Peer) {
        let (to_server, inbound) = mpsc::unbounded_channel();
        let (outbound, from_server) = mpsc::unbounded_channel();
        let mut request = UpgradeRequest::from_target(target);
        request.authorization = authorization.map(str::to_string);
        let conn = MockConnection {
            id: ConnectionId::new(1),
            request,
            inbound: Mutex::new(inbound),
            outbound,
        };
        (conn, Peer { to_server, from_server })
    }

    /// Accepts any token except `bad`; the token is the user id.
    struct TestAuth;

    impl Authenticator for TestAuth {
        async fn authenticate(&self, credential: &str) -> Result<UserId, AuthError> {
            if credential == "bad" {
                return Err(AuthError::InvalidToken("rejected".into()));
            }
            Ok(UserId::from(credential))
        }
    }

    fn state_with(
        hub: HubConfig,
        connection: ConnectionConfig,
    ) -> Arc<ServerState<TestAuth, JsonCodec>> {
        Arc::new(ServerState {
            hub: Hub::spawn(hub),
            auth: TestAuth,
            codec: JsonCodec,
            connection,
        })
    }

    fn state() -> Arc<ServerState<TestAuth, JsonCodec>> {
        state_with(HubConfig::default(), ConnectionConfig::default())
    }

    fn spawn_handler(
        conn: MockConnection,
        state: &Arc<ServerState<TestAuth, JsonCodec>>,
    ) -> tokio::task::JoinHandle<Result<(), QuizRoomError>> {
        tokio::spawn(handle_connection(conn, Arc::clone(state)))
    }

    // =====================================================================
    // Pure helpers
    // =====================================================================

    #[test]
    fn test_room_from_path() {
        let room = |target: &str| room_from_path(&UpgradeRequest::from_target(target));
        assert_eq!(room("/ws/quiz123"), Some(QuizId::from("quiz123")));
        assert_eq!(room("/ws/quiz%20night?token=x"), Some(QuizId::from("quiz night")));
        assert_eq!(room("/ws/quiz123/"), Some(QuizId::from("quiz123")));
        assert_eq!(room("/ws/"), None);
        assert_eq!(room("/ws/%20"), None);
        assert_eq!(room("/"), None);
        assert_eq!(room("/rooms/quiz123"), None);
        assert_eq!(room("/ws/a/b"), None);
    }

    #[test]
    fn test_rejection_codes() {
        let admission = QuizRoomError::Admission("x".into());
        assert_eq!(rejection(&admission), (CLOSE_POLICY_VIOLATION, "invalid room path"));

        let auth = QuizRoomError::Auth(AuthError::MissingCredential);
        assert_eq!(rejection(&auth), (CLOSE_POLICY_VIOLATION, "unauthorized"));

        let full = QuizRoomError::Hub(HubError::RoomFull {
            quiz_id: "Q1".into(),
            limit: 1,
        });
        assert_eq!(rejection(&full).0, CLOSE_TRY_AGAIN_LATER);
    }

    #[test]
    fn test_frame_budget_window() {
        let start = Instant::now();
        let mut budget = FrameBudget::new(2, start);

        assert!(budget.try_take(start));
        assert!(budget.try_take(start + Duration::from_millis(10)));
        assert!(!budget.try_take(start + Duration::from_millis(20)));
        assert!(budget.try_take(start + Duration::from_millis(1000)));
    }

    #[test]
    fn test_frame_budget_zero_is_unlimited() {
        let now = Instant::now();
        let mut budget = FrameBudget::new(0, now);
        assert!((0..1000).all(|_| budget.try_take(now)));
    }

    // =====================================================================
    // Admission
    // =====================================================================

    #[tokio::test]
    async fn test_query_token_admits_and_announces_join() {
        let state = state();
        let (conn, mut peer) = mock("/ws/Q1?token=alice", None);
        let _task = spawn_handler(conn, &state);

        let join = peer.next_envelope().await;
        assert_eq!(join["type"], "join");
        assert_eq!(join["quiz_id"], "Q1");
        assert_eq!(join["content"]["user_id"], "alice");
        assert!(join.get("user_id").is_none());
    }

    #[tokio::test]
    async fn test_bearer_header_admits() {
        let state = state();
        let (conn, mut peer) = mock("/ws/Q1", Some("Bearer bob"));
        let _task = spawn_handler(conn, &state);

        let join = peer.next_envelope().await;
        assert_eq!(join["content"]["user_id"], "bob");
    }

    #[tokio::test]
    async fn test_auth_frame_admits() {
        let state = state();
        let (conn, mut peer) = mock("/ws/Q1", None);
        let _task = spawn_handler(conn, &state);

        peer.send_json(serde_json::json!({
            "type": "auth",
            "content": { "token": "carol" }
        }));

        let join = peer.next_envelope().await;
        assert_eq!(join["content"]["user_id"], "carol");
    }

    #[tokio::test]
    async fn test_invalid_path_is_refused() {
        let state = state();
        let (conn, mut peer) = mock("/lobby?token=alice", None);
        let task = spawn_handler(conn, &state);

        assert_eq!(
            peer.next().await,
            Sent::Close(CLOSE_POLICY_VIOLATION, "invalid room path".into())
        );
        assert!(matches!(task.await.unwrap(), Err(QuizRoomError::Admission(_))));
        assert_eq!(state.hub.room_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rejected_token_closes_before_join() {
        let state = state();
        let (conn, mut peer) = mock("/ws/Q1?token=bad", None);
        let task = spawn_handler(conn, &state);

        assert_eq!(
            peer.next().await,
            Sent::Close(CLOSE_POLICY_VIOLATION, "unauthorized".into())
        );
        assert!(matches!(task.await.unwrap(), Err(QuizRoomError::Auth(_))));
        assert_eq!(state.hub.room_size(&"Q1".into()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_non_auth_first_frame_is_refused() {
        let state = state();
        let (conn, mut peer) = mock("/ws/Q1", None);
        let _task = spawn_handler(conn, &state);

        peer.send_json(serde_json::json!({"type": "answer", "content": 1}));

        assert_eq!(
            peer.next().await,
            Sent::Close(CLOSE_POLICY_VIOLATION, "unauthorized".into())
        );
    }

    #[tokio::test]
    async fn test_missing_auth_frame_times_out() {
        let state = state_with(
            HubConfig::default(),
            ConnectionConfig {
                handshake_timeout_secs: 1,
                ..ConnectionConfig::default()
            },
        );
        let (conn, mut peer) = mock("/ws/Q1", None);
        let task = spawn_handler(conn, &state);

        let result = task.await.unwrap();
        assert!(matches!(result, Err(QuizRoomError::Auth(AuthError::MissingCredential))));
        assert_eq!(
            peer.next().await,
            Sent::Close(CLOSE_POLICY_VIOLATION, "unauthorized".into())
        );
    }

    #[tokio::test]
    async fn test_full_room_closes_with_try_again_later() {
        let state = state_with(
            HubConfig {
                max_room_size: 1,
                ..HubConfig::default()
            },
            ConnectionConfig::default(),
        );
        let (first, mut first_peer) = mock("/ws/Q1?token=alice", None);
        let _first = spawn_handler(first, &state);
        first_peer.next_envelope().await;

        let (second, mut second_peer) = mock("/ws/Q1?token=bob", None);
        let _second = spawn_handler(second, &state);

        assert_eq!(
            second_peer.next().await,
            Sent::Close(CLOSE_TRY_AGAIN_LATER, "room full".into())
        );
        assert_eq!(state.hub.room_size(&"Q1".into()).await.unwrap(), Some(1));
    }

    // =====================================================================
    // Pumps
    // =====================================================================

    #[tokio::test]
    async fn test_reader_stamps_room_and_sender() {
        let state = state();
        let (conn, mut peer) = mock("/ws/Q1?token=alice", None);
        let _task = spawn_handler(conn, &state);
        peer.next_envelope().await; // join

        peer.send_json(serde_json::json!({
            "quiz_id": "elsewhere",
            "type": "answer",
            "user_id": "mallory",
            "content": { "choice": 3 }
        }));

        let echoed = peer.next_envelope().await;
        assert_eq!(echoed["type"], "answer");
        assert_eq!(echoed["quiz_id"], "Q1");
        assert_eq!(echoed["user_id"], "alice");
        assert_eq!(echoed["content"]["choice"], 3);
    }

    #[tokio::test]
    async fn test_malformed_frame_keeps_connection() {
        let state = state();
        let (conn, mut peer) = mock("/ws/Q1?token=alice", None);
        let _task = spawn_handler(conn, &state);
        peer.next_envelope().await;

        peer.send_raw(b"{not json");
        peer.send_json(serde_json::json!({"type": "question", "content": "2+2?"}));

        let question = peer.next_envelope().await;
        assert_eq!(question["type"], "question");
        assert_eq!(question["content"], "2+2?");
    }

    #[tokio::test]
    async fn test_peer_disconnect_removes_member_and_room() {
        let state = state();
        let (conn, mut peer) = mock("/ws/Q1?token=alice", None);
        let task = spawn_handler(conn, &state);
        peer.next_envelope().await;

        drop(peer.to_server);

        assert!(task.await.unwrap().is_ok());
        assert_eq!(state.hub.room_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_idle_timeout_disconnects() {
        let state = state_with(
            HubConfig::default(),
            ConnectionConfig {
                idle_timeout_secs: 1,
                ..ConnectionConfig::default()
            },
        );
        let (conn, mut peer) = mock("/ws/Q1?token=alice", None);
        let task = spawn_handler(conn, &state);
        peer.next_envelope().await;

        tokio::time::timeout(Duration::from_secs(3), task)
            .await
            .expect("idle connection was not closed")
            .unwrap()
            .unwrap();
        assert_eq!(peer.next().await, Sent::Close(CLOSE_NORMAL, String::new()));
        assert_eq!(state.hub.room_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_drops_excess_frames() {
        let state = state_with(
            HubConfig::default(),
            ConnectionConfig {
                max_frames_per_second: 2,
                ..ConnectionConfig::default()
            },
        );
        let (conn, mut peer) = mock("/ws/Q1?token=alice", None);
        let _task = spawn_handler(conn, &state);
        peer.next_envelope().await;

        for n in 0..5 {
            peer.send_json(serde_json::json!({"type": "answer", "content": n}));
        }

        assert_eq!(peer.next_envelope().await["content"], 0);
        assert_eq!(peer.next_envelope().await["content"], 1);
        peer.assert_silent(Duration::from_millis(200)).await;
    }

    #[tokio::test]
    async fn test_eviction_stops_both_pumps_and_closes() {
        let hub = Hub::spawn(HubConfig::default());
        let (client, mailbox) = hub
            .register("Q1".into(), "alice".into())
            .await
            .unwrap();
        let client_id = client.id();
        let (conn, mut peer) = mock("/ws/Q1", None);

        let pumps = tokio::spawn(run_pumps(
            Arc::new(conn),
            hub.clone(),
            client,
            mailbox,
            JsonCodec,
            ConnectionConfig::default(),
        ));

        let join = peer.next_envelope().await;
        assert_eq!(join["type"], "join");

        // The hub drops the member; the writer sees its mailbox close.
        assert!(hub.unregister(client_id).await);

        tokio::time::timeout(Duration::from_secs(2), pumps)
            .await
            .expect("pumps did not stop")
            .unwrap();
        assert_eq!(peer.next().await, Sent::Close(CLOSE_NORMAL, String::new()));
    }

    #[tokio::test]
    async fn test_write_failure_unregisters() {
        let hub = Hub::spawn(HubConfig::default());
        let (client, mailbox) = hub
            .register("Q1".into(), "alice".into())
            .await
            .unwrap();
        let (conn, peer) = mock("/ws/Q1", None);
        let Peer { to_server, from_server } = peer;
        drop(from_server);

        // The pending join notice cannot be written: the writer gives up.
        write_pump(Arc::new(conn), hub.clone(), client.id(), mailbox, JsonCodec).await;

        assert!(!client.is_active());
        assert_eq!(hub.room_count().await.unwrap(), 0);
        drop(to_server);
    }

    #[tokio::test]
    async fn test_writer_uses_text_frames() {
        let hub = Hub::spawn(HubConfig::default());
        let (client, mailbox) = hub
            .register("Q1".into(), "alice".into())
            .await
            .unwrap();
        let (conn, mut peer) = mock("/ws/Q1", None);
        let writer = tokio::spawn(write_pump(
            Arc::new(conn),
            hub.clone(),
            client.id(),
            mailbox,
            JsonCodec,
        ));

        match peer.next().await {
            Sent::Text(text) => assert!(text.contains(r#""type":"join""#)),
            other => panic!("expected text frame, got {other:?}"),
        }

        hub.unregister(client.id()).await;
        writer.await.unwrap();
    }
}
