//! The core state machine: a single `(shard_index, shard_count)` partition
//! of the gateway's event stream.

use crate::{
    close::CloseCode,
    compression::Inflater,
    config::{Config, ShardId},
    connection::{Connection, Message as ConnMessage, WebSocketConnection},
    error::{ReceiveMessageError, SendError, SendErrorType, ShardInitializeError},
    metrics,
    packet::{Hello, Identify, Opcode, Ready, ReceivePacket, Resume, SendPacket},
    session::SessionInfo,
    tls::TlsContainer,
};
use rand::Rng;
use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};
use tokio::{sync::Mutex as AsyncMutex, time::Interval};
use url::Url;

/// Current connection stage of a [`Shard`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Stage {
    /// Not connected; either never started or disconnected.
    Disconnected,
    /// TCP and TLS handshake in progress.
    Connecting,
    /// Waiting on the gateway's `IDENTIFY` or `RESUME` acknowledgement.
    Identifying,
    /// Fully connected and exchanging dispatch events.
    Connected,
}

/// A resumable, heartbeat-driven connection to one `(shard_index,
/// shard_count)` partition of the gateway.
///
/// A shard is driven by repeatedly calling [`Shard::next_event`]. Internally
/// it reconnects on recoverable closes, resuming the previous session when
/// possible, and transparently answers the gateway's heartbeat protocol.
pub struct Shard {
    /// Index and total shard count this instance is responsible for.
    id: ShardId,
    /// Immutable configuration shared across reconnects.
    config: Arc<Config>,
    /// TLS connector, reused across reconnects.
    tls: TlsContainer,
    /// Active connection, if any. Shared so the read loop and any
    /// caller-initiated send can each acquire it without racing.
    conn: Arc<AsyncMutex<Option<Box<dyn Connection>>>>,
    /// Transport decompressor for the current connection.
    compression: Inflater,
    /// Last sequence number observed, used for heartbeats and resumes.
    seq: Arc<AtomicU64>,
    /// Whether the most recently sent heartbeat has been acknowledged.
    acked: Arc<AtomicBool>,
    /// Session info from the current or most recent connection.
    session: Option<SessionInfo>,
    /// Current connection stage.
    stage: Stage,
    /// Whether `Hello` has been received on the current connection attempt.
    /// Any other opcode before it is a protocol error.
    hello_received: bool,
    /// When the most recent heartbeat was sent, consumed on the next ACK to
    /// compute [`Shard::ping`].
    last_heartbeat_sent_at: Option<Instant>,
    /// Round-trip time of the most recently acknowledged heartbeat.
    ping: Option<Duration>,
    /// Heartbeat ticker for the current connection, set once `Hello` is
    /// received. Lives on `self` rather than as a `next_event` local so it
    /// survives across separate calls to `next_event`.
    heartbeat_interval: Option<Interval>,
    /// Consecutive heartbeats sent without an intervening ACK.
    missed_acks: u8,
}

impl Shard {
    /// Create a new shard. Does not connect; call [`Shard::start`] to begin
    /// the cold connect.
    pub fn new(id: ShardId, config: Config) -> Result<Self, ShardInitializeError> {
        let tls = TlsContainer::new().map_err(ShardInitializeError::from_establishing)?;

        Ok(Self {
            id,
            config: Arc::new(config),
            tls,
            conn: Arc::new(AsyncMutex::new(None)),
            compression: Inflater::new(),
            seq: Arc::new(AtomicU64::new(0)),
            acked: Arc::new(AtomicBool::new(true)),
            session: None,
            stage: Stage::Disconnected,
            hello_received: false,
            last_heartbeat_sent_at: None,
            ping: None,
            heartbeat_interval: None,
            missed_acks: 0,
        })
    }

    /// Index and total count of the shard partition this instance handles.
    pub const fn id(&self) -> ShardId {
        self.id
    }

    /// Current connection stage.
    pub const fn stage(&self) -> Stage {
        self.stage
    }

    /// Round-trip time of the most recently acknowledged heartbeat, if any
    /// heartbeat has completed yet.
    pub const fn ping(&self) -> Option<Duration> {
        self.ping
    }

    /// Connect (or reconnect) to the gateway, resuming the previous session
    /// if the store has one.
    pub async fn start(&mut self) -> Result<(), ShardInitializeError> {
        self.stage = Stage::Connecting;
        metrics::shards_alive(self.id, false);

        let seq = self
            .config
            .store()
            .get_seq(self.id)
            .await
            .unwrap_or_else(|source| {
                #[cfg(feature = "tracing")]
                tracing::warn!(shard = %self.id, error = %source, "failed to read persisted seq; starting at 0");
                None
            })
            .unwrap_or(0);
        self.seq.store(seq, Ordering::Release);

        self.session = self.config.store().get_session(self.id).await.unwrap_or_else(|source| {
            #[cfg(feature = "tracing")]
            tracing::warn!(shard = %self.id, error = %source, "failed to read persisted session; identifying fresh");
            None
        });

        let url = self.build_url()?;

        #[cfg(feature = "tracing")]
        tracing::debug!(shard = %self.id, %url, "connecting");

        let connection = WebSocketConnection::connect(&url, &self.tls)
            .await
            .map_err(ShardInitializeError::from_establishing)?;

        *self.conn.lock().await = Some(Box::new(connection));
        self.compression.reset();
        self.stage = Stage::Identifying;
        self.hello_received = false;
        self.heartbeat_interval = None;
        self.missed_acks = 0;

        Ok(())
    }

    /// Install a pre-built connection without dialing, for driving the
    /// state machine against a scripted [`Connection`] in tests.
    #[cfg(test)]
    async fn connect_mock(&mut self, connection: Box<dyn Connection>) {
        let seq = self.config.store().get_seq(self.id).await.ok().flatten().unwrap_or(0);
        self.seq.store(seq, Ordering::Release);
        self.session = self.config.store().get_session(self.id).await.ok().flatten();

        *self.conn.lock().await = Some(connection);
        self.compression.reset();
        self.stage = Stage::Identifying;
        self.hello_received = false;
        self.heartbeat_interval = None;
        self.missed_acks = 0;
    }

    /// Build the fully-qualified connection URL, including the protocol
    /// version and compression query parameters.
    fn build_url(&self) -> Result<String, ShardInitializeError> {
        let base = self.session.as_ref().and_then(|s| s.resume_gateway_url.as_deref()).unwrap_or(self.config.gateway_url());

        let raw = format!(
            "{base}?v={version}&encoding=json{compression}",
            version = self.config.version(),
            compression = crate::compression::COMPRESSION_FEATURE,
        );

        Url::parse(&raw).map_err(|source| ShardInitializeError::from_url_invalid(raw.clone(), source))?;

        Ok(raw)
    }

    /// Receive and process the next envelope, returning it to the caller
    /// once it has been accounted for internally.
    ///
    /// Internally answers `HELLO` with `IDENTIFY`/`RESUME`, maintains the
    /// heartbeat, and reconnects on recoverable closes. A fatal close
    /// surfaces as an error with [`ReceiveMessageError::is_fatal`] true and
    /// ends the shard for good.
    pub async fn next_event(&mut self) -> Result<ReceivePacket, ReceiveMessageError> {
        loop {
            if self.stage == Stage::Disconnected {
                self.start().await.map_err(ReceiveMessageError::from_reconnect)?;
            }

            'read: loop {
                let read = {
                    let conn = Arc::clone(&self.conn);
                    async move {
                        let mut guard = conn.lock().await;
                        guard.as_mut().expect("connection present while connected").read().await
                    }
                };

                // Ticking the heartbeat interval needs a `&mut Interval` alive for
                // the whole `select!`, which would otherwise overlap with the
                // `&mut self` the tick arm's own handling needs (closing the
                // connection, sending a heartbeat). Taking it out of `self` for
                // the duration of the `select!` and restoring it immediately after
                // keeps those two borrows from ever being live at the same time.
                let mut heartbeat_interval = self.heartbeat_interval.take();

                let read_outcome = if let Some(interval) = heartbeat_interval.as_mut() {
                    tokio::select! {
                        message = read => Some(message),
                        _ = interval.tick() => None,
                    }
                } else {
                    Some(read.await)
                };

                self.heartbeat_interval = heartbeat_interval;

                let message = match read_outcome {
                    Some(message) => message,
                    None => {
                        if !self.acked.swap(false, Ordering::AcqRel) {
                            self.missed_acks += 1;
                            if self.missed_acks >= 2 {
                                self.close(CloseCode::SessionTimedOut.code(), "session timeout").await;
                                self.stage = Stage::Disconnected;
                                self.heartbeat_interval = None;
                                self.missed_acks = 0;
                                break 'read;
                            }
                        } else {
                            self.missed_acks = 0;
                        }

                        self.send_heartbeat().await.map_err(ReceiveMessageError::from_send)?;
                        continue 'read;
                    }
                };

                let message = match message {
                    Some(Ok(message)) => message,
                    Some(Err(source)) => return Err(ReceiveMessageError::from_client(source)),
                    None => {
                        self.stage = Stage::Disconnected;
                        break 'read;
                    }
                };

                let bytes = match message {
                    ConnMessage::Close(code) => {
                        let code = code.unwrap_or(CloseCode::UnknownError.code());
                        self.stage = Stage::Disconnected;

                        if !CloseCode::from(code).can_reconnect() {
                            #[cfg(feature = "tracing")]
                            tracing::info!(shard = %self.id, code, "connection closed with a fatal code");

                            metrics::shards_alive(self.id, false);
                            return Err(ReceiveMessageError::from_fatally_closed(code));
                        }

                        #[cfg(feature = "tracing")]
                        tracing::info!(shard = %self.id, code, "connection closed, reconnecting");

                        break 'read;
                    }
                    ConnMessage::Binary(bytes) => {
                        self.compression.extend(&bytes);

                        match self.compression.message() {
                            Ok(Some(bytes)) => bytes.to_vec(),
                            Ok(None) => continue 'read,
                            Err(source) => return Err(ReceiveMessageError::from_compression(source)),
                        }
                    }
                    ConnMessage::Text(bytes) => bytes,
                };

                match self.handle_envelope(&bytes).await? {
                    Some(packet) => return Ok(packet),
                    None => break 'read,
                }
            }
        }
    }

    /// Decode, account for, and internally act on a single JSON envelope.
    ///
    /// Returns the decoded packet unless the envelope triggered a
    /// disconnect (`RECONNECT`, an unresumable `INVALID_SESSION`, or a
    /// missed-heartbeat timeout), in which case the caller should restart
    /// its read loop.
    async fn handle_envelope(&mut self, bytes: &[u8]) -> Result<Option<ReceivePacket>, ReceiveMessageError> {
        let mut packet: ReceivePacket = serde_json::from_slice(bytes).map_err(ReceiveMessageError::from_json)?;

        let hello_violation =
            (!self.hello_received && packet.op != Opcode::Hello) || (self.hello_received && packet.op == Opcode::Hello);

        if hello_violation {
            #[cfg(feature = "tracing")]
            tracing::warn!(shard = %self.id, op = ?packet.op, "Hello protocol violation, reconnecting");

            self.close(CloseCode::UnknownError.code(), "protocol error").await;
            self.stage = Stage::Disconnected;
            return Ok(None);
        }

        if packet.op != Opcode::Dispatch {
            packet.t = None;
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(shard = %self.id, op = ?packet.op, event = ?packet.t, "received payload");

        metrics::packet_received(self.id, packet.op, packet.t.as_deref());

        if let Some(callback) = &self.config.on_packet {
            callback(&packet);
        }

        if let Some(seq) = packet.s {
            self.seq.store(seq, Ordering::Release);
            self.config
                .store()
                .set_seq(self.id, seq)
                .await
                .map_err(ReceiveMessageError::from_store)?;
        }

        match packet.op {
            Opcode::Hello => {
                let hello: Hello = serde_json::from_value(packet.d.clone()).map_err(ReceiveMessageError::from_json)?;

                let mut interval = tokio::time::interval(Duration::from_millis(hello.heartbeat_interval));
                interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                self.heartbeat_interval = Some(interval);
                self.acked.store(true, Ordering::Release);

                self.identify_or_resume().await.map_err(ReceiveMessageError::from_send)?;
                self.stage = Stage::Identifying;
                self.hello_received = true;
            }
            Opcode::Heartbeat => {
                self.send_heartbeat().await.map_err(ReceiveMessageError::from_send)?;
            }
            Opcode::HeartbeatAck => {
                self.acked.store(true, Ordering::Release);
                self.missed_acks = 0;

                if let Some(sent_at) = self.last_heartbeat_sent_at {
                    let ping = sent_at.elapsed();
                    self.ping = Some(ping);
                    metrics::ping(self.id, ping.as_secs_f64() * 1_000.0);
                }
            }
            Opcode::Reconnect => {
                self.close(CloseCode::UnknownError.code(), "reconnecting").await;
                self.stage = Stage::Disconnected;
                return Ok(None);
            }
            Opcode::InvalidSession => {
                let resumable = packet.d.as_bool().unwrap_or(false);

                if !resumable {
                    self.session = None;

                    let delay = rand::thread_rng().gen_range(1_000..=5_000);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }

                self.close(CloseCode::Normal.code(), "reidentifying").await;
                self.stage = Stage::Disconnected;
                return Ok(None);
            }
            Opcode::Dispatch => {
                if packet.t.as_deref() == Some("READY") || packet.t.as_deref() == Some("RESUMED") {
                    self.stage = Stage::Connected;
                    metrics::shards_alive(self.id, true);

                    if packet.t.as_deref() == Some("READY") {
                        let ready: Ready =
                            serde_json::from_value(packet.d.clone()).map_err(ReceiveMessageError::from_json)?;

                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            shard = %self.id,
                            version = crate::API_VERSION,
                            session_id = %ready.session_id,
                            "ready",
                        );

                        let session = SessionInfo::new(ready.session_id, ready.resume_gateway_url);
                        self.config
                            .store()
                            .set_session(self.id, session.clone())
                            .await
                            .map_err(ReceiveMessageError::from_store)?;
                        self.session = Some(session);
                    } else {
                        #[cfg(feature = "tracing")]
                        tracing::trace!(shard = %self.id, "resumed");
                    }
                }
            }
            Opcode::Identify | Opcode::Resume => {}
        }

        Ok(Some(packet))
    }

    /// Send a command to the gateway.
    ///
    /// Subject to the configured send ratelimiter unless
    /// [`ConfigBuilder::ratelimit_messages`] disabled it.
    ///
    /// [`ConfigBuilder::ratelimit_messages`]: crate::config::ConfigBuilder::ratelimit_messages
    pub async fn send(&self, op: Opcode, payload: &serde_json::Value) -> Result<(), SendError> {
        if self.config.ratelimit_messages {
            self.config.send_limiter.acquire_one().await;
        }

        let packet = SendPacket { op, d: payload };
        self.send_raw(&packet).await?;
        metrics::packet_sent(self.id, op);

        Ok(())
    }

    /// Serialize and write a command, bypassing the ratelimiter. Used
    /// internally for heartbeats and identify/resume, which have their own
    /// limiter or none at all.
    async fn send_raw<T: serde::Serialize>(&self, packet: &SendPacket<T>) -> Result<(), SendError> {
        let text = serde_json::to_string(packet).map_err(|source| SendError {
            kind: SendErrorType::Serializing,
            source: Some(Box::new(source)),
        })?;

        let mut guard = self.conn.lock().await;
        let connection = guard.as_mut().ok_or_else(|| SendError {
            kind: SendErrorType::Sending,
            source: None,
        })?;

        connection.write(text).await.map_err(|source| SendError {
            kind: SendErrorType::Sending,
            source: Some(source),
        })
    }

    /// Send a heartbeat carrying the last observed sequence number.
    async fn send_heartbeat(&mut self) -> Result<(), SendError> {
        let seq = self.seq.load(Ordering::Acquire);
        let packet = SendPacket {
            op: Opcode::Heartbeat,
            d: seq,
        };

        self.send_raw(&packet).await?;
        self.last_heartbeat_sent_at = Some(Instant::now());
        metrics::packet_sent(self.id, Opcode::Heartbeat);

        Ok(())
    }

    /// Identify fresh or resume the previous session, depending on whether
    /// one was loaded from the session store.
    async fn identify_or_resume(&self) -> Result<(), SendError> {
        if let Some(session) = &self.session {
            self.config.identify_limiter.acquire_one().await;
            self.config.send_limiter.acquire_one().await;

            let resume = Resume {
                token: self.config.token().into(),
                session_id: session.session_id.clone(),
                seq: self.seq.load(Ordering::Acquire),
            };

            let packet = SendPacket {
                op: Opcode::Resume,
                d: resume,
            };
            self.send_raw(&packet).await?;
            metrics::packet_sent(self.id, Opcode::Resume);
        } else {
            self.config.identify_limiter.acquire_one().await;
            self.config.send_limiter.acquire_one().await;

            let identify = Identify {
                token: self.config.token().into(),
                intents: self.config.intents(),
                properties: self.config.identify_properties.clone(),
                shard: [self.id.index(), self.id.count()],
                presence: self.config.presence.clone(),
            };

            let packet = SendPacket {
                op: Opcode::Identify,
                d: identify,
            };
            self.send_raw(&packet).await?;
            metrics::packet_sent(self.id, Opcode::Identify);
        }

        Ok(())
    }

    /// Close the current connection, if any, with a code and reason.
    async fn close(&self, code: u16, reason: &str) {
        let mut guard = self.conn.lock().await;
        if let Some(connection) = guard.as_mut() {
            let _ = connection.close(code, reason).await;
        }
        *guard = None;
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("id", &self.id)
            .field("stage", &self.stage)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{Shard, Stage};
    use crate::{
        config::{Config, ShardId},
        connection::{tests::MockConnection, Message},
        packet::{Intents, Opcode},
        session::{InMemorySessionStore, SessionStore},
    };
    use static_assertions::assert_impl_all;
    use std::{fmt::Debug, sync::Arc, time::Duration};

    assert_impl_all!(Stage: Clone, Copy, Debug, Eq, PartialEq, Send, Sync);

    fn test_shard(store: Arc<InMemorySessionStore>) -> Shard {
        let config = Config::builder("abc123".to_owned(), Intents::empty(), "wss://gateway.example/")
            .store(store)
            .build();

        Shard::new(ShardId::ONE, config).expect("tls connector construction should not fail in tests")
    }

    #[tokio::test]
    async fn hello_triggers_identify_and_moves_to_identifying() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut shard = test_shard(Arc::clone(&store));

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let mut mock = MockConnection::new(vec![Ok(Message::Text(
            br#"{"op":10,"d":{"heartbeat_interval":45000}}"#.to_vec(),
        ))]);
        mock.on_write = Some(tx);

        shard.connect_mock(Box::new(mock)).await;

        let packet = shard.next_event().await.expect("hello is a valid envelope");
        assert_eq!(Opcode::Hello, packet.op);
        assert_eq!(Stage::Identifying, shard.stage());

        let sent = rx.try_recv().expect("identify should have been written");
        let sent: serde_json::Value = serde_json::from_str(&sent).unwrap();
        assert_eq!(Opcode::Identify as u8, sent["op"].as_u64().unwrap() as u8);
        assert_eq!(0, sent["d"]["shard"][0].as_u64().unwrap());
        assert_eq!(1, sent["d"]["shard"][1].as_u64().unwrap());
    }

    #[tokio::test]
    async fn ready_dispatch_persists_session_and_moves_to_connected() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut shard = test_shard(Arc::clone(&store));

        let hello = br#"{"op":10,"d":{"heartbeat_interval":45000}}"#;
        let ready = br#"{"op":0,"d":{"session_id":"abc123","resume_gateway_url":"wss://resume.example/"},"s":1,"t":"READY"}"#;
        let mock = MockConnection::new(vec![
            Ok(Message::Text(hello.to_vec())),
            Ok(Message::Text(ready.to_vec())),
        ]);

        shard.connect_mock(Box::new(mock)).await;

        let _hello = shard.next_event().await.expect("hello is a valid envelope");
        let packet = shard.next_event().await.expect("ready is a valid envelope");
        assert_eq!(Some("READY".to_owned()), packet.t);
        assert_eq!(Stage::Connected, shard.stage());

        let session = store
            .get_session(ShardId::ONE)
            .await
            .unwrap()
            .expect("ready should persist a session");
        assert_eq!("abc123", &*session.session_id);
        assert_eq!(Some(1), store.get_seq(ShardId::ONE).await.unwrap());
    }

    #[tokio::test]
    async fn heartbeat_request_is_answered() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut shard = test_shard(store);

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let hello = br#"{"op":10,"d":{"heartbeat_interval":45000}}"#;
        let mut mock = MockConnection::new(vec![
            Ok(Message::Text(hello.to_vec())),
            Ok(Message::Text(br#"{"op":1,"d":null}"#.to_vec())),
        ]);
        mock.on_write = Some(tx);

        shard.connect_mock(Box::new(mock)).await;

        let _hello = shard.next_event().await.expect("hello is a valid envelope");
        rx.try_recv().expect("identify should have been written");

        let packet = shard.next_event().await.expect("heartbeat request is a valid envelope");
        assert_eq!(Opcode::Heartbeat, packet.op);

        let sent = rx.try_recv().expect("a heartbeat should have been sent back");
        let sent: serde_json::Value = serde_json::from_str(&sent).unwrap();
        assert_eq!(Opcode::Heartbeat as u8, sent["op"].as_u64().unwrap() as u8);
    }

    #[tokio::test]
    async fn fatal_close_surfaces_as_fatal_error() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut shard = test_shard(store);

        let mock = MockConnection::new(vec![Ok(Message::Close(Some(4004)))]);
        shard.connect_mock(Box::new(mock)).await;

        let error = shard.next_event().await.expect_err("authentication failure is fatal");
        assert!(error.is_fatal());
    }

    #[tokio::test]
    async fn non_hello_first_packet_is_a_protocol_error() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut shard = test_shard(store);

        let mock = MockConnection::new(Vec::new());
        shard.connect_mock(Box::new(mock)).await;

        let result = shard
            .handle_envelope(br#"{"op":0,"d":{},"t":"SOMETHING"}"#)
            .await
            .expect("a protocol violation is reported as a reconnect, not an error");

        assert!(result.is_none());
        assert_eq!(Stage::Disconnected, shard.stage());
    }

    #[tokio::test]
    async fn duplicate_hello_is_a_protocol_error() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut shard = test_shard(store);

        let mock = MockConnection::new(Vec::new());
        shard.connect_mock(Box::new(mock)).await;

        let hello = br#"{"op":10,"d":{"heartbeat_interval":45000}}"#;

        shard
            .handle_envelope(hello)
            .await
            .expect("first hello is valid")
            .expect("first hello is surfaced to the caller");
        assert_eq!(Stage::Identifying, shard.stage());

        let result = shard
            .handle_envelope(hello)
            .await
            .expect("a second hello is reported as a reconnect, not an error");

        assert!(result.is_none());
        assert_eq!(Stage::Disconnected, shard.stage());
    }

    #[tokio::test]
    async fn non_dispatch_packets_have_their_event_name_erased() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut shard = test_shard(store);

        let mock = MockConnection::new(Vec::new());
        shard.connect_mock(Box::new(mock)).await;

        let hello = br#"{"op":10,"d":{"heartbeat_interval":45000},"t":"SHOULD_BE_ERASED"}"#;

        let packet = shard
            .handle_envelope(hello)
            .await
            .expect("hello is a valid envelope")
            .expect("hello is surfaced to the caller");

        assert_eq!(None, packet.t);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_session_sleeps_only_when_not_resumable() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut shard = test_shard(store);

        let mock = MockConnection::new(Vec::new());
        shard.connect_mock(Box::new(mock)).await;

        let hello = br#"{"op":10,"d":{"heartbeat_interval":45000}}"#;
        shard.handle_envelope(hello).await.unwrap();

        let started_at = tokio::time::Instant::now();
        let result = shard.handle_envelope(br#"{"op":9,"d":true}"#).await.unwrap();
        assert!(result.is_none());
        assert!(started_at.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn heartbeat_ack_records_ping() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut shard = test_shard(store);

        let mock = MockConnection::new(Vec::new());
        shard.connect_mock(Box::new(mock)).await;

        assert_eq!(None, shard.ping());

        let hello = br#"{"op":10,"d":{"heartbeat_interval":45000}}"#;
        shard.handle_envelope(hello).await.unwrap();

        shard.send_heartbeat().await.expect("heartbeat send should succeed");

        shard.handle_envelope(br#"{"op":11,"d":null}"#).await.unwrap();

        assert!(shard.ping().is_some());
    }

    #[allow(dead_code)]
    fn mock_connection_is_constructible() -> MockConnection {
        MockConnection::new(Vec::new())
    }
}
