//! Transport session: one chat socket and its reconnect policy.
//!
//! # Architecture
//!
//! ```text
//!   TransportSession (handle)            connection task (one per connect())
//!         │                                      │
//!         │  connect(room) ──── spawn ─────────► │  Connector::connect(url)
//!         │  send(frame) ───── outbound mpsc ──► │  FrameSink::send_text
//!         │  close() ───────── cancel token ───► │  graceful close, exit
//!         │                                      │
//!         │                                      │  FrameSource::recv
//!         │                                      │    └─► MessageRouter::dispatch
//!         │                                      │
//!         │        shared state (Mutex)          │  on unexpected close:
//!         └───────── state / room / attempts ◄───┘    sleep(delay), reconnect
//! ```
//!
//! # Reconnect policy
//!
//! Constant delay, bounded attempts. Any close the user did not ask for
//! (server close frame, stream end, read error, failed handshake) schedules a
//! reconnect to the same room after [`ReconnectPolicy::delay`] and increments
//! the attempt counter. Once the counter has reached
//! [`ReconnectPolicy::max_attempts`], the session enters
//! [`ConnectionState::ClosedFinal`] and reports
//! [`TransportListener::on_reconnect_failed`] once. Every successful open
//! resets the counter to zero.
//!
//! `close()` and `connect()` cancel the running task, including a pending
//! reconnect delay, and bump an epoch so a task that is already past its
//! last await can no longer write shared state.

mod connector;

pub use connector::{Connector, FrameSink, FrameSource, SocketPair, TungsteniteConnector};

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::auth::AuthSession;
use crate::config::Config;
use crate::constants;
use crate::events::TransportListener;
use crate::protocol::{FileDescriptor, MessageKind, OutboundFrame, RoomId};
use crate::router::MessageRouter;
use crate::ws::{self, WsMessage};

/// Lifecycle state of the chat socket.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No socket and nothing scheduled.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Connected and ready to send.
    Open,
    /// Waiting out the delay before reconnect attempt `attempt`.
    Reconnecting {
        /// Attempt number, starting at 1.
        attempt: u32,
    },
    /// Reconnect attempts exhausted; stays closed until the next `connect()`.
    ClosedFinal,
}

/// Socket ready state at the moment an error was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Handshake in progress.
    Connecting,
    /// Connection established.
    Open,
    /// Close handshake in progress.
    Closing,
    /// Closed, or never established.
    Closed,
}

impl ReadyState {
    /// User-facing description of the state.
    pub fn description(self) -> &'static str {
        match self {
            Self::Connecting => "Connecting...",
            Self::Open => "Connection established",
            Self::Closing => "Connection is closing",
            Self::Closed => "Connection closed or could not be established",
        }
    }
}

/// Transport-level error delivered to [`TransportListener::on_error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// State the socket was in.
    pub ready_state: ReadyState,
    /// Description derived from `ready_state`.
    pub description: String,
    /// Underlying error text.
    pub detail: String,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.description, self.detail)
    }
}

/// Local failure of a send operation. Nothing was transmitted.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
    /// The socket is not open; the frame was dropped.
    #[error("socket not connected ({0:?})")]
    NotOpen(ConnectionState),
    /// The frame could not be encoded.
    #[error("failed to encode frame: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Reconnect tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Wait before every attempt.
    pub delay: Duration,
    /// Attempts before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: constants::RECONNECT_DELAY,
            max_attempts: constants::MAX_RECONNECT_ATTEMPTS,
        }
    }
}

impl From<&Config> for ReconnectPolicy {
    fn from(config: &Config) -> Self {
        Self {
            delay: config.reconnect_delay(),
            max_attempts: config.max_reconnect_attempts,
        }
    }
}

/// State shared between the handle and the connection task.
#[derive(Debug, Default)]
struct Shared {
    state: ConnectionState,
    room: Option<RoomId>,
    attempts: u32,
    /// Bumped by every connect()/close(); tasks from older epochs are stale.
    epoch: u64,
    outbound: Option<mpsc::UnboundedSender<String>>,
    cancel: Option<CancellationToken>,
}

/// Owner of the chat socket.
///
/// Exactly one connection task is alive at a time. The controller drives it
/// through [`connect`](Self::connect), [`close`](Self::close) and the send
/// operations; it never sees the raw socket.
pub struct TransportSession {
    server_url: String,
    auth: Arc<AuthSession>,
    connector: Arc<dyn Connector>,
    router: Arc<MessageRouter>,
    listener: Arc<dyn TransportListener>,
    policy: ReconnectPolicy,
    shared: Arc<Mutex<Shared>>,
}

impl std::fmt::Debug for TransportSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportSession")
            .field("server_url", &self.server_url)
            .field("policy", &self.policy)
            .field("router", &self.router)
            .finish_non_exhaustive()
    }
}

impl TransportSession {
    /// Create a disconnected session.
    ///
    /// `router` is frozen here: handlers must be registered beforehand.
    pub fn new(
        server_url: &str,
        auth: Arc<AuthSession>,
        connector: Arc<dyn Connector>,
        router: MessageRouter,
        listener: Arc<dyn TransportListener>,
        policy: ReconnectPolicy,
    ) -> Self {
        Self {
            server_url: server_url.trim_end_matches('/').to_string(),
            auth,
            connector,
            router: Arc::new(router),
            listener,
            policy,
            shared: Arc::new(Mutex::new(Shared::default())),
        }
    }

    /// Connect to `room`, replacing any existing connection.
    ///
    /// The previous connection (or pending reconnect) is cancelled and closed
    /// gracefully without triggering a reconnect. Returns immediately; the
    /// handshake runs on a spawned task, so this must be called from within a
    /// Tokio runtime.
    pub fn connect(&self, room: RoomId) {
        let (cancel, epoch) = {
            let mut shared = self.lock();
            if let Some(previous) = shared.cancel.take() {
                log::debug!("[Transport] Closing previous connection before connecting to room {}", room);
                previous.cancel();
            }
            let cancel = CancellationToken::new();
            shared.epoch += 1;
            shared.room = Some(room);
            shared.attempts = 0;
            shared.outbound = None;
            shared.state = ConnectionState::Connecting;
            shared.cancel = Some(cancel.clone());
            (cancel, shared.epoch)
        };
        self.listener.on_state_change(&ConnectionState::Connecting);

        let task = ConnectionTask {
            server_url: self.server_url.clone(),
            auth: Arc::clone(&self.auth),
            connector: Arc::clone(&self.connector),
            router: Arc::clone(&self.router),
            listener: Arc::clone(&self.listener),
            policy: self.policy,
            shared: Arc::clone(&self.shared),
            room,
            epoch,
            cancel,
        };
        tokio::spawn(task.run());
    }

    /// User-initiated teardown.
    ///
    /// Clears the current room and cancels any scheduled reconnect.
    pub fn close(&self) {
        let changed = {
            let mut shared = self.lock();
            if let Some(cancel) = shared.cancel.take() {
                cancel.cancel();
            }
            shared.epoch += 1;
            shared.room = None;
            shared.attempts = 0;
            shared.outbound = None;
            let changed = shared.state != ConnectionState::Disconnected;
            shared.state = ConnectionState::Disconnected;
            changed
        };
        if changed {
            log::info!("[Transport] Closed by user");
            self.listener.on_state_change(&ConnectionState::Disconnected);
        }
    }

    /// Queue `frame` on the open socket.
    ///
    /// When the socket is not open the frame is dropped and
    /// [`SendError::NotOpen`] is returned; it is never retried.
    pub fn send(&self, frame: &OutboundFrame) -> Result<(), SendError> {
        let text = serde_json::to_string(frame)?;
        let shared = self.lock();
        if shared.state == ConnectionState::Open {
            if let Some(tx) = &shared.outbound {
                if tx.send(text).is_ok() {
                    return Ok(());
                }
            }
        }
        let state = shared.state.clone();
        drop(shared);
        log::error!("[Transport] Socket not connected ({:?}), dropping frame", state);
        Err(SendError::NotOpen(state))
    }

    /// Send a text message to the current room.
    pub fn send_text(&self, content: &str) -> Result<(), SendError> {
        self.send_kind(MessageKind::Text, content.to_string())
    }

    /// Send an image (as a data URI) to the current room.
    pub fn send_image(&self, data_uri: &str) -> Result<(), SendError> {
        self.send_kind(MessageKind::Image, data_uri.to_string())
    }

    /// Send a file to the current room. The descriptor travels as a JSON string.
    pub fn send_file(&self, descriptor: &FileDescriptor) -> Result<(), SendError> {
        let content = serde_json::to_string(descriptor)?;
        self.send_kind(MessageKind::File, content)
    }

    fn send_kind(&self, kind: MessageKind, content: String) -> Result<(), SendError> {
        let Some(room) = self.current_room() else {
            log::error!("[Transport] No current room, dropping frame");
            return Err(SendError::NotOpen(self.state()));
        };
        self.send(&OutboundFrame::new(kind, content, room))
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.lock().state.clone()
    }

    /// Room the session is (re)connecting to, if any.
    pub fn current_room(&self) -> Option<RoomId> {
        self.lock().room
    }

    /// Reconnect attempts since the last successful open.
    pub fn reconnect_attempts(&self) -> u32 {
        self.lock().attempts
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().expect("transport state lock poisoned")
    }
}

impl Drop for TransportSession {
    fn drop(&mut self) {
        if let Ok(mut shared) = self.shared.lock() {
            if let Some(cancel) = shared.cancel.take() {
                cancel.cancel();
            }
        }
    }
}

/// How a single connection ended.
enum ConnectionExit {
    /// Cancelled by close() or a newer connect().
    Cancelled,
    /// Lost without the user asking.
    Disconnected,
}

/// Background task owning the socket for one connect() call.
struct ConnectionTask {
    server_url: String,
    auth: Arc<AuthSession>,
    connector: Arc<dyn Connector>,
    router: Arc<MessageRouter>,
    listener: Arc<dyn TransportListener>,
    policy: ReconnectPolicy,
    shared: Arc<Mutex<Shared>>,
    room: RoomId,
    epoch: u64,
    cancel: CancellationToken,
}

impl ConnectionTask {
    async fn run(self) {
        loop {
            let token = self.auth.token().unwrap_or_default();
            let url = ws::chat_url(&self.server_url, self.room, &token);
            log::info!("[Transport] Connecting to {}", ws::redact_token(&url));

            // A handshake that completes as the session is torn down still
            // yields its socket, so it can be closed below.
            let connected = tokio::select! {
                biased;
                result = self.connector.connect(&url) => result,
                () = self.cancel.cancelled() => return,
            };

            match connected {
                Ok((mut sink, source)) => {
                    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
                    if !self.mark_open(outbound_tx) {
                        if let Err(e) = sink.close().await {
                            log::debug!("[Transport] Close of superseded connection failed: {}", e);
                        }
                        return;
                    }
                    log::info!("[Transport] Connected to room {}", self.room);
                    self.listener.on_state_change(&ConnectionState::Open);

                    if let ConnectionExit::Cancelled = self.pump(sink, source, outbound_rx).await {
                        return;
                    }
                }
                Err(e) => {
                    self.report_error(ReadyState::Closed, &e);
                }
            }

            let Some(attempt) = self.schedule_reconnect() else {
                return;
            };
            log::info!(
                "[Transport] Reconnecting to room {} in {}ms ({}/{})",
                self.room,
                self.policy.delay.as_millis(),
                attempt,
                self.policy.max_attempts
            );
            tokio::select! {
                () = self.cancel.cancelled() => {
                    log::debug!("[Transport] Scheduled reconnect cancelled");
                    return;
                }
                () = tokio::time::sleep(self.policy.delay) => {}
            }
        }
    }

    /// Route inbound frames and write outbound ones until the socket goes away.
    async fn pump(
        &self,
        mut sink: Box<dyn FrameSink>,
        mut source: Box<dyn FrameSource>,
        mut outbound_rx: mpsc::UnboundedReceiver<String>,
    ) -> ConnectionExit {
        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    if let Err(e) = sink.close().await {
                        log::debug!("[Transport] Close after cancel failed: {}", e);
                    }
                    return ConnectionExit::Cancelled;
                }

                msg = source.recv() => match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        self.router.dispatch(&text);
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        if let Err(e) = sink.send_pong(data).await {
                            self.report_error(ReadyState::Open, &e);
                            return ConnectionExit::Disconnected;
                        }
                    }
                    Some(Ok(WsMessage::Close { code, reason })) => {
                        log::info!("[Transport] Connection closed by server ({} {})", code, reason);
                        if let Err(e) = sink.close().await {
                            self.report_error(ReadyState::Closing, &e);
                        }
                        return ConnectionExit::Disconnected;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        self.report_error(ReadyState::Open, &e);
                        return ConnectionExit::Disconnected;
                    }
                    None => {
                        log::info!("[Transport] WebSocket stream ended");
                        return ConnectionExit::Disconnected;
                    }
                },

                Some(text) = outbound_rx.recv() => {
                    if let Err(e) = sink.send_text(&text).await {
                        self.report_error(ReadyState::Open, &e);
                        return ConnectionExit::Disconnected;
                    }
                }
            }
        }
    }

    /// Record a successful open. Returns `false` if this task is stale.
    fn mark_open(&self, outbound: mpsc::UnboundedSender<String>) -> bool {
        let mut shared = self.lock();
        if shared.epoch != self.epoch || self.cancel.is_cancelled() {
            return false;
        }
        shared.state = ConnectionState::Open;
        shared.attempts = 0;
        shared.outbound = Some(outbound);
        true
    }

    /// Decide what follows an unexpected close.
    ///
    /// Returns the attempt number to wait for, or `None` when the task must
    /// stop (stale, room cleared, or attempts exhausted).
    fn schedule_reconnect(&self) -> Option<u32> {
        let next = {
            let mut shared = self.lock();
            if shared.epoch != self.epoch || shared.room.is_none() {
                return None;
            }
            shared.outbound = None;
            if shared.attempts >= self.policy.max_attempts {
                shared.state = ConnectionState::ClosedFinal;
                shared.cancel = None;
                None
            } else {
                shared.attempts += 1;
                shared.state = ConnectionState::Reconnecting {
                    attempt: shared.attempts,
                };
                Some(shared.attempts)
            }
        };

        match next {
            Some(attempt) => {
                self.listener
                    .on_state_change(&ConnectionState::Reconnecting { attempt });
            }
            None => {
                log::error!(
                    "[Transport] Giving up on room {} after {} reconnect attempts",
                    self.room,
                    self.policy.max_attempts
                );
                self.listener.on_state_change(&ConnectionState::ClosedFinal);
                self.listener.on_reconnect_failed();
            }
        }
        next
    }

    fn report_error(&self, ready_state: ReadyState, error: &anyhow::Error) {
        let error = TransportError {
            ready_state,
            description: ready_state.description().to_string(),
            detail: format!("{error:#}"),
        };
        log::error!("[Transport] {}", error);
        self.listener.on_error(&error);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Shared> {
        self.shared.lock().expect("transport state lock poisoned")
    }
}
