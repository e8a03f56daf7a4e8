//! In-memory doubles shared by the unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};

use crate::api::types::{CreateRoomRequest, HistoryPage, RoomPage, RoomSummary};
use crate::api::{ApiError, RoomApi};
use crate::events::{RoomListener, TransportListener};
use crate::protocol::{MessageEnvelope, RoomId};
use crate::transport::{
    ConnectionState, Connector, FrameSink, FrameSource, SocketPair, TransportError,
};
use crate::ws::WsMessage;

/// Let spawned tasks run without advancing time.
pub(crate) async fn settle() {
    for _ in 0..100 {
        tokio::task::yield_now().await;
    }
}

/// Yield until `condition` holds. Panics if it never does.
pub(crate) async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}

// ============================================================================
// Connector
// ============================================================================

#[derive(Debug, Default)]
struct SinkLog {
    sent: Vec<String>,
    pongs: usize,
    closed: bool,
}

/// Server side of a scripted connection.
#[derive(Debug, Clone)]
pub(crate) struct ServerEnd {
    inbound: mpsc::UnboundedSender<Result<WsMessage>>,
    log: Arc<Mutex<SinkLog>>,
}

impl ServerEnd {
    pub(crate) fn push(&self, msg: WsMessage) {
        let _ = self.inbound.send(Ok(msg));
    }

    pub(crate) fn push_text(&self, text: &str) {
        self.push(WsMessage::Text(text.to_string()));
    }

    /// Abnormal close from the server side.
    pub(crate) fn disconnect(&self) {
        self.push(WsMessage::Close {
            code: 1006,
            reason: String::new(),
        });
    }

    /// Read error on the client side.
    pub(crate) fn fail(&self, error: &str) {
        let _ = self.inbound.send(Err(anyhow::anyhow!("{error}")));
    }

    /// Text frames the client wrote.
    pub(crate) fn sent(&self) -> Vec<String> {
        self.log.lock().unwrap().sent.clone()
    }

    pub(crate) fn pongs(&self) -> usize {
        self.log.lock().unwrap().pongs
    }

    /// Whether the client closed its end.
    pub(crate) fn is_closed(&self) -> bool {
        self.log.lock().unwrap().closed
    }
}

struct MockSink {
    log: Arc<Mutex<SinkLog>>,
}

#[async_trait]
impl FrameSink for MockSink {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        anyhow::ensure!(!log.closed, "sink closed");
        log.sent.push(text.to_string());
        Ok(())
    }

    async fn send_pong(&mut self, _data: Vec<u8>) -> Result<()> {
        self.log.lock().unwrap().pongs += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.log.lock().unwrap().closed = true;
        Ok(())
    }
}

struct MockSource {
    inbound: mpsc::UnboundedReceiver<Result<WsMessage>>,
}

#[async_trait]
impl FrameSource for MockSource {
    async fn recv(&mut self) -> Option<Result<WsMessage>> {
        self.inbound.recv().await
    }
}

/// Connector whose connections are driven from the test.
#[derive(Debug, Default)]
pub(crate) struct MockConnector {
    refuse: AtomicBool,
    gate: Mutex<Option<Arc<Notify>>>,
    urls: Mutex<Vec<String>>,
    servers: Mutex<Vec<ServerEnd>>,
}

impl MockConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make subsequent handshakes fail.
    pub(crate) fn set_refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Hold the next handshake until the returned handle is notified.
    pub(crate) fn gate(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(Arc::clone(&notify));
        notify
    }

    /// Every URL a handshake was attempted against.
    pub(crate) fn urls(&self) -> Vec<String> {
        self.urls.lock().unwrap().clone()
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.urls.lock().unwrap().len()
    }

    /// Handshakes that succeeded.
    pub(crate) fn opened(&self) -> usize {
        self.servers.lock().unwrap().len()
    }

    /// Server end of the `index`-th successful connection.
    pub(crate) fn server(&self, index: usize) -> ServerEnd {
        self.servers.lock().unwrap()[index].clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> Result<SocketPair> {
        self.urls.lock().unwrap().push(url.to_string());
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if self.refuse.load(Ordering::SeqCst) {
            anyhow::bail!("connection refused");
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let log = Arc::new(Mutex::new(SinkLog::default()));
        self.servers.lock().unwrap().push(ServerEnd {
            inbound: tx,
            log: Arc::clone(&log),
        });
        Ok((Box::new(MockSink { log }), Box::new(MockSource { inbound: rx })))
    }
}

// ============================================================================
// Listeners
// ============================================================================

#[derive(Debug, Default)]
pub(crate) struct RecordingTransportListener {
    states: Mutex<Vec<ConnectionState>>,
    errors: Mutex<Vec<TransportError>>,
    reconnect_failed: AtomicUsize,
}

impl RecordingTransportListener {
    pub(crate) fn states(&self) -> Vec<ConnectionState> {
        self.states.lock().unwrap().clone()
    }

    pub(crate) fn errors(&self) -> Vec<TransportError> {
        self.errors.lock().unwrap().clone()
    }

    pub(crate) fn reconnect_failed_count(&self) -> usize {
        self.reconnect_failed.load(Ordering::SeqCst)
    }
}

impl TransportListener for RecordingTransportListener {
    fn on_state_change(&self, state: &ConnectionState) {
        self.states.lock().unwrap().push(state.clone());
    }

    fn on_error(&self, error: &TransportError) {
        self.errors.lock().unwrap().push(error.clone());
    }

    fn on_reconnect_failed(&self) {
        self.reconnect_failed.fetch_add(1, Ordering::SeqCst);
    }
}

/// Records room callbacks as short strings, e.g. `history:42:a,b`.
#[derive(Debug, Default)]
pub(crate) struct RecordingRoomListener {
    events: Mutex<Vec<String>>,
    confirm: AtomicBool,
}

impl RecordingRoomListener {
    pub(crate) fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub(crate) fn set_confirm(&self, confirm: bool) {
        self.confirm.store(confirm, Ordering::SeqCst);
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl RoomListener for RecordingRoomListener {
    fn on_history(&self, room: RoomId, messages: &[MessageEnvelope]) {
        let contents: Vec<&str> = messages.iter().map(|m| m.content.as_str()).collect();
        self.record(format!("history:{}:{}", room, contents.join(",")));
    }

    fn on_room_list(&self, page: &RoomPage, current: Option<RoomId>) {
        let current = current.map_or_else(|| "-".to_string(), |r| r.to_string());
        self.record(format!("list:{}:{}", page.list.len(), current));
    }

    fn on_room_cleared(&self, room: RoomId) {
        self.record(format!("cleared:{room}"));
    }

    fn on_notice(&self, message: &str) {
        self.record(format!("notice:{message}"));
    }

    fn confirm_delete(&self, _room: RoomId) -> bool {
        self.confirm.load(Ordering::SeqCst)
    }
}

// ============================================================================
// Room API
// ============================================================================

/// Scripted [`RoomApi`]. Records calls as `op:room` strings
/// (`join:42`, `history:42`, `list`).
#[derive(Debug, Default)]
pub(crate) struct FakeRoomApi {
    calls: Mutex<Vec<String>>,
    failures: Mutex<HashMap<String, (i64, String)>>,
    history: Mutex<HashMap<RoomId, Vec<MessageEnvelope>>>,
    rooms: Mutex<Vec<RoomSummary>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    next_room: AtomicUsize,
}

impl FakeRoomApi {
    pub(crate) fn new() -> Arc<Self> {
        let api = Self::default();
        api.next_room.store(100, Ordering::SeqCst);
        Arc::new(api)
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every call to `op` fail with envelope `code`.
    pub(crate) fn fail(&self, op: &str, code: i64, message: &str) {
        self.failures
            .lock()
            .unwrap()
            .insert(op.to_string(), (code, message.to_string()));
    }

    pub(crate) fn succeed(&self, op: &str) {
        self.failures.lock().unwrap().remove(op);
    }

    /// History for `room`, newest first, one text message per entry.
    pub(crate) fn set_history(&self, room: RoomId, newest_first: &[&str]) {
        let messages = newest_first
            .iter()
            .map(|content| {
                serde_json::from_value(serde_json::json!({
                    "type": 0, "content": content, "roomId": room.0
                }))
                .unwrap()
            })
            .collect();
        self.history.lock().unwrap().insert(room, messages);
    }

    /// Block `call` (e.g. `join:1`) until the returned handle is notified.
    pub(crate) fn gate(&self, call: &str) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.gates
            .lock()
            .unwrap()
            .insert(call.to_string(), Arc::clone(&notify));
        notify
    }

    async fn enter(&self, op: &str, call: String) -> Result<(), ApiError> {
        self.calls.lock().unwrap().push(call.clone());
        let gate = self.gates.lock().unwrap().get(&call).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        match self.failures.lock().unwrap().get(op) {
            Some((401, _)) => Err(ApiError::Unauthorized),
            Some((code, message)) => Err(ApiError::Application {
                code: *code,
                message: message.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RoomApi for FakeRoomApi {
    async fn list_rooms(&self, page: u32, size: u32) -> Result<RoomPage, ApiError> {
        self.enter("list", "list".to_string()).await?;
        let list = self.rooms.lock().unwrap().clone();
        Ok(RoomPage {
            total: list.len() as u64,
            list,
            page,
            size,
        })
    }

    async fn create_room(&self, request: &CreateRoomRequest) -> Result<RoomSummary, ApiError> {
        self.enter("create", format!("create:{}", request.name)).await?;
        let id = self.next_room.fetch_add(1, Ordering::SeqCst) as u64;
        let room = RoomSummary {
            id: RoomId(id),
            name: request.name.clone(),
            description: request.description.clone(),
            is_private: request.is_private,
            creator_id: 1,
            user_count: 0,
        };
        self.rooms.lock().unwrap().push(room.clone());
        Ok(room)
    }

    async fn join_room(&self, room: RoomId) -> Result<(), ApiError> {
        self.enter("join", format!("join:{room}")).await
    }

    async fn leave_room(&self, room: RoomId) -> Result<(), ApiError> {
        self.enter("leave", format!("leave:{room}")).await
    }

    async fn delete_room(&self, room: RoomId) -> Result<(), ApiError> {
        self.enter("delete", format!("delete:{room}")).await?;
        self.rooms.lock().unwrap().retain(|r| r.id != room);
        Ok(())
    }

    async fn chat_history(
        &self,
        room: RoomId,
        page: u32,
        size: u32,
    ) -> Result<HistoryPage, ApiError> {
        self.enter("history", format!("history:{room}")).await?;
        let messages = self
            .history
            .lock()
            .unwrap()
            .get(&room)
            .cloned()
            .unwrap_or_default();
        Ok(HistoryPage {
            total: messages.len() as u64,
            messages,
            page,
            size,
        })
    }
}
