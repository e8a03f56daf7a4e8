//! Room session controller.
//!
//! Coordinates the HTTP gateway and the transport session so that the user
//! is in at most one room at a time:
//!
//! ```text
//!   NoRoom ──join──► Joining(id) ──ok──► InRoom(id) ──leave──► Leaving(id) ──ok──► NoRoom
//!     ▲                  │                  │  ▲                    │
//!     └──── failure ─────┘                  │  └────── failure ─────┘
//!                                           └── join(other): leave first
//! ```
//!
//! Each `join_room`, and each `leave_room` of the active or joining room, takes
//! a new generation. An async step that resumes after a newer flow started
//! sees a stale generation and abandons its flow without touching state; if
//! the server already let it into a room, it leaves that room again on a
//! best-effort basis.

use std::sync::{Arc, Mutex};

use crate::api::types::{CreateRoomRequest, RoomSummary};
use crate::api::{ApiError, RoomApi};
use crate::auth::AuthSession;
use crate::config::Config;
use crate::constants;
use crate::events::RoomListener;
use crate::protocol::{FileDescriptor, RoomId};
use crate::transport::{SendError, TransportSession};

/// Where the controller is in the room lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomPhase {
    /// Not in any room.
    #[default]
    NoRoom,
    /// Join request in flight.
    Joining(RoomId),
    /// Joined and connected.
    InRoom(RoomId),
    /// Leave request in flight for the active room.
    Leaving(RoomId),
}

impl RoomPhase {
    /// Room this phase refers to.
    pub fn room(self) -> Option<RoomId> {
        match self {
            Self::NoRoom => None,
            Self::Joining(id) | Self::InRoom(id) | Self::Leaving(id) => Some(id),
        }
    }
}

#[derive(Debug, Default)]
struct ControllerState {
    phase: RoomPhase,
    generation: u64,
}

/// Page sizes used for list and history requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    /// Room list page size.
    pub rooms: u32,
    /// History page size.
    pub history: u32,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            rooms: constants::ROOM_PAGE_SIZE,
            history: constants::HISTORY_PAGE_SIZE,
        }
    }
}

impl From<&Config> for Paging {
    fn from(config: &Config) -> Self {
        Self {
            rooms: config.room_page_size,
            history: config.history_page_size,
        }
    }
}

/// Drives room membership.
pub struct RoomController {
    api: Arc<dyn RoomApi>,
    transport: Arc<TransportSession>,
    listener: Arc<dyn RoomListener>,
    auth: Arc<AuthSession>,
    paging: Paging,
    state: Mutex<ControllerState>,
    transitions: Mutex<()>,
}

impl std::fmt::Debug for RoomController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomController")
            .field("phase", &self.phase())
            .field("paging", &self.paging)
            .finish_non_exhaustive()
    }
}

impl RoomController {
    /// Create a controller in [`RoomPhase::NoRoom`].
    pub fn new(
        api: Arc<dyn RoomApi>,
        transport: Arc<TransportSession>,
        listener: Arc<dyn RoomListener>,
        auth: Arc<AuthSession>,
    ) -> Self {
        Self {
            api,
            transport,
            listener,
            auth,
            paging: Paging::default(),
            state: Mutex::new(ControllerState::default()),
            transitions: Mutex::new(()),
        }
    }

    /// Override the default page sizes.
    pub fn with_paging(mut self, paging: Paging) -> Self {
        self.paging = paging;
        self
    }

    /// Join `room`, leaving the current room first.
    ///
    /// On success the socket is opened for `room`, its history is delivered
    /// oldest first and the room list is refreshed. On failure the attempt is
    /// abandoned, the error is surfaced and returned, and the controller
    /// falls back to [`RoomPhase::NoRoom`].
    pub async fn join_room(&self, room: RoomId) -> Result<(), ApiError> {
        if !room.is_set() {
            return Ok(());
        }

        let (generation, previous) = {
            let mut state = self.lock();
            state.generation += 1;
            let previous = match state.phase {
                RoomPhase::InRoom(current) if current != room => Some(current),
                _ => None,
            };
            (state.generation, previous)
        };

        if let Some(previous) = previous {
            if let Err(e) = self.leave(previous, false, false).await {
                log::warn!("[Rooms] Could not leave room {}, not joining {}", previous, room);
                return Err(e);
            }
        }

        {
            let mut state = self.lock();
            if state.generation != generation {
                return Ok(());
            }
            state.phase = RoomPhase::Joining(room);
        }
        log::info!("[Rooms] Joining room {}", room);

        if let Err(e) = self.api.join_room(room).await {
            if self.fall_back(generation) {
                self.surface(&e);
            } else {
                log::debug!("[Rooms] Superseded join of room {} failed: {}", room, e);
            }
            return Err(e);
        }

        // Open the socket only if no newer flow started meanwhile.
        let connected = {
            let _transitions = self.transitions();
            let current = {
                let mut state = self.lock();
                let current = state.generation == generation;
                if current {
                    state.phase = RoomPhase::InRoom(room);
                }
                current
            };
            if current {
                self.transport.connect(room);
            }
            current
        };
        if !connected {
            self.abandon(room).await;
            return Ok(());
        }

        let history = match self
            .api
            .chat_history(room, constants::FIRST_PAGE, self.paging.history)
            .await
        {
            Ok(history) => history,
            Err(e) => {
                let current = {
                    let _transitions = self.transitions();
                    let current = self.fall_back(generation);
                    if current {
                        self.transport.close();
                    }
                    current
                };
                if current {
                    self.abandon(room).await;
                    self.surface(&e);
                }
                return Err(e);
            }
        };

        if !self.is_current(generation) {
            return Ok(());
        }
        let mut messages = history.messages;
        messages.reverse();
        self.listener.on_history(room, &messages);

        self.refresh_room_list().await;
        Ok(())
    }

    /// Leave `room`.
    ///
    /// Leaving the active room, or the room a join is in flight for, cancels
    /// any pending join and clears local state; the chat area is cleared as
    /// well when `clear_ui` is set. The room list is refreshed after every
    /// successful leave.
    pub async fn leave_room(&self, room: RoomId, clear_ui: bool) -> Result<(), ApiError> {
        self.leave(room, clear_ui, true).await
    }

    /// Leave `room`. With `supersede`, pending joins are invalidated; a join
    /// switching rooms leaves without superseding itself.
    async fn leave(&self, room: RoomId, clear_ui: bool, supersede: bool) -> Result<(), ApiError> {
        if !room.is_set() {
            return Ok(());
        }

        let (previous, active) = {
            let mut state = self.lock();
            let previous = state.phase;
            let active = matches!(
                previous,
                RoomPhase::InRoom(current) | RoomPhase::Joining(current) if current == room
            );
            if active {
                if supersede {
                    state.generation += 1;
                }
                state.phase = RoomPhase::Leaving(room);
            }
            (previous, active)
        };
        log::info!("[Rooms] Leaving room {}", room);

        if let Err(e) = self.api.leave_room(room).await {
            if active {
                let mut state = self.lock();
                if state.phase == RoomPhase::Leaving(room) {
                    // A superseded join never reached the room.
                    state.phase = match previous {
                        RoomPhase::InRoom(_) => previous,
                        _ => RoomPhase::NoRoom,
                    };
                }
            }
            self.release_orphaned(room);
            self.surface(&e);
            return Err(e);
        }

        let cleared = {
            let mut state = self.lock();
            let cleared = state.phase == RoomPhase::Leaving(room);
            if cleared {
                state.phase = RoomPhase::NoRoom;
            }
            cleared
        };
        self.release_orphaned(room);
        if cleared && clear_ui {
            self.listener.on_room_cleared(room);
        }

        self.refresh_room_list().await;
        Ok(())
    }

    /// Create a room, refresh the list, then join it.
    ///
    /// A failed auto-join is surfaced by the join itself; the created room is
    /// still returned.
    pub async fn create_room(
        &self,
        request: &CreateRoomRequest,
    ) -> Result<RoomSummary, ApiError> {
        let room = match self.api.create_room(request).await {
            Ok(room) => room,
            Err(e) => {
                self.surface(&e);
                return Err(e);
            }
        };
        log::info!("[Rooms] Created room {} ({})", room.id, room.name);

        self.refresh_room_list().await;
        if let Err(e) = self.join_room(room.id).await {
            log::warn!("[Rooms] Created room {} but could not join: {}", room.id, e);
        }
        Ok(room)
    }

    /// Delete `room` after the user confirms.
    ///
    /// Returns `Ok(false)` when the user declined.
    pub async fn delete_room(&self, room: RoomId) -> Result<bool, ApiError> {
        if !self.listener.confirm_delete(room) {
            return Ok(false);
        }

        if let Err(e) = self.api.delete_room(room).await {
            self.surface(&e);
            return Err(e);
        }
        log::info!("[Rooms] Deleted room {}", room);

        let was_active = {
            let _transitions = self.transitions();
            let was_active = {
                let mut state = self.lock();
                let was_active = state.phase.room() == Some(room);
                if was_active {
                    state.phase = RoomPhase::NoRoom;
                    state.generation += 1;
                }
                was_active
            };
            if was_active {
                self.transport.close();
            }
            was_active
        };
        if was_active {
            self.listener.on_room_cleared(room);
        }

        self.refresh_room_list().await;
        Ok(true)
    }

    /// Fetch the first page of rooms and hand it to the listener.
    ///
    /// Failures are logged only.
    pub async fn refresh_room_list(&self) {
        match self
            .api
            .list_rooms(constants::FIRST_PAGE, self.paging.rooms)
            .await
        {
            Ok(page) => self.listener.on_room_list(&page, self.current_room()),
            Err(e) => log::warn!("[Rooms] Failed to refresh room list: {}", e),
        }
    }

    /// Drop the connection and the stored credentials.
    pub fn logout(&self) -> anyhow::Result<()> {
        {
            let _transitions = self.transitions();
            {
                let mut state = self.lock();
                state.phase = RoomPhase::NoRoom;
                state.generation += 1;
            }
            self.transport.close();
        }
        self.auth.clear()
    }

    /// Send a text message to the active room.
    pub fn send_text(&self, content: &str) -> Result<(), SendError> {
        self.transport.send_text(content)
    }

    /// Send an image data URI to the active room.
    pub fn send_image(&self, data_uri: &str) -> Result<(), SendError> {
        self.transport.send_image(data_uri)
    }

    /// Send a file to the active room.
    pub fn send_file(&self, descriptor: &FileDescriptor) -> Result<(), SendError> {
        self.transport.send_file(descriptor)
    }

    /// The room the user is in, once joined.
    pub fn current_room(&self) -> Option<RoomId> {
        match self.lock().phase {
            RoomPhase::InRoom(room) | RoomPhase::Leaving(room) => Some(room),
            RoomPhase::NoRoom | RoomPhase::Joining(_) => None,
        }
    }

    /// Current lifecycle phase.
    pub fn phase(&self) -> RoomPhase {
        self.lock().phase
    }

    /// Transport session driven by this controller.
    pub fn transport(&self) -> &TransportSession {
        &self.transport
    }

    fn is_current(&self, generation: u64) -> bool {
        self.lock().generation == generation
    }

    /// Reset to NoRoom if `generation` is still current.
    fn fall_back(&self, generation: u64) -> bool {
        let mut state = self.lock();
        if state.generation == generation {
            state.phase = RoomPhase::NoRoom;
            true
        } else {
            false
        }
    }

    /// Close the socket if it still points at `room` but no flow owns that
    /// room any more.
    fn release_orphaned(&self, room: RoomId) {
        let _transitions = self.transitions();
        if self.transport.current_room() == Some(room) && self.phase().room() != Some(room) {
            log::debug!("[Rooms] Closing connection to room {} after leaving it", room);
            self.transport.close();
        }
    }

    /// Best-effort leave of a room joined server-side by an abandoned flow.
    async fn abandon(&self, room: RoomId) {
        if self.phase().room() == Some(room) {
            return;
        }
        if let Err(e) = self.api.leave_room(room).await {
            log::debug!("[Rooms] Best-effort leave of room {} failed: {}", room, e);
        }
    }

    fn surface(&self, error: &ApiError) {
        // Unauthorized is reported through the auth listener.
        if !error.is_unauthorized() {
            self.listener.on_notice(&error.to_string());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ControllerState> {
        self.state.lock().expect("controller state lock poisoned")
    }

    /// Held while a phase change and the transport call it implies happen.
    /// The state lock itself is released before calling the transport, whose
    /// listener may read the controller.
    fn transitions(&self) -> std::sync::MutexGuard<'_, ()> {
        self.transitions.lock().expect("controller transitions lock poisoned")
    }
}
