//! Listener interfaces implemented by the presentation layer.
//!
//! The core never renders anything. It reports through these traits, which
//! the front-end subscribes to by handing an implementation to the transport
//! session, the controller and the API client. Every method has a no-op
//! default so implementors pick what they display.

use crate::api::types::RoomPage;
use crate::protocol::{MessageEnvelope, RoomId};
use crate::transport::{ConnectionState, TransportError};

/// Socket lifecycle notifications.
pub trait TransportListener: Send + Sync {
    /// The connection moved to `state`.
    fn on_state_change(&self, _state: &ConnectionState) {}

    /// A transport-level error occurred. The socket may still be open.
    fn on_error(&self, _error: &TransportError) {}

    /// Reconnect attempts are exhausted. Fires once per exhaustion; the
    /// session stays closed until the user connects again.
    fn on_reconnect_failed(&self) {}
}

/// Room membership and history notifications.
pub trait RoomListener: Send + Sync {
    /// Chat history for `room`, oldest first. The chat area should be
    /// replaced with it.
    fn on_history(&self, _room: RoomId, _messages: &[MessageEnvelope]) {}

    /// Fresh room list; `current` is the active room, if any.
    fn on_room_list(&self, _page: &RoomPage, _current: Option<RoomId>) {}

    /// The active room was left or deleted; the chat area should be cleared.
    fn on_room_cleared(&self, _room: RoomId) {}

    /// User-facing error message for an abandoned operation.
    fn on_notice(&self, _message: &str) {}

    /// Ask the user to confirm deleting `room`. Defaults to refusing.
    fn confirm_delete(&self, _room: RoomId) -> bool {
        false
    }
}

/// Authorization notifications from the API gateway.
pub trait AuthListener: Send + Sync {
    /// Credentials were rejected and have been cleared; the user must log in
    /// again.
    fn on_unauthorized(&self) {}
}

/// Listener that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl TransportListener for NoopListener {}
impl RoomListener for NoopListener {}
impl AuthListener for NoopListener {}
