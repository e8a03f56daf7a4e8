//! Request and response payloads of the HTTP API.

use serde::{Deserialize, Serialize};

use crate::auth::UserProfile;
use crate::protocol::{MessageEnvelope, RoomId};

/// `{code, message, data}` wrapper around every response.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    /// 0 on success, 401 on authorization failure, anything else is an
    /// application error.
    pub code: i64,
    /// Human-readable message accompanying a non-zero code.
    #[serde(default)]
    pub message: String,
    /// Payload, absent for some successful calls and most errors.
    pub data: Option<T>,
}

/// Entry of the room list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    /// Room id.
    pub id: RoomId,
    /// Room name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Invite-only flag.
    #[serde(default)]
    pub is_private: bool,
    /// Id of the user who created the room.
    #[serde(default)]
    pub creator_id: u64,
    /// Members currently in the room.
    #[serde(default)]
    pub user_count: u64,
}

/// One page of the room list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomPage {
    /// Rooms on this page.
    #[serde(default)]
    pub list: Vec<RoomSummary>,
    /// Total number of rooms.
    #[serde(default)]
    pub total: u64,
    /// 1-based page number.
    #[serde(default)]
    pub page: u32,
    /// Page size.
    #[serde(default)]
    pub size: u32,
}

/// One page of chat history, newest message first.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistoryPage {
    /// Messages, newest first.
    #[serde(default)]
    pub messages: Vec<MessageEnvelope>,
    /// Total number of stored messages.
    #[serde(default)]
    pub total: u64,
    /// 1-based page number.
    #[serde(default)]
    pub page: u32,
    /// Page size.
    #[serde(default)]
    pub size: u32,
}

/// Body of `POST /api/chatroom/create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    /// Room name (2-50 characters server-side).
    pub name: String,
    /// Description (up to 200 characters server-side).
    pub description: String,
    /// Invite-only flag.
    pub is_private: bool,
}

/// Body of `POST /api/user/login`.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub(crate) username: &'a str,
    pub(crate) password: &'a str,
}

/// Successful login payload.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    /// Bearer token.
    pub token: String,
    /// User id.
    pub id: u64,
    /// Login name.
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub nickname: String,
    /// Avatar URL.
    #[serde(default)]
    pub avatar: String,
}

impl LoginResponse {
    /// Split into token and profile.
    pub fn into_parts(self) -> (String, UserProfile) {
        (
            self.token,
            UserProfile {
                id: self.id,
                username: self.username,
                nickname: self.nickname,
                avatar: self.avatar,
            },
        )
    }
}
