//! Wire types shared by the socket and the HTTP API.
//!
//! Two small-integer enumerations travel in the same `type` field and must
//! not be confused:
//!
//! - [`MessageKind`] - what a chat message contains (0 text, 1 image, 2 file,
//!   3 system). Used on outbound frames and stored history.
//! - [`EventKind`] - server event discriminants used for routing (1 text,
//!   2 join, 3 leave, 4 user list, 5 error, 6 notification).
//!
//! Routing is keyed by the raw discriminant, [`FrameType`]; both enums
//! convert into it.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Chat room identifier. `0` means "no room".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl RoomId {
    /// Whether this id refers to an actual room.
    pub fn is_set(self) -> bool {
        self.0 != 0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RoomId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Raw frame discriminant as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrameType(pub i64);

impl std::fmt::Display for FrameType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for FrameType {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

/// Content type of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// Plain text.
    Text,
    /// Image as a data URI.
    Image,
    /// File as a JSON-encoded [`FileDescriptor`].
    File,
    /// Server-generated system message.
    System,
}

impl MessageKind {
    /// Wire discriminant.
    pub fn code(self) -> i64 {
        match self {
            Self::Text => 0,
            Self::Image => 1,
            Self::File => 2,
            Self::System => 3,
        }
    }

    /// Parse a wire discriminant.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Text),
            1 => Some(Self::Image),
            2 => Some(Self::File),
            3 => Some(Self::System),
            _ => None,
        }
    }
}

impl From<MessageKind> for FrameType {
    fn from(kind: MessageKind) -> Self {
        Self(kind.code())
    }
}

/// Server event discriminant used for routing inbound frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Text broadcast.
    Text,
    /// A user joined the room.
    Join,
    /// A user left the room.
    Leave,
    /// Full member list of the room.
    UserList,
    /// Server-side error.
    Error,
    /// System notification.
    Notification,
}

impl EventKind {
    /// Wire discriminant.
    pub fn code(self) -> i64 {
        match self {
            Self::Text => 1,
            Self::Join => 2,
            Self::Leave => 3,
            Self::UserList => 4,
            Self::Error => 5,
            Self::Notification => 6,
        }
    }

    /// Parse a wire discriminant.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Text),
            2 => Some(Self::Join),
            3 => Some(Self::Leave),
            4 => Some(Self::UserList),
            5 => Some(Self::Error),
            6 => Some(Self::Notification),
            _ => None,
        }
    }
}

impl From<EventKind> for FrameType {
    fn from(kind: EventKind) -> Self {
        Self(kind.code())
    }
}

/// Frame sent by the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundFrame {
    /// Message kind discriminant.
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    /// Text, data URI, or JSON file descriptor.
    pub content: String,
    /// Room the message is addressed to.
    pub room_id: RoomId,
}

impl OutboundFrame {
    /// Build a frame of the given kind.
    pub fn new(kind: MessageKind, content: String, room_id: RoomId) -> Self {
        Self {
            frame_type: kind.into(),
            content,
            room_id,
        }
    }
}

/// File attachment carried inline in a File message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    /// Original file name.
    pub name: String,
    /// Size in bytes.
    pub size: u64,
    /// MIME type.
    #[serde(rename = "type")]
    pub mime_type: String,
    /// File contents as a data URI.
    pub data: String,
}

/// Member entry of a UserList frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomMember {
    /// User id.
    pub id: u64,
    /// Login name.
    #[serde(default)]
    pub username: String,
    /// Display name.
    #[serde(default)]
    pub nickname: String,
    /// Avatar URL.
    #[serde(default)]
    pub avatar: String,
    /// 0 offline, 1 online.
    #[serde(default)]
    pub status: i64,
}

/// Message produced by the server: live frames and history entries alike.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    /// Raw discriminant; see the module docs for its two meanings.
    #[serde(rename = "type")]
    pub frame_type: FrameType,
    /// Stored message id (history entries only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    /// Text, data URI, or JSON file descriptor.
    #[serde(default)]
    pub content: String,
    /// Structured payload (member list for UserList frames).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Room the message belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room_id: Option<RoomId>,
    /// Sender id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<u64>,
    /// Sender login name.
    #[serde(default)]
    pub username: String,
    /// Sender display name.
    #[serde(default)]
    pub nickname: String,
    /// Sender avatar URL.
    #[serde(default)]
    pub avatar: String,
    /// RFC 3339 timestamp.
    #[serde(default)]
    pub timestamp: String,
}

impl MessageEnvelope {
    /// Content kind, if the discriminant is a message kind.
    pub fn message_kind(&self) -> Option<MessageKind> {
        MessageKind::from_code(self.frame_type.0)
    }

    /// Name to show for the sender: nickname, else username.
    pub fn sender_display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.username
        } else {
            &self.nickname
        }
    }

    /// Avatar to show for the sender.
    pub fn avatar_ref(&self) -> &str {
        if self.avatar.is_empty() {
            constants::DEFAULT_AVATAR
        } else {
            &self.avatar
        }
    }

    /// Decode the content as a file descriptor.
    pub fn file_descriptor(&self) -> Option<FileDescriptor> {
        serde_json::from_str(&self.content).ok()
    }

    /// Decode `data` as a member list.
    pub fn members(&self) -> Option<Vec<RoomMember>> {
        self.data
            .as_ref()
            .and_then(|d| serde_json::from_value(d.clone()).ok())
    }
}
