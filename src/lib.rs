//! Roomchat - terminal client for a multi-room chat server.
//!
//! This crate provides the client core: an HTTP gateway for accounts and
//! rooms, a WebSocket transport session with a bounded reconnect policy, an
//! inbound frame router, and the controller that keeps the user in at most
//! one room at a time.
//!
//! # Architecture
//!
//! - **Controller** - Room lifecycle (join, leave, create, delete)
//! - **Transport** - One chat socket, reconnecting on unexpected closes
//! - **Router** - Frame type to handler dispatch for inbound frames
//! - **Api** - `{code, message, data}` HTTP gateway
//! - **Events** - Listener traits implemented by the presentation layer
//!
//! # Modules
//!
//! - [`api`] - HTTP client and payload types
//! - [`controller`] - Room session state machine
//! - [`transport`] - WebSocket session and reconnect policy
//! - [`config`] - Configuration loading/saving

// Library modules
pub mod api;
pub mod auth;
pub mod commands;
pub mod controller;
pub mod events;
pub mod protocol;
pub mod router;
pub mod transport;
pub mod ws;

pub mod config;
pub mod constants;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export commonly used types
pub use api::{ApiClient, ApiError, RoomApi};
pub use auth::AuthSession;
pub use config::Config;
pub use controller::{RoomController, RoomPhase};
pub use protocol::{EventKind, MessageEnvelope, MessageKind, RoomId};
pub use router::MessageRouter;
pub use transport::{ConnectionState, TransportSession};
