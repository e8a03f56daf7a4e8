//! HTTP gateway to the chat server.
//!
//! Every response is wrapped in an [`Envelope`](types::Envelope). The client
//! unwraps it, turns authorization failures into a cleared session plus an
//! [`AuthListener::on_unauthorized`](crate::events::AuthListener::on_unauthorized)
//! callback, and exposes room operations through the [`RoomApi`] trait so the
//! room controller can be driven by a fake in tests.

mod client;
mod error;
pub mod types;

pub use client::{ApiClient, RoomApi};
pub use error::ApiError;
