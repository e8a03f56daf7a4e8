//! CLI subcommand implementations for roomchat.
//!
//! Commands are organized into submodules by domain:
//!
//! - [`account`] - Login, logout and profile
//! - [`rooms`] - Room listing and deletion
//! - [`chat`] - Interactive chat loop (join, create)
//! - [`settings`] - Configuration get/set
//!
//! # Usage
//!
//! Commands are invoked from the main CLI dispatcher:
//!
//! ```ignore
//! use roomchat::commands;
//!
//! commands::account::whoami().await?;
//! commands::rooms::list().await?;
//! ```

pub mod account;
pub mod attachment;
pub mod chat;
pub mod display;
pub mod rooms;
pub mod session;
pub mod settings;

#[doc(inline)]
pub use session::Session;
