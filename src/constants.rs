//! Application-wide constants for roomchat.
//!
//! Centralizes the magic numbers of the client: timeouts, the reconnect
//! policy, page sizes and server paths.
//!
//! # Categories
//!
//! - **Timeouts**: Network timeouts
//! - **Reconnect**: Constant-delay, bounded-attempt retry policy
//! - **Paging**: Default page sizes for room list and history
//! - **Server**: Endpoint paths and defaults

use std::time::Duration;

// ============================================================================
// Timeouts
// ============================================================================

/// HTTP client request timeout for API calls.
///
/// Applies to individual requests to the chat server API.
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Reconnect
// ============================================================================

/// Fixed delay before each reconnect attempt.
///
/// The policy is constant-delay, not exponential: every attempt waits the
/// same amount of time.
pub const RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// Maximum consecutive reconnect attempts before giving up.
///
/// The counter resets on every successful open. Once it reaches this value,
/// the session stops retrying and reports a terminal failure.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 5;

// ============================================================================
// Paging
// ============================================================================

/// First page index used by the server (pages are 1-based).
pub const FIRST_PAGE: u32 = 1;

/// Default room list page size.
pub const ROOM_PAGE_SIZE: u32 = 50;

/// Default chat history page size.
pub const HISTORY_PAGE_SIZE: u32 = 50;

// ============================================================================
// Server
// ============================================================================

/// Default server base URL.
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// WebSocket chat endpoint path.
pub const WS_CHAT_PATH: &str = "/ws/chat";

/// Avatar shown for senders without one.
pub const DEFAULT_AVATAR: &str = "/resource/image/avatar/default.png";

/// Envelope code for a successful response.
pub const CODE_OK: i64 = 0;

/// Envelope code for an authorization failure.
pub const CODE_UNAUTHORIZED: i64 = 401;
