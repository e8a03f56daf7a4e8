//! Inbound frame dispatch.
//!
//! Maps a frame's raw `type` to the handler registered for it. The table is
//! filled before the transport session starts and then frozen inside it, so
//! handlers are looked up without locking.
//!
//! Frames with no handler are dropped without error: the server may add
//! types this client does not know yet. Frames that are not valid JSON are
//! logged and dropped.

use std::collections::HashMap;
use std::sync::Arc;

use crate::protocol::{FrameType, MessageEnvelope};

/// Callback invoked with each routed frame.
pub type FrameHandler = Arc<dyn Fn(&MessageEnvelope) + Send + Sync>;

/// What happened to a dispatched frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran.
    Handled(FrameType),
    /// No handler registered; the frame was dropped.
    Unhandled(FrameType),
    /// The frame could not be parsed.
    Malformed,
}

/// Frame type → handler table.
#[derive(Default)]
pub struct MessageRouter {
    handlers: HashMap<FrameType, FrameHandler>,
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.handlers.keys().map(|t| t.0).collect();
        types.sort_unstable();
        f.debug_struct("MessageRouter")
            .field("types", &types)
            .finish()
    }
}

impl MessageRouter {
    /// Empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `frame_type`.
    ///
    /// Replaces any earlier handler for the same type and returns it.
    pub fn register<F>(&mut self, frame_type: impl Into<FrameType>, handler: F) -> Option<FrameHandler>
    where
        F: Fn(&MessageEnvelope) + Send + Sync + 'static,
    {
        let frame_type = frame_type.into();
        let previous = self.handlers.insert(frame_type, Arc::new(handler));
        if previous.is_some() {
            log::debug!("[Router] Replaced handler for frame type {}", frame_type);
        }
        previous
    }

    /// Whether a handler exists for `frame_type`.
    pub fn has_handler(&self, frame_type: impl Into<FrameType>) -> bool {
        self.handlers.contains_key(&frame_type.into())
    }

    /// Parse `raw` and run the matching handler.
    pub fn dispatch(&self, raw: &str) -> DispatchOutcome {
        let envelope: MessageEnvelope = match serde_json::from_str(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                log::warn!(
                    "[Router] Failed to parse frame: {} ({})",
                    e,
                    raw.chars().take(100).collect::<String>()
                );
                return DispatchOutcome::Malformed;
            }
        };
        self.dispatch_envelope(&envelope)
    }

    /// Run the handler for an already-parsed frame.
    pub fn dispatch_envelope(&self, envelope: &MessageEnvelope) -> DispatchOutcome {
        match self.handlers.get(&envelope.frame_type) {
            Some(handler) => {
                handler(envelope);
                DispatchOutcome::Handled(envelope.frame_type)
            }
            None => {
                log::trace!("[Router] No handler for frame type {}", envelope.frame_type);
                DispatchOutcome::Unhandled(envelope.frame_type)
            }
        }
    }
}
