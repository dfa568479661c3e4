//! Shared frame model for the Easel realtime transport.
//!
//! ARCHITECTURE
//! ============
//! Every message on the websocket is a Frame. Clients send request frames,
//! the server dispatches by event name, and responses flow back as item/done/
//! error frames correlated via `parent_id`. This crate owns the wire
//! representation so `easel` (the server) and `cli` agree on it.
//!
//! DESIGN
//! ======
//! - Flat data: the payload is always a `Map<String, Value>`, never nested.
//! - Transport is JSON text; [`encode_frame`]/[`decode_frame`] are the only
//!   codec both sides use.
//! - Envelope and payload keys are camelCase on the wire (`parentId`,
//!   `projectId`), matching the persisted document shape.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[cfg(test)]
#[path = "lib_test.rs"]
mod tests;

// =============================================================================
// EVENT NAMES
// =============================================================================

/// Event names used on the realtime wire. Kept in one place so the server
/// dispatch table and the client cannot drift apart.
pub mod event {
    /// Server → client on upgrade; carries `clientId`.
    pub const SESSION_CONNECTED: &str = "session-connected";
    /// Client request to enter a project: `{projectId, userId, userName}`.
    pub const JOIN_PROJECT: &str = "join-project";
    /// Broadcast to peers when a client joins: `{userId, userName, color}`.
    pub const USER_JOINED: &str = "user-joined";
    /// Broadcast to peers when a client leaves.
    pub const USER_LEFT: &str = "user-left";
    /// Client → server cursor position: `{x, y}`.
    pub const CURSOR_MOVE: &str = "cursor-move";
    /// Server → peers cursor relay: `{userId, userName, color, x, y}`.
    pub const CURSOR_UPDATE: &str = "cursor-update";
    /// Client → server document section replace:
    /// `{type: "elements"|"canvasStack", data}`.
    pub const CANVAS_UPDATE: &str = "canvas-update";
    /// Server → peers relay of an applied [`CANVAS_UPDATE`], same shape.
    pub const CANVAS_UPDATED: &str = "canvas-updated";
}

// =============================================================================
// FIELD CONSTANTS
// =============================================================================

/// Frame data key for error messages.
pub const FRAME_MESSAGE: &str = "message";

/// Frame data key for grepable error codes.
pub const FRAME_CODE: &str = "code";

/// Frame data key for the retryable flag on error frames.
pub const FRAME_RETRYABLE: &str = "retryable";

// =============================================================================
// TYPES
// =============================================================================

/// Flat key-value payload. Alias to reduce noise in signatures.
pub type Data = HashMap<String, serde_json::Value>;

/// Lifecycle position of a frame in a request/response stream.
///
/// Every exchange is `request → item* → done` or `request → error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Request,
    Item,
    Done,
    Error,
    Cancel,
}

impl Status {
    /// Terminal statuses end a response stream.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Done | Status::Error | Status::Cancel)
    }
}

/// The universal message type.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Frame {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    /// Milliseconds since Unix epoch. Set automatically at construction.
    pub ts: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<Uuid>,
    pub from: Option<String>,
    pub event: String,
    pub status: Status,
    pub data: Data,
}

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error frames.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// CODEC
// =============================================================================

/// Error returned by [`decode_frame`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The text could not be decoded as a JSON frame.
    #[error("failed to decode frame: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Encode a frame as JSON text. Falls back to an empty object on the
/// (unreachable in practice) serialization failure.
#[must_use]
pub fn encode_frame(frame: &Frame) -> String {
    serde_json::to_string(frame).unwrap_or_else(|_| "{}".to_owned())
}

/// Decode JSON text into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Decode`] for malformed or mistyped JSON.
pub fn decode_frame(text: &str) -> Result<Frame, CodecError> {
    Ok(serde_json::from_str(text)?)
}

// =============================================================================
// CONSTRUCTORS
// =============================================================================

/// Current time as milliseconds since Unix epoch.
fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

impl Frame {
    /// Create a request frame. Entry point for every event.
    pub fn request(event: impl Into<String>, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: None,
            ts: now_ms(),
            project_id: None,
            from: None,
            event: event.into(),
            status: Status::Request,
            data,
        }
    }

    /// Create an item response carrying one result.
    #[must_use]
    pub fn item(&self, data: Data) -> Self {
        self.reply(Status::Item, data)
    }

    /// Create a done response. Terminal, carries no data.
    #[must_use]
    pub fn done(&self) -> Self {
        self.reply(Status::Done, Data::new())
    }

    /// Create a done response carrying data. Terminal.
    #[must_use]
    pub fn done_with(&self, data: Data) -> Self {
        self.reply(Status::Done, data)
    }

    /// Create an error response from a plain string. Terminal.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(message.into()));
        self.reply(Status::Error, data)
    }

    /// Create a structured error response from a typed error. Terminal.
    #[must_use]
    pub fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Self {
        let mut data = Data::new();
        data.insert(FRAME_CODE.into(), serde_json::Value::String(err.error_code().to_string()));
        data.insert(FRAME_MESSAGE.into(), serde_json::Value::String(err.to_string()));
        data.insert(FRAME_RETRYABLE.into(), serde_json::Value::Bool(err.retryable()));
        self.reply(Status::Error, data)
    }

    /// Build a reply frame. Inherits `parent_id`, `project_id`, and `event`.
    fn reply(&self, status: Status, data: Data) -> Self {
        Self {
            id: Uuid::new_v4(),
            parent_id: Some(self.id),
            ts: now_ms(),
            project_id: self.project_id,
            from: None,
            event: self.event.clone(),
            status,
            data,
        }
    }
}

// =============================================================================
// BUILDERS
// =============================================================================

impl Frame {
    #[must_use]
    pub fn with_project_id(mut self, project_id: Uuid) -> Self {
        self.project_id = Some(project_id);
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}
