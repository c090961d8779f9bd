//! Streaming events for one turn.
//!
//! A turn is the span between [`StreamEvent::StreamStart`] and
//! [`StreamEvent::StreamEnd`]. Everything in between arrives in the order the
//! worker wrote it.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::{ToolResultBlock, ToolUseBlock};
use super::usage::Usage;

/// A tool authorization request raised by the worker.
///
/// The worker blocks until the host writes exactly one reply line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    /// Name of the tool asking for permission (e.g. "Bash").
    pub tool_name: String,
    /// The arguments the tool would run with.
    #[serde(default = "empty_object")]
    pub input: Value,
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

impl PermissionRequest {
    /// Create a request.
    pub fn new(tool_name: impl Into<String>, input: Value) -> Self {
        Self {
            tool_name: tool_name.into(),
            input,
        }
    }
}

/// A streaming event for consumers.
///
/// # Event Order
///
/// 1. `StreamStart` - always first, emitted before any I/O
/// 2. content, tool, usage and permission events in arrival order
/// 3. `StreamEnd` - always last, on success, failure and cancellation
///
/// Delta and snapshot forms of the same content may both appear; a snapshot
/// is the full text so far and never shorter than what the deltas built.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The turn has started.
    StreamStart,
    /// The turn is over; nothing follows.
    StreamEnd,
    /// One API message inside the turn has finished.
    MessageStop,
    /// Incremental response text.
    TextDelta {
        /// The text fragment.
        text: String,
    },
    /// Full response text so far.
    TextSnapshot {
        /// The accumulated text.
        text: String,
    },
    /// Incremental thinking text.
    ThinkingDelta {
        /// The thinking fragment.
        thinking: String,
    },
    /// Full thinking text so far.
    ThinkingSnapshot {
        /// The accumulated thinking.
        thinking: String,
    },
    /// The assistant invoked a tool.
    ToolUse(ToolUseBlock),
    /// A tool finished; correlates to a `ToolUse` by id.
    ToolResult(ToolResultBlock),
    /// Token usage update.
    Usage(Usage),
    /// The worker is waiting for a tool authorization decision.
    PermissionRequest(PermissionRequest),
    /// Something went wrong; the turn may continue.
    Error {
        /// Human-readable description.
        message: String,
    },
}

impl StreamEvent {
    /// Create an error event.
    pub fn error(message: impl ToString) -> Self {
        StreamEvent::Error {
            message: message.to_string(),
        }
    }

    /// Check if this is the final event of a turn.
    pub fn is_stream_end(&self) -> bool {
        matches!(self, StreamEvent::StreamEnd)
    }

    /// Check if this is an error event.
    pub fn is_error(&self) -> bool {
        matches!(self, StreamEvent::Error { .. })
    }

    /// Get text from a TextDelta event.
    pub fn text_delta(&self) -> Option<&str> {
        match self {
            StreamEvent::TextDelta { text } => Some(text),
            _ => None,
        }
    }

    /// Get the permission request if this is one.
    pub fn as_permission_request(&self) -> Option<&PermissionRequest> {
        match self {
            StreamEvent::PermissionRequest(request) => Some(request),
            _ => None,
        }
    }
}
