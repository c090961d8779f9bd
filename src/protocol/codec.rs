//! Tagged line codec for worker stdout.
//!
//! Every protocol line has the form `[TAG]payload`:
//!
//! | Tag                                   | Payload                        |
//! |---------------------------------------|--------------------------------|
//! | `STREAM_START`, `STREAM_END`, `MESSAGE_END` | none                     |
//! | `CONTENT_DELTA`, `THINKING_DELTA`     | JSON string                    |
//! | `CONTENT`, `THINKING`, `SESSION_ID`, `ERROR` | raw text                |
//! | `TOOL_USE`, `TOOL_RESULT`, `USAGE`, `PERMISSION_REQUEST` | JSON object |
//!
//! Lines that do not look like `[TAG]...` are not protocol lines at all and
//! decode to [`Decoded::NotProtocol`]. Unknown tags decode to
//! [`Decoded::Unknown`]. A known tag with a bad payload is an
//! [`Error::ProtocolDecode`].

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::content::{ToolResultBlock, ToolResultContent, ToolUseBlock};
use super::events::{PermissionRequest, StreamEvent};
use super::usage::Usage;
use crate::config::SessionId;
use crate::{Error, Result};

static TAG_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\[([A-Z_]+)\](.*)$").expect("valid regex"));

/// Wire tags understood by the codec.
pub mod tags {
    pub const STREAM_START: &str = "STREAM_START";
    pub const STREAM_END: &str = "STREAM_END";
    pub const MESSAGE_END: &str = "MESSAGE_END";
    pub const CONTENT_DELTA: &str = "CONTENT_DELTA";
    pub const THINKING_DELTA: &str = "THINKING_DELTA";
    pub const CONTENT: &str = "CONTENT";
    pub const THINKING: &str = "THINKING";
    pub const SESSION_ID: &str = "SESSION_ID";
    pub const ERROR: &str = "ERROR";
    pub const TOOL_USE: &str = "TOOL_USE";
    pub const TOOL_RESULT: &str = "TOOL_RESULT";
    pub const USAGE: &str = "USAGE";
    pub const PERMISSION_REQUEST: &str = "PERMISSION_REQUEST";
}

/// The result of decoding one stdout line.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded {
    /// A streaming event.
    Event(StreamEvent),
    /// The worker's session id for this conversation.
    SessionId(SessionId),
    /// A well-formed tag the codec does not know.
    Unknown { tag: String },
    /// Not a `[TAG]payload` line.
    NotProtocol,
}

/// `TOOL_RESULT` payload shape.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolResultPayload {
    #[serde(alias = "toolUseId")]
    id: String,
    #[serde(default)]
    content: ToolResultContent,
    #[serde(default)]
    is_error: bool,
}

/// Decode one line of worker stdout.
pub fn decode_line(line: &str) -> Result<Decoded> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);

    let Some(captures) = TAG_LINE.captures(line) else {
        return Ok(Decoded::NotProtocol);
    };
    let tag = captures.get(1).map_or("", |m| m.as_str());
    let payload = captures.get(2).map_or("", |m| m.as_str());

    let event = match tag {
        tags::STREAM_START => control(tag, payload, StreamEvent::StreamStart),
        tags::STREAM_END => control(tag, payload, StreamEvent::StreamEnd),
        tags::MESSAGE_END => control(tag, payload, StreamEvent::MessageStop),
        tags::CONTENT_DELTA => StreamEvent::TextDelta {
            text: json_string(tag, payload)?,
        },
        tags::THINKING_DELTA => StreamEvent::ThinkingDelta {
            thinking: json_string(tag, payload)?,
        },
        tags::CONTENT => StreamEvent::TextSnapshot {
            text: payload.to_string(),
        },
        tags::THINKING => StreamEvent::ThinkingSnapshot {
            thinking: payload.to_string(),
        },
        tags::ERROR => StreamEvent::Error {
            message: payload.to_string(),
        },
        tags::SESSION_ID => {
            let id = payload.trim();
            if id.is_empty() {
                return Err(Error::protocol(tag, "empty session id"));
            }
            return Ok(Decoded::SessionId(SessionId::new(id)));
        }
        tags::TOOL_USE => StreamEvent::ToolUse(json_object::<ToolUseBlock>(tag, payload)?),
        tags::TOOL_RESULT => {
            let result: ToolResultPayload = json_object(tag, payload)?;
            StreamEvent::ToolResult(ToolResultBlock {
                tool_use_id: result.id,
                content: result.content,
                is_error: result.is_error,
            })
        }
        tags::USAGE => StreamEvent::Usage(json_object::<Usage>(tag, payload)?),
        tags::PERMISSION_REQUEST => {
            StreamEvent::PermissionRequest(json_object::<PermissionRequest>(tag, payload)?)
        }
        _ => {
            return Ok(Decoded::Unknown {
                tag: tag.to_string(),
            })
        }
    };

    Ok(Decoded::Event(event))
}

fn control(tag: &str, payload: &str, event: StreamEvent) -> StreamEvent {
    if !payload.is_empty() {
        tracing::debug!(tag, "ignoring payload on control tag");
    }
    event
}

fn json_string(tag: &str, payload: &str) -> Result<String> {
    serde_json::from_str::<String>(payload).map_err(|e| Error::protocol(tag, e))
}

fn json_object<T: serde::de::DeserializeOwned>(tag: &str, payload: &str) -> Result<T> {
    let value: Value = serde_json::from_str(payload).map_err(|e| Error::protocol(tag, e))?;
    if !value.is_object() {
        return Err(Error::protocol(tag, "expected a JSON object"));
    }
    serde_json::from_value(value).map_err(|e| Error::protocol(tag, e))
}

/// Encode an event as a protocol line (without the trailing newline).
///
/// Zero-length deltas are encoded as-is; suppressing them is the producer's job.
pub fn encode_event(event: &StreamEvent) -> Result<String> {
    let line = match event {
        StreamEvent::StreamStart => format!("[{}]", tags::STREAM_START),
        StreamEvent::StreamEnd => format!("[{}]", tags::STREAM_END),
        StreamEvent::MessageStop => format!("[{}]", tags::MESSAGE_END),
        StreamEvent::TextDelta { text } => {
            format!("[{}]{}", tags::CONTENT_DELTA, serde_json::to_string(text)?)
        }
        StreamEvent::ThinkingDelta { thinking } => {
            format!("[{}]{}", tags::THINKING_DELTA, serde_json::to_string(thinking)?)
        }
        StreamEvent::TextSnapshot { text } => format!("[{}]{}", tags::CONTENT, text),
        StreamEvent::ThinkingSnapshot { thinking } => format!("[{}]{}", tags::THINKING, thinking),
        StreamEvent::Error { message } => format!("[{}]{}", tags::ERROR, message),
        StreamEvent::ToolUse(tool_use) => {
            format!("[{}]{}", tags::TOOL_USE, serde_json::to_string(tool_use)?)
        }
        StreamEvent::ToolResult(result) => {
            let payload = ToolResultPayload {
                id: result.tool_use_id.clone(),
                content: result.content.clone(),
                is_error: result.is_error,
            };
            format!("[{}]{}", tags::TOOL_RESULT, serde_json::to_string(&payload)?)
        }
        StreamEvent::Usage(usage) => format!("[{}]{}", tags::USAGE, serde_json::to_string(usage)?),
        StreamEvent::PermissionRequest(request) => format!(
            "[{}]{}",
            tags::PERMISSION_REQUEST,
            serde_json::to_string(request)?
        ),
    };
    Ok(line)
}

/// Encode a session id line.
pub fn encode_session_id(id: &SessionId) -> String {
    format!("[{}]{}", tags::SESSION_ID, id)
}
