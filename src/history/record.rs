//! Per-line parsing of session logs.
//!
//! Each line of a session log is one JSON object written by the external
//! CLI. Only `user` and `assistant` lines carry conversation content; a
//! `summary` line names the session. Everything else is skipped.

use serde_json::{Map, Value};

use crate::protocol::{ContentBlock, Role};

/// One conversational log line.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub role: Role,
    pub blocks: Vec<ContentBlock>,
    /// Epoch milliseconds; 0 when the line has no usable timestamp.
    pub timestamp: i64,
    pub slug: Option<String>,
}

/// What a single log line contributed.
#[derive(Debug, Clone, PartialEq)]
pub enum LogLine {
    Record(LogRecord),
    Summary(String),
    Skip,
}

/// Parse one log line. Never fails; unusable lines are [`LogLine::Skip`].
pub fn parse_line(line: &str) -> LogLine {
    let line = line.trim();
    if line.is_empty() {
        return LogLine::Skip;
    }
    let object = match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(object)) => object,
        Ok(_) => {
            tracing::trace!("skipping non-object log line");
            return LogLine::Skip;
        }
        Err(e) => {
            tracing::debug!(error = %e, "skipping unparseable log line");
            return LogLine::Skip;
        }
    };

    let role = match object.get("type").and_then(Value::as_str) {
        Some("user") => Role::User,
        Some("assistant") => Role::Assistant,
        Some("summary") => {
            return match object.get("summary").and_then(Value::as_str) {
                Some(summary) if !summary.trim().is_empty() => {
                    LogLine::Summary(summary.trim().to_string())
                }
                _ => LogLine::Skip,
            };
        }
        _ => return LogLine::Skip,
    };

    if object.get("isSidechain").and_then(Value::as_bool) == Some(true) {
        return LogLine::Skip;
    }

    let blocks = object
        .get("message")
        .and_then(|message| message.get("content"))
        .map(decode_content)
        .unwrap_or_default();

    LogLine::Record(LogRecord {
        role,
        blocks,
        timestamp: timestamp_of(&object),
        slug: object
            .get("slug")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Decode `message.content`: an array of typed blocks or a bare string.
pub fn decode_content(content: &Value) -> Vec<ContentBlock> {
    match content {
        Value::String(text) => vec![ContentBlock::text_block(text.clone())],
        Value::Array(items) => items.iter().filter_map(decode_block).collect(),
        _ => Vec::new(),
    }
}

fn decode_block(item: &Value) -> Option<ContentBlock> {
    match serde_json::from_value::<ContentBlock>(item.clone()) {
        Ok(block) => Some(block),
        Err(e) => {
            let block_type = item.get("type").and_then(Value::as_str).unwrap_or("?");
            tracing::debug!(
                block_type,
                error = %e,
                "dropping log content block"
            );
            None
        }
    }
}

fn timestamp_of(object: &Map<String, Value>) -> i64 {
    object
        .get("timestamp")
        .and_then(Value::as_str)
        .and_then(|raw| chrono::DateTime::parse_from_rfc3339(raw).ok())
        .map_or(0, |time| time.timestamp_millis())
}
