//! Conversation messages.

use serde::{Deserialize, Serialize};

use super::content::ContentBlock;
use super::events::StreamEvent;
use crate::context;

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human (and tool results carried on the user side of the API).
    User,
    /// The model.
    Assistant,
}

impl Role {
    /// The role name as it appears in session logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A finalized conversation message.
///
/// Messages are immutable; build streaming ones with [`MessageBuilder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    role: Role,
    content: Vec<ContentBlock>,
    /// Epoch milliseconds.
    timestamp: i64,
}

impl Message {
    /// Create a message from its parts.
    pub fn new(role: Role, content: Vec<ContentBlock>, timestamp: i64) -> Self {
        Self {
            role,
            content,
            timestamp,
        }
    }

    /// Create a single-text user message stamped with the current time.
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![ContentBlock::text_block(text)], now_millis())
    }

    /// Create a single-text assistant message stamped with the current time.
    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(
            Role::Assistant,
            vec![ContentBlock::text_block(text)],
            now_millis(),
        )
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &[ContentBlock] {
        &self.content
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Take the content blocks.
    pub fn into_content(self) -> Vec<ContentBlock> {
        self.content
    }

    /// All text content concatenated.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| block.text())
            .collect::<Vec<_>>()
            .join("")
    }

    /// Check if every block is a tool result (and there is at least one).
    ///
    /// Such user-side messages are API plumbing, not something a person typed.
    pub fn is_tool_result_only(&self) -> bool {
        is_tool_result_only(&self.content)
    }

    /// The text sent to the worker for this message.
    ///
    /// Text blocks are joined with newlines; image blocks that point at files
    /// are appended as an attached-screenshots list.
    pub fn flattened_text(&self) -> String {
        let text = self
            .content
            .iter()
            .filter_map(|block| block.text())
            .collect::<Vec<_>>()
            .join("\n");
        let screenshots: Vec<&str> = self
            .content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Image(image) => image.source.path(),
                _ => None,
            })
            .collect();
        context::append_screenshots(&text, &screenshots)
    }
}

pub(crate) fn is_tool_result_only(blocks: &[ContentBlock]) -> bool {
    !blocks.is_empty() && blocks.iter().all(ContentBlock::is_tool_result)
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Which streaming block is still receiving text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OpenBlock {
    Text(usize),
    Thinking(usize),
}

/// Assembles a message from streaming events.
///
/// Deltas append to the open block of their kind, snapshots replace it (but
/// never with something shorter), and tool events or `MessageStop` close it.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    role: Role,
    timestamp: i64,
    blocks: Vec<ContentBlock>,
    open: Option<OpenBlock>,
}

impl MessageBuilder {
    /// Start an assistant message stamped with the current time.
    pub fn assistant() -> Self {
        Self::new(Role::Assistant, now_millis())
    }

    pub fn new(role: Role, timestamp: i64) -> Self {
        Self {
            role,
            timestamp,
            blocks: Vec::new(),
            open: None,
        }
    }

    /// Check if nothing has been added yet.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Apply one streaming event. Events that carry no content are ignored.
    pub fn apply(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::TextDelta { text } => self.append_text(text, false),
            StreamEvent::TextSnapshot { text } => self.append_text(text, true),
            StreamEvent::ThinkingDelta { thinking } => self.append_thinking(thinking, false),
            StreamEvent::ThinkingSnapshot { thinking } => self.append_thinking(thinking, true),
            StreamEvent::ToolUse(tool_use) => {
                self.open = None;
                self.blocks.push(ContentBlock::ToolUse(tool_use.clone()));
            }
            StreamEvent::ToolResult(result) => {
                self.open = None;
                self.blocks.push(ContentBlock::ToolResult(result.clone()));
            }
            StreamEvent::MessageStop => self.open = None,
            StreamEvent::StreamStart
            | StreamEvent::StreamEnd
            | StreamEvent::Usage(_)
            | StreamEvent::PermissionRequest(_)
            | StreamEvent::Error { .. } => {}
        }
    }

    fn append_text(&mut self, text: &str, snapshot: bool) {
        if let Some(OpenBlock::Text(index)) = self.open {
            if let Some(ContentBlock::Text(block)) = self.blocks.get_mut(index) {
                merge(&mut block.text, text, snapshot);
                return;
            }
        }
        if text.is_empty() {
            return;
        }
        self.blocks.push(ContentBlock::text_block(text));
        self.open = Some(OpenBlock::Text(self.blocks.len() - 1));
    }

    fn append_thinking(&mut self, thinking: &str, snapshot: bool) {
        if let Some(OpenBlock::Thinking(index)) = self.open {
            if let Some(ContentBlock::Thinking(block)) = self.blocks.get_mut(index) {
                merge(&mut block.thinking, thinking, snapshot);
                return;
            }
        }
        if thinking.is_empty() {
            return;
        }
        self.blocks.push(ContentBlock::thinking_block(thinking));
        self.open = Some(OpenBlock::Thinking(self.blocks.len() - 1));
    }

    /// Freeze the message.
    pub fn finish(self) -> Message {
        Message::new(self.role, self.blocks, self.timestamp)
    }
}

fn merge(current: &mut String, incoming: &str, snapshot: bool) {
    if !snapshot {
        current.push_str(incoming);
    } else if incoming.len() >= current.len() {
        current.clear();
        current.push_str(incoming);
    } else {
        tracing::trace!(
            current = current.len(),
            snapshot = incoming.len(),
            "ignoring shorter snapshot"
        );
    }
}
