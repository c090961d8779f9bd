//! Message model and wire protocol for worker communication.
//!
//! # Message Model
//!
//! - [`Message`]: a finalized conversation turn as the UI shows it
//! - [`ContentBlock`]: text, thinking, tool use, tool result or image
//! - [`StreamEvent`]: one streaming event inside a turn
//!
//! # Wire Protocol
//!
//! The worker writes `[TAG]payload` lines to stdout ([`codec`]). The host
//! writes JSON lines to stdin: a [`SendCommand`] first, then one
//! [`PermissionReply`] per permission request.
//!
//! # Example
//!
//! ```
//! use claude_relay::protocol::{decode_line, Decoded, StreamEvent};
//!
//! let decoded = decode_line(r#"[CONTENT_DELTA]"Hello\nworld""#).unwrap();
//! assert_eq!(
//!     decoded,
//!     Decoded::Event(StreamEvent::TextDelta { text: "Hello\nworld".into() })
//! );
//! ```

pub mod codec;
mod command;
mod content;
mod events;
mod message;
mod usage;

pub use codec::{decode_line, encode_event, encode_session_id, Decoded};
pub use command::{PermissionReply, SendCommand};
pub use content::{
    ContentBlock, ImageBlock, ImageSource, TextBlock, ThinkingBlock, ToolResultBlock,
    ToolResultContent, ToolResultContentBlock, ToolUseBlock,
};
pub use events::{PermissionRequest, StreamEvent};
pub use message::{Message, MessageBuilder, Role};
pub use usage::Usage;

pub(crate) use message::is_tool_result_only;
