//! Conversation history from the external CLI's session logs.
//!
//! The CLI appends one JSON object per line to
//! `~/.claude/projects/<namespace>/<session-id>.jsonl`. This module only
//! reads those files:
//!
//! - [`parse_line`] turns one line into a [`LogRecord`] (or skips it)
//! - [`aggregate`] collapses records into UI [`Message`](crate::Message)s
//! - [`SessionStore`] lists and loads sessions for a project
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use claude_relay::history::SessionStore;
//!
//! let store = SessionStore::new("/home/me/.claude/projects");
//! for info in store.list_sessions(Path::new("/home/me/project")) {
//!     println!("{} ({} messages)", info.title, info.message_count);
//! }
//! ```

mod aggregate;
mod record;
mod store;

pub use aggregate::aggregate;
pub use record::{decode_content, parse_line, LogLine, LogRecord};
pub use store::{project_namespace, SessionInfo, SessionStore};
