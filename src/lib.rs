//! # claude-relay
//!
//! Backend plumbing for an IDE-embedded Claude chat client.
//!
//! This library provides:
//! - Streaming turns against a worker process speaking a `[TAG]payload`
//!   line protocol
//! - Tool permission round trips over the same stdin pipe
//! - Conversation history reconstructed from the CLI's session logs
//! - Tool observation callbacks
//!
//! ## Quick Start
//!
//! ```no_run
//! use claude_relay::{AlwaysReady, EngineConfig, Message, StreamingEngine, TurnRequest};
//!
//! #[tokio::main]
//! async fn main() -> claude_relay::Result<()> {
//!     let config = EngineConfig::builder()
//!         .worker_args(["/opt/claude-worker/index.js"])
//!         .build()?;
//!     let engine = StreamingEngine::new(config, AlwaysReady);
//!
//!     let turn = engine.send_message(TurnRequest::new(vec![Message::user("What is 2+2?")]));
//!     println!("{}", turn.collect_turn().await.text());
//!     Ok(())
//! }
//! ```
//!
//! ## Streaming
//!
//! ```no_run
//! use futures::StreamExt;
//! use claude_relay::{Message, StreamEvent, StreamingEngine, TurnRequest};
//!
//! # async fn demo(engine: StreamingEngine) {
//! let mut turn = engine.send_message(TurnRequest::new(vec![Message::user("Write a poem")]));
//! while let Some(event) = turn.next().await {
//!     if let StreamEvent::TextDelta { text } = event {
//!         print!("{}", text);
//!     }
//! }
//! # }
//! ```
//!
//! ## Permissions
//!
//! ```no_run
//! use std::sync::Arc;
//! use claude_relay::{permission, Message, StreamingEngine, TurnRequest};
//!
//! # async fn demo(engine: StreamingEngine) {
//! let (handler, mut requests) = permission::channel();
//! let turn = engine.send_message(
//!     TurnRequest::new(vec![Message::user("clean up the build dir")])
//!         .permission_handler(Arc::new(handler)),
//! );
//! tokio::spawn(async move {
//!     while let Some(pending) = requests.recv().await {
//!         pending.allow();
//!     }
//! });
//! let _ = turn.collect_turn().await;
//! # }
//! ```
//!
//! ## History
//!
//! ```no_run
//! use std::path::Path;
//! use claude_relay::{EngineConfig, SessionStore};
//!
//! let config = EngineConfig::builder().build()?;
//! let store = SessionStore::from_config(&config);
//! let sessions = store.list_sessions(config.project_dir());
//! if let Some(latest) = sessions.first() {
//!     let messages = store.load_session(config.project_dir(), latest.session_id.as_str());
//!     println!("{}: {} messages", latest.title, messages.len());
//! }
//! # Ok::<(), claude_relay::Error>(())
//! ```

pub mod config;
pub mod context;
mod engine;
mod error;
pub mod history;
pub mod permission;
pub mod process;
pub mod protocol;
pub mod stream;
pub mod tools;

pub use error::{Error, Result};

// Re-export the engine types at crate root
pub use engine::{StreamingEngine, TurnRequest};

// Re-export commonly used config types at crate root
pub use config::{
    AlwaysReady, EngineConfig, EngineConfigBuilder, Model, PermissionMode, ReadinessCheck,
    SessionId, WorkerPathExists,
};

// Re-export commonly used protocol types at crate root
pub use protocol::{ContentBlock, Message, MessageBuilder, Role, StreamEvent, Usage};

// Re-export commonly used permission and history types at crate root
pub use history::{SessionInfo, SessionStore};
pub use permission::{PermissionDecision, PermissionHandler, PermissionRequest};

// Re-export commonly used stream types at crate root
pub use stream::{CollectedTurn, TurnStream};
