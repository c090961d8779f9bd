//! Tool observation for monitoring tool activity.
//!
//! The worker runs tools; a [`ToolObserver`] registered on the engine config
//! sees every tool use, tool result and permission decision of every turn.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use claude_relay::config::EngineConfig;
//! use claude_relay::protocol::ToolUseBlock;
//! use claude_relay::tools::ToolObserver;
//!
//! struct MyObserver;
//!
//! impl ToolObserver for MyObserver {
//!     fn on_tool_use(&self, tool_use: &ToolUseBlock) {
//!         println!("Tool called: {} with {}", tool_use.name, tool_use.input);
//!     }
//! }
//!
//! let config = EngineConfig::builder()
//!     .tool_observer(Arc::new(MyObserver))
//!     .build()?;
//! # Ok::<(), claude_relay::Error>(())
//! ```

mod observer;

pub use observer::{LogLevel, LoggingObserver, ToolObserver};
