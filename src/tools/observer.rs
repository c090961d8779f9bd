//! Tool observer trait and implementations.

use crate::permission::PermissionDecision;
use crate::protocol::{PermissionRequest, ToolResultBlock, ToolUseBlock};

/// Observer for tool activity during a turn.
///
/// The worker executes tools itself; observers only watch. They are called
/// synchronously from the turn driver, in event order, so implementations
/// must be lightweight.
///
/// All methods have empty defaults for selective observation.
pub trait ToolObserver: Send + Sync {
    /// Called for every `ToolUse` event.
    fn on_tool_use(&self, tool_use: &ToolUseBlock) {
        let _ = tool_use;
    }

    /// Called for every `ToolResult` event.
    fn on_tool_result(&self, result: &ToolResultBlock) {
        let _ = result;
    }

    /// Called after a permission decision has been written to the worker.
    fn on_permission_decision(&self, request: &PermissionRequest, decision: &PermissionDecision) {
        let _ = (request, decision);
    }
}

/// Logs tool activity with tracing.
#[derive(Debug, Clone, Default)]
pub struct LoggingObserver {
    level: LogLevel,
}

/// Log level for LoggingObserver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    #[default]
    Debug,
    Info,
}

impl LoggingObserver {
    /// Create a new logging observer with debug level.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(level: LogLevel) -> Self {
        Self { level }
    }
}

macro_rules! log_at {
    ($level:expr, $($arg:tt)+) => {
        match $level {
            LogLevel::Trace => tracing::trace!($($arg)+),
            LogLevel::Debug => tracing::debug!($($arg)+),
            LogLevel::Info => tracing::info!($($arg)+),
        }
    };
}

const MAX_LOGGED_CONTENT: usize = 200;

fn truncate_for_log(content: &str) -> String {
    if content.len() <= MAX_LOGGED_CONTENT {
        return content.to_string();
    }
    let mut end = MAX_LOGGED_CONTENT;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... ({} bytes total)", &content[..end], content.len())
}

impl ToolObserver for LoggingObserver {
    fn on_tool_use(&self, tool_use: &ToolUseBlock) {
        log_at!(
            self.level,
            tool_id = %tool_use.id,
            tool_name = %tool_use.name,
            input = %tool_use.input,
            "tool_use"
        );
    }

    fn on_tool_result(&self, result: &ToolResultBlock) {
        let content = truncate_for_log(&result.content.as_text());
        log_at!(
            self.level,
            tool_use_id = %result.tool_use_id,
            is_error = result.is_error,
            content = %content,
            "tool_result"
        );
    }

    fn on_permission_decision(&self, request: &PermissionRequest, decision: &PermissionDecision) {
        log_at!(
            self.level,
            tool_name = %request.tool_name,
            allowed = decision.is_allowed(),
            "permission_decision"
        );
    }
}
