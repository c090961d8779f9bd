//! Test utilities for claude-relay integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use claude_relay::history::project_namespace;
use claude_relay::protocol::{encode_event, StreamEvent};
use claude_relay::{EngineConfig, EngineConfigBuilder, StreamingEngine};

/// Builder for fake worker scripts run through `sh -c`.
///
/// Every script starts by reading the send command from stdin, like the
/// real worker does.
pub struct WorkerScript {
    lines: Vec<String>,
}

impl WorkerScript {
    pub fn new() -> Self {
        Self {
            lines: vec!["IFS= read -r cmd".to_string()],
        }
    }

    /// Print a raw stdout line.
    pub fn line(mut self, line: &str) -> Self {
        self.lines.push(format!("printf '%s\\n' {}", quote(line)));
        self
    }

    /// Print an encoded event.
    pub fn event(self, event: StreamEvent) -> Self {
        let line = encode_event(&event).expect("encodable event");
        self.line(&line)
    }

    pub fn text_delta(self, text: &str) -> Self {
        self.event(StreamEvent::TextDelta { text: text.into() })
    }

    pub fn session_id(self, id: &str) -> Self {
        self.line(&format!("[SESSION_ID]{id}"))
    }

    /// Echo the received send command back as a `[CONTENT]` snapshot.
    pub fn echo_command(mut self) -> Self {
        self.lines
            .push("printf '[CONTENT]%s\\n' \"$cmd\"".to_string());
        self
    }

    /// Ask for permission, then echo the reply line as a `[CONTENT]` snapshot.
    pub fn permission_request(self, tool_name: &str, input: serde_json::Value) -> Self {
        let mut script = self.line(&format!(
            "[PERMISSION_REQUEST]{}",
            serde_json::json!({ "toolName": tool_name, "input": input })
        ));
        script.lines.push("IFS= read -r reply".to_string());
        script
            .lines
            .push("printf '[CONTENT]%s\\n' \"$reply\"".to_string());
        script
    }

    /// Append a raw shell command.
    pub fn shell(mut self, command: &str) -> Self {
        self.lines.push(command.to_string());
        self
    }

    /// Write a line to stderr.
    pub fn stderr(mut self, text: &str) -> Self {
        self.lines.push(format!("printf '%s\\n' {} >&2", quote(text)));
        self
    }

    /// Keep running until killed.
    pub fn hang(mut self) -> Self {
        self.lines.push("exec sleep 30".to_string());
        self
    }

    pub fn exit(mut self, code: i32) -> Self {
        self.lines.push(format!("exit {code}"));
        self
    }

    pub fn build(&self) -> String {
        self.lines.join("\n")
    }

    /// A config running this script in a fresh project directory.
    pub fn config(&self, project: &Path) -> EngineConfigBuilder {
        EngineConfig::builder()
            .worker_program("sh")
            .worker_args(["-c".to_string(), self.build()])
            .project_dir(project)
            .claude_home(project.join(".claude"))
    }

    pub fn engine(&self, project: &Path) -> StreamingEngine {
        let config = self.config(project).build().expect("valid config");
        StreamingEngine::new(config, claude_relay::AlwaysReady)
    }
}

fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\'', r"'\''"))
}

/// Wait until `condition` holds, polling for up to five seconds.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..500 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Builder for session log files in the CLI's on-disk layout.
pub struct SessionLog {
    lines: Vec<String>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn raw(mut self, line: impl Into<String>) -> Self {
        self.lines.push(line.into());
        self
    }

    pub fn user(self, text: &str, timestamp: &str) -> Self {
        let line = serde_json::json!({
            "type": "user",
            "timestamp": timestamp,
            "message": { "role": "user", "content": [{ "type": "text", "text": text }] },
        });
        self.raw(line.to_string())
    }

    pub fn assistant(self, text: &str, timestamp: &str) -> Self {
        let line = serde_json::json!({
            "type": "assistant",
            "timestamp": timestamp,
            "message": { "role": "assistant", "content": [{ "type": "text", "text": text }] },
        });
        self.raw(line.to_string())
    }

    pub fn tool_result(self, tool_use_id: &str, content: &str, timestamp: &str) -> Self {
        let line = serde_json::json!({
            "type": "user",
            "timestamp": timestamp,
            "message": {
                "role": "user",
                "content": [{ "type": "tool_result", "tool_use_id": tool_use_id, "content": content }],
            },
        });
        self.raw(line.to_string())
    }

    pub fn summary(self, summary: &str) -> Self {
        let line = serde_json::json!({ "type": "summary", "summary": summary });
        self.raw(line.to_string())
    }

    /// Write to `<projects_root>/<namespace>/<file_name>`.
    pub fn write(&self, projects_root: &Path, project: &Path, file_name: &str) -> PathBuf {
        let dir = projects_root.join(project_namespace(project));
        fs::create_dir_all(&dir).expect("create project log dir");
        let path = dir.join(file_name);
        let mut content = self.lines.join("\n");
        content.push('\n');
        fs::write(&path, content).expect("write session log");
        path
    }
}
