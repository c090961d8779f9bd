//! Lines written to the worker's stdin.
//!
//! The first line of a turn is a [`SendCommand`]. Every later line is a
//! [`PermissionReply`] answering the oldest unanswered permission request.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{PermissionMode, SessionId};
use crate::Result;

/// The command that starts a turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCommand {
    /// Always `"send"`.
    pub command: String,
    /// Flattened text of the last user message.
    pub message: String,
    /// Project root the worker runs in.
    pub cwd: String,
    pub permission_mode: PermissionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub streaming: bool,
    /// Resolved path of the worker entry point.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worker_path: Option<String>,
    /// Session to continue; absent on the first turn of a conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<SessionId>,
}

impl SendCommand {
    pub const SEND: &'static str = "send";

    /// Create a send command with defaults for everything optional.
    pub fn new(message: impl Into<String>, cwd: impl Into<String>) -> Self {
        Self {
            command: Self::SEND.to_string(),
            message: message.into(),
            cwd: cwd.into(),
            permission_mode: PermissionMode::Default,
            model: None,
            system_prompt: None,
            max_tokens: None,
            streaming: true,
            worker_path: None,
            session_id: None,
        }
    }

    /// Serialize as one stdin line (without the trailing newline).
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// The answer to a permission request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionReply {
    pub allow: bool,
    /// Reason shown to the model when denied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Replacement tool arguments when approved with edits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_input: Option<Value>,
}

impl PermissionReply {
    /// Serialize as one stdin line (without the trailing newline).
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_command_shape() {
        let line = SendCommand::new("fix bug", "/work/app").to_line().unwrap();
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(
            value,
            json!({
                "command": "send",
                "message": "fix bug",
                "cwd": "/work/app",
                "permissionMode": "default",
                "streaming": true
            })
        );
    }

    #[test]
    fn full_command_shape() {
        let mut command = SendCommand::new("multi\nline", "/p");
        command.permission_mode = PermissionMode::AcceptEdits;
        command.model = Some("opus".into());
        command.system_prompt = Some("be brief".into());
        command.max_tokens = Some(4096);
        command.streaming = false;
        command.worker_path = Some("/opt/worker/index.js".into());
        command.session_id = Some(SessionId::new("s-1"));

        let line = command.to_line().unwrap();
        assert!(!line.contains('\n'));
        let value: Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["permissionMode"], "acceptEdits");
        assert_eq!(value["systemPrompt"], "be brief");
        assert_eq!(value["maxTokens"], 4096);
        assert_eq!(value["workerPath"], "/opt/worker/index.js");
        assert_eq!(value["sessionId"], "s-1");
        assert_eq!(value["message"], "multi\nline");

        let parsed: SendCommand = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed, command);
    }

    #[test]
    fn reply_shapes() {
        let allow = PermissionReply {
            allow: true,
            message: None,
            updated_input: None,
        };
        assert_eq!(allow.to_line().unwrap(), r#"{"allow":true}"#);

        let deny = PermissionReply {
            allow: false,
            message: Some("not now".into()),
            updated_input: None,
        };
        assert_eq!(deny.to_line().unwrap(), r#"{"allow":false,"message":"not now"}"#);

        let edited = PermissionReply {
            allow: true,
            message: None,
            updated_input: Some(json!({"command": "ls -a"})),
        };
        assert_eq!(
            edited.to_line().unwrap(),
            r#"{"allow":true,"updatedInput":{"command":"ls -a"}}"#
        );
    }
}
