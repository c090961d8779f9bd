//! Tool authorization round trips.
//!
//! When the worker needs permission to run a tool it writes a
//! `[PERMISSION_REQUEST]` line and blocks reading stdin. The turn driver
//! surfaces the request as a [`StreamEvent::PermissionRequest`], asks the
//! turn's [`PermissionHandler`], and writes exactly one reply line before it
//! reads anything else from the worker. Replies carry no correlation id, so
//! there is never more than one unanswered request.
//!
//! # Example
//!
//! ```no_run
//! use claude_relay::permission::{self, PermissionDecision};
//!
//! # async fn ui() {
//! let (handler, mut requests) = permission::channel();
//! // pass `handler` in a TurnRequest, then answer from the UI:
//! while let Some(pending) = requests.recv().await {
//!     if pending.request().tool_name == "Read" {
//!         pending.allow();
//!     } else {
//!         pending.deny("not in this project");
//!     }
//! }
//! # }
//! ```
//!
//! [`StreamEvent::PermissionRequest`]: crate::StreamEvent::PermissionRequest

use futures::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

pub use crate::protocol::PermissionRequest;
use crate::protocol::PermissionReply;

/// Reason used when a pending request is dropped unanswered.
pub const DISMISSED_MESSAGE: &str = "permission request dismissed";

/// The host's answer to a permission request.
#[derive(Debug, Clone, PartialEq)]
pub enum PermissionDecision {
    /// Run the tool as requested.
    Allow,
    /// Run the tool with replacement arguments.
    AllowWithInput(Value),
    /// Do not run the tool; the message is shown to the model.
    Deny { message: String },
}

impl PermissionDecision {
    pub fn deny(message: impl Into<String>) -> Self {
        PermissionDecision::Deny {
            message: message.into(),
        }
    }

    pub fn is_allowed(&self) -> bool {
        !matches!(self, PermissionDecision::Deny { .. })
    }

    /// The stdin line payload for this decision.
    pub fn to_reply(&self) -> PermissionReply {
        match self {
            PermissionDecision::Allow => PermissionReply {
                allow: true,
                message: None,
                updated_input: None,
            },
            PermissionDecision::AllowWithInput(input) => PermissionReply {
                allow: true,
                message: None,
                updated_input: Some(input.clone()),
            },
            PermissionDecision::Deny { message } => PermissionReply {
                allow: false,
                message: Some(message.clone()),
                updated_input: None,
            },
        }
    }
}

/// Decides permission requests for a turn.
///
/// The driver awaits the returned future with no timeout; only cancelling
/// the turn interrupts it.
pub trait PermissionHandler: Send + Sync {
    fn decide(&self, request: PermissionRequest) -> BoxFuture<'static, PermissionDecision>;
}

impl<F> PermissionHandler for F
where
    F: Fn(&PermissionRequest) -> PermissionDecision + Send + Sync,
{
    fn decide(&self, request: PermissionRequest) -> BoxFuture<'static, PermissionDecision> {
        future::ready(self(&request)).boxed()
    }
}

/// Approves every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl PermissionHandler for AllowAll {
    fn decide(&self, _request: PermissionRequest) -> BoxFuture<'static, PermissionDecision> {
        future::ready(PermissionDecision::Allow).boxed()
    }
}

/// Denies every request with a fixed reason.
#[derive(Debug, Clone)]
pub struct DenyAll {
    message: String,
}

impl DenyAll {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Default for DenyAll {
    fn default() -> Self {
        Self::new("tool use was not approved")
    }
}

impl PermissionHandler for DenyAll {
    fn decide(&self, _request: PermissionRequest) -> BoxFuture<'static, PermissionDecision> {
        future::ready(PermissionDecision::deny(self.message.clone())).boxed()
    }
}

/// Create a handler that forwards requests to a UI queue.
pub fn channel() -> (ChannelPermissionHandler, mpsc::UnboundedReceiver<PendingPermission>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelPermissionHandler { tx }, rx)
}

/// Forwards each request as a [`PendingPermission`] and waits for the answer.
#[derive(Debug, Clone)]
pub struct ChannelPermissionHandler {
    tx: mpsc::UnboundedSender<PendingPermission>,
}

impl PermissionHandler for ChannelPermissionHandler {
    fn decide(&self, request: PermissionRequest) -> BoxFuture<'static, PermissionDecision> {
        let (responder, answer) = oneshot::channel();
        let pending = PendingPermission {
            request,
            responder: Some(responder),
        };
        if let Err(unsent) = self.tx.send(pending) {
            tracing::debug!(tool_name = %unsent.0.request.tool_name, "no permission listener");
        }
        async move {
            answer
                .await
                .unwrap_or_else(|_| PermissionDecision::deny(DISMISSED_MESSAGE))
        }
        .boxed()
    }
}

/// A request waiting for the user.
///
/// Dropping it unanswered denies the request.
#[derive(Debug)]
pub struct PendingPermission {
    request: PermissionRequest,
    responder: Option<oneshot::Sender<PermissionDecision>>,
}

impl PendingPermission {
    pub fn request(&self) -> &PermissionRequest {
        &self.request
    }

    pub fn respond(mut self, decision: PermissionDecision) {
        if let Some(responder) = self.responder.take() {
            // The turn may have been cancelled in the meantime.
            let _ = responder.send(decision);
        }
    }

    pub fn allow(self) {
        self.respond(PermissionDecision::Allow);
    }

    pub fn allow_with_input(self, input: Value) {
        self.respond(PermissionDecision::AllowWithInput(input));
    }

    pub fn deny(self, message: impl Into<String>) {
        self.respond(PermissionDecision::deny(message));
    }
}

impl Drop for PendingPermission {
    fn drop(&mut self) {
        if let Some(responder) = self.responder.take() {
            let _ = responder.send(PermissionDecision::deny(DISMISSED_MESSAGE));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> PermissionRequest {
        PermissionRequest::new("Bash", json!({"command": "ls"}))
    }

    #[test]
    fn decision_replies() {
        assert_eq!(
            PermissionDecision::Allow.to_reply().to_line().unwrap(),
            r#"{"allow":true}"#
        );
        assert_eq!(
            PermissionDecision::deny("no").to_reply().to_line().unwrap(),
            r#"{"allow":false,"message":"no"}"#
        );
        assert_eq!(
            PermissionDecision::AllowWithInput(json!({"command": "ls -la"}))
                .to_reply()
                .to_line()
                .unwrap(),
            r#"{"allow":true,"updatedInput":{"command":"ls -la"}}"#
        );
        assert!(PermissionDecision::AllowWithInput(json!({})).is_allowed());
        assert!(!PermissionDecision::deny("x").is_allowed());
    }

    #[tokio::test]
    async fn fixed_handlers() {
        assert_eq!(AllowAll.decide(request()).await, PermissionDecision::Allow);
        assert_eq!(
            DenyAll::new("read-only session").decide(request()).await,
            PermissionDecision::deny("read-only session")
        );
    }

    #[tokio::test]
    async fn closure_handler() {
        let handler = |request: &PermissionRequest| {
            if request.tool_name == "Bash" {
                PermissionDecision::deny("no shell")
            } else {
                PermissionDecision::Allow
            }
        };
        assert_eq!(
            handler.decide(request()).await,
            PermissionDecision::deny("no shell")
        );
        assert_eq!(
            handler
                .decide(PermissionRequest::new("Read", json!({})))
                .await,
            PermissionDecision::Allow
        );
    }

    #[tokio::test]
    async fn channel_handler_round_trip() {
        let (handler, mut requests) = channel();
        let decision = tokio::spawn(handler.decide(request()));

        let pending = requests.recv().await.unwrap();
        assert_eq!(pending.request().tool_name, "Bash");
        pending.allow_with_input(json!({"command": "ls -a"}));

        assert_eq!(
            decision.await.unwrap(),
            PermissionDecision::AllowWithInput(json!({"command": "ls -a"}))
        );
    }

    #[tokio::test]
    async fn dropped_pending_denies() {
        let (handler, mut requests) = channel();
        let decision = tokio::spawn(handler.decide(request()));
        drop(requests.recv().await.unwrap());
        assert_eq!(
            decision.await.unwrap(),
            PermissionDecision::deny(DISMISSED_MESSAGE)
        );
    }

    #[tokio::test]
    async fn closed_channel_denies() {
        let (handler, requests) = channel();
        drop(requests);
        assert_eq!(
            handler.decide(request()).await,
            PermissionDecision::deny(DISMISSED_MESSAGE)
        );
    }
}
