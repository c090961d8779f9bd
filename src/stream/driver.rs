//! The per-turn read loop.
//!
//! A [`TurnDriver`] is the only consumer of the worker's stdout and the only
//! writer to its stdin. It writes the send command, then decodes stdout line
//! by line and forwards events in arrival order. Permission requests are
//! answered inline: the next stdout line is not read until the reply has been
//! written, so at most one request is ever outstanding.

use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::SessionId;
use crate::permission::{PermissionHandler, PermissionRequest};
use crate::process::{LineReader, LineWriter};
use crate::protocol::{decode_line, Decoded, SendCommand, StreamEvent};
use crate::tools::ToolObserver;
use crate::Result;

/// How a driven turn stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TurnExit {
    /// The worker closed stdout.
    Eof,
    /// The token fired or the consumer went away.
    Cancelled,
}

enum Flow {
    Continue,
    Stop,
}

pub(crate) struct TurnDriver {
    events: mpsc::Sender<StreamEvent>,
    cancel: CancellationToken,
    permission_handler: Arc<dyn PermissionHandler>,
    observer: Option<Arc<dyn ToolObserver>>,
    session_id: Option<SessionId>,
}

impl TurnDriver {
    pub(crate) fn new(
        events: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
        permission_handler: Arc<dyn PermissionHandler>,
        observer: Option<Arc<dyn ToolObserver>>,
    ) -> Self {
        Self {
            events,
            cancel,
            permission_handler,
            observer,
            session_id: None,
        }
    }

    /// The last session id the worker announced, if any.
    pub(crate) fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    /// Write the command and pump stdout until EOF or cancellation.
    ///
    /// Malformed payloads become in-band `Error` events; only I/O failures
    /// end the turn with `Err`.
    pub(crate) async fn run<R, W>(
        &mut self,
        command: &SendCommand,
        reader: &mut LineReader<R>,
        writer: &mut LineWriter<W>,
    ) -> Result<TurnExit>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let line = command.to_line()?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(TurnExit::Cancelled),
            written = writer.write_line(&line) => written?,
        }
        tracing::trace!(session_id = ?command.session_id, "wrote send command");

        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(TurnExit::Cancelled),
                next = reader.read_line() => next?,
            };
            let Some(line) = next else {
                return Ok(TurnExit::Eof);
            };
            if let Flow::Stop = self.handle_line(&line, writer).await? {
                return Ok(TurnExit::Cancelled);
            }
        }
    }

    async fn handle_line<W>(&mut self, line: &str, writer: &mut LineWriter<W>) -> Result<Flow>
    where
        W: AsyncWrite + Unpin,
    {
        tracing::trace!(line, "worker stdout");

        let event = match decode_line(line) {
            Ok(Decoded::Event(event)) => event,
            Ok(Decoded::SessionId(id)) => {
                tracing::debug!(session_id = %id, "worker announced session");
                self.session_id = Some(id);
                return Ok(Flow::Continue);
            }
            Ok(Decoded::Unknown { tag }) => {
                tracing::debug!(tag = %tag, "ignoring unknown tag");
                return Ok(Flow::Continue);
            }
            Ok(Decoded::NotProtocol) => {
                if !line.trim().is_empty() {
                    tracing::debug!(line, "ignoring non-protocol line");
                }
                return Ok(Flow::Continue);
            }
            Err(e) => {
                tracing::debug!(error = %e, "failed to decode worker line");
                StreamEvent::error(e)
            }
        };

        match event {
            // The span is owned by the engine.
            StreamEvent::StreamStart | StreamEvent::StreamEnd => {
                tracing::trace!("swallowing worker stream marker");
                Ok(Flow::Continue)
            }
            StreamEvent::PermissionRequest(request) => {
                if !self
                    .emit(StreamEvent::PermissionRequest(request.clone()))
                    .await
                {
                    return Ok(Flow::Stop);
                }
                self.answer_permission(request, writer).await
            }
            event => {
                self.observe(&event);
                if self.emit(event).await {
                    Ok(Flow::Continue)
                } else {
                    Ok(Flow::Stop)
                }
            }
        }
    }

    async fn answer_permission<W>(
        &mut self,
        request: PermissionRequest,
        writer: &mut LineWriter<W>,
    ) -> Result<Flow>
    where
        W: AsyncWrite + Unpin,
    {
        let pending = self.permission_handler.decide(request.clone());
        let decision = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(Flow::Stop),
            decision = pending => decision,
        };

        let reply = decision.to_reply().to_line()?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(Flow::Stop),
            written = writer.write_line(&reply) => written?,
        }
        tracing::debug!(
            tool_name = %request.tool_name,
            allowed = decision.is_allowed(),
            "answered permission request"
        );

        if let Some(observer) = &self.observer {
            observer.on_permission_decision(&request, &decision);
        }
        Ok(Flow::Continue)
    }

    fn observe(&self, event: &StreamEvent) {
        let Some(observer) = &self.observer else {
            return;
        };
        match event {
            StreamEvent::ToolUse(tool_use) => observer.on_tool_use(tool_use),
            StreamEvent::ToolResult(result) => observer.on_tool_result(result),
            _ => {}
        }
    }

    /// Forward an event; false when the turn should stop.
    async fn emit(&self, event: StreamEvent) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.events.send(event) => sent.is_ok(),
        }
    }
}
