//! The streaming session engine.
//!
//! This module provides [`StreamingEngine`], the entry point for running
//! turns against the worker.
//!
//! # Example
//!
//! ```no_run
//! use claude_relay::{AlwaysReady, EngineConfig, Message, StreamingEngine, TurnRequest};
//!
//! # async fn demo() -> claude_relay::Result<()> {
//! let config = EngineConfig::builder()
//!     .worker_args(["/opt/claude-worker/index.js"])
//!     .build()?;
//! let engine = StreamingEngine::new(config, AlwaysReady);
//!
//! let turn = engine.send_message(TurnRequest::new(vec![Message::user("What is 2+2?")]));
//! let collected = turn.collect_turn().await;
//! println!("{}", collected.text());
//!
//! // The worker's session id is remembered, so this continues the conversation.
//! let turn = engine.send_message(TurnRequest::new(vec![Message::user("And times 3?")]));
//! # drop(turn);
//! # Ok(())
//! # }
//! ```

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::{EngineConfig, Model, PermissionMode, ReadinessCheck, SessionId};
use crate::permission::PermissionHandler;
use crate::process::{drain_stderr, LineReader, LineWriter, WorkerProcess};
use crate::protocol::{Message, Role, SendCommand, StreamEvent};
use crate::stream::driver::{TurnDriver, TurnExit};
use crate::stream::TurnStream;
use crate::{Error, Result};

/// Events buffered between the turn task and the consumer.
const EVENT_BUFFER: usize = 64;

/// Runs turns of one conversation against freshly spawned workers.
///
/// At most one turn is in flight at a time; a `send_message` while another
/// turn runs yields an `Error` inside its own `StreamStart`/`StreamEnd` span
/// and leaves the running turn alone.
///
/// # Thread Safety
///
/// `StreamingEngine` is `Send + Sync` and cheap to clone. Clones share the
/// conversation: the same session id and the same in-flight slot.
#[derive(Clone)]
pub struct StreamingEngine {
    inner: Arc<Inner>,
}

struct Inner {
    config: EngineConfig,
    readiness: Arc<dyn ReadinessCheck>,
    state: Mutex<EngineState>,
    next_turn: AtomicU64,
}

#[derive(Default)]
struct EngineState {
    session_id: Option<SessionId>,
    active: Option<ActiveTurn>,
}

struct ActiveTurn {
    id: u64,
    cancel: CancellationToken,
}

/// Everything decided before the turn task starts.
struct PreparedTurn {
    id: u64,
    command: SendCommand,
    permission_handler: Arc<dyn PermissionHandler>,
}

impl StreamingEngine {
    /// Create an engine. `readiness` is asked before every spawn.
    pub fn new(config: EngineConfig, readiness: impl ReadinessCheck + 'static) -> Self {
        Self::with_readiness(config, Arc::new(readiness))
    }

    pub fn with_readiness(config: EngineConfig, readiness: Arc<dyn ReadinessCheck>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                readiness,
                state: Mutex::new(EngineState::default()),
                next_turn: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Start a turn and return its events.
    ///
    /// The returned stream always begins with `StreamStart` and ends with
    /// `StreamEnd`; every failure appears as an `Error` event in between.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn send_message(&self, request: TurnRequest) -> TurnStream {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let cancel = CancellationToken::new();

        let prepared = self.inner.prepare(&request, &cancel);
        let inner = Arc::clone(&self.inner);
        let task_cancel = cancel.clone();
        tokio::spawn(async move { inner.run_turn(prepared, tx, task_cancel).await });

        TurnStream::new(rx, cancel)
    }

    /// Cancel the in-flight turn, if any. Idempotent.
    ///
    /// The turn's stream still ends with `StreamEnd`.
    pub fn abort(&self) {
        if let Some(active) = self.inner.state().active.take() {
            tracing::debug!(turn = active.id, "aborting turn");
            active.cancel.cancel();
        }
    }

    pub fn is_busy(&self) -> bool {
        self.inner.state().active.is_some()
    }

    /// The session id the next turn will continue.
    pub fn session_id(&self) -> Option<SessionId> {
        self.inner.state().session_id.clone()
    }

    /// Continue an existing session, e.g. one loaded from history.
    pub fn set_session_id(&self, session_id: impl Into<SessionId>) {
        self.inner.state().session_id = Some(session_id.into());
    }

    /// Forget the session so the next turn starts a new conversation.
    pub fn clear_session(&self) {
        self.inner.state().session_id = None;
    }
}

impl std::fmt::Debug for StreamingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state();
        f.debug_struct("StreamingEngine")
            .field("config", &self.inner.config)
            .field("session_id", &state.session_id)
            .field("busy", &state.active.is_some())
            .finish()
    }
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn prepare(&self, request: &TurnRequest, cancel: &CancellationToken) -> Result<PreparedTurn> {
        if !self.readiness.is_ready() {
            tracing::debug!("readiness check failed; not spawning worker");
            return Err(Error::SetupNotReady);
        }

        let mut state = self.state();
        if state.active.is_some() {
            return Err(Error::TurnInFlight);
        }
        let command = build_command(&self.config, request, state.session_id.clone())?;

        let id = self.next_turn.fetch_add(1, Ordering::Relaxed);
        state.active = Some(ActiveTurn {
            id,
            cancel: cancel.clone(),
        });

        Ok(PreparedTurn {
            id,
            command,
            permission_handler: request
                .permission_handler
                .clone()
                .unwrap_or_else(|| Arc::clone(self.config.permission_handler())),
        })
    }

    async fn run_turn(
        self: Arc<Self>,
        prepared: Result<PreparedTurn>,
        tx: mpsc::Sender<StreamEvent>,
        cancel: CancellationToken,
    ) {
        let _ = tx.send(StreamEvent::StreamStart).await;

        let result = match prepared {
            Ok(turn) => {
                let id = turn.id;
                let result = self.drive(turn, &tx, &cancel).await;
                self.release(id);
                result
            }
            Err(e) => Err(e),
        };

        match result {
            Ok(()) | Err(Error::Cancelled) => {}
            Err(e) => {
                tracing::debug!(error = %e, "turn failed");
                let _ = tx.send(StreamEvent::error(e)).await;
            }
        }
        let _ = tx.send(StreamEvent::StreamEnd).await;
    }

    async fn drive(
        &self,
        turn: PreparedTurn,
        tx: &mpsc::Sender<StreamEvent>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let mut worker = WorkerProcess::spawn(&self.config)?;
        let (Some(stdin), Some(stdout)) = (worker.take_stdin(), worker.take_stdout()) else {
            return Err(Error::io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "worker pipes unavailable",
            )));
        };
        if let Some(stderr) = worker.take_stderr() {
            drain_stderr(stderr);
        }

        let mut reader = LineReader::new(stdout);
        let mut writer = LineWriter::new(stdin);
        let mut driver = TurnDriver::new(
            tx.clone(),
            cancel.clone(),
            turn.permission_handler,
            self.config.tool_observer().cloned(),
        );

        let outcome = driver.run(&turn.command, &mut reader, &mut writer).await;
        drop(writer);

        if let Some(session_id) = driver.session_id() {
            self.state().session_id = Some(session_id.clone());
        }

        match outcome {
            Ok(TurnExit::Eof) => {
                let status = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    status = worker.wait() => Some(status?),
                };
                match status {
                    Some(status) if status.success() => {
                        tracing::debug!(turn = turn.id, "worker exited cleanly");
                    }
                    Some(status) => {
                        let exit = Error::UnexpectedExit {
                            code: status.code(),
                        };
                        tracing::warn!(turn = turn.id, "{}", exit);
                    }
                    None => stop_worker(&mut worker).await,
                }
                Ok(())
            }
            Ok(TurnExit::Cancelled) => {
                tracing::debug!(turn = turn.id, "turn cancelled");
                stop_worker(&mut worker).await;
                Ok(())
            }
            Err(e) => {
                stop_worker(&mut worker).await;
                Err(e)
            }
        }
    }

    /// Free the in-flight slot unless `abort` already did.
    fn release(&self, id: u64) {
        let mut state = self.state();
        if state.active.as_ref().is_some_and(|active| active.id == id) {
            state.active = None;
        }
    }
}

async fn stop_worker(worker: &mut WorkerProcess) {
    if let Err(e) = worker.kill().await {
        tracing::debug!(pid = ?worker.id(), error = %e, "failed to kill worker");
    }
}

/// The last user-authored message, skipping tool-result plumbing.
fn last_user_message(messages: &[Message]) -> Option<&Message> {
    messages
        .iter()
        .rev()
        .find(|message| message.role() == Role::User && !message.is_tool_result_only())
}

fn build_command(
    config: &EngineConfig,
    request: &TurnRequest,
    session_id: Option<SessionId>,
) -> Result<SendCommand> {
    let message = last_user_message(&request.messages).ok_or(Error::NoUserMessage)?;

    let mut command = SendCommand::new(
        message.flattened_text(),
        config.project_dir().display().to_string(),
    );
    command.permission_mode = request
        .permission_mode
        .unwrap_or_else(|| config.permission_mode());
    command.model = request
        .model
        .as_ref()
        .or(config.model())
        .map(|model| model.as_str().to_string());
    command.system_prompt = request
        .system_prompt
        .clone()
        .or_else(|| config.system_prompt.clone());
    command.max_tokens = request.max_tokens.or(config.max_tokens());
    command.streaming = request.streaming.unwrap_or(config.streaming());
    command.worker_path = config
        .worker_path()
        .map(|path| path.display().to_string());
    command.session_id = session_id;

    Ok(command)
}

/// One `send_message` call: the conversation so far plus per-turn overrides.
///
/// Unset overrides fall back to the engine's [`EngineConfig`].
#[derive(Clone, Default)]
pub struct TurnRequest {
    messages: Vec<Message>,
    model: Option<Model>,
    max_tokens: Option<u32>,
    system_prompt: Option<String>,
    permission_mode: Option<PermissionMode>,
    streaming: Option<bool>,
    permission_handler: Option<Arc<dyn PermissionHandler>>,
}

impl TurnRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn model(mut self, model: impl Into<Model>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn permission_mode(mut self, mode: PermissionMode) -> Self {
        self.permission_mode = Some(mode);
        self
    }

    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = Some(streaming);
        self
    }

    /// Answer this turn's permission requests with `handler`.
    pub fn permission_handler(mut self, handler: Arc<dyn PermissionHandler>) -> Self {
        self.permission_handler = Some(handler);
        self
    }
}

impl std::fmt::Debug for TurnRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnRequest")
            .field("messages", &self.messages.len())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("permission_mode", &self.permission_mode)
            .field("streaming", &self.streaming)
            .field("permission_handler", &self.permission_handler.is_some())
            .finish_non_exhaustive()
    }
}
