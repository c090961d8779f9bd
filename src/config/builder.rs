//! Engine configuration and builder.
//!
//! Everything the engine needs is resolved once here and passed in
//! explicitly; nothing is looked up from process-wide state at spawn time.
//!
//! # Example
//!
//! ```no_run
//! use claude_relay::config::{EngineConfig, Model, PermissionMode};
//!
//! let config = EngineConfig::builder()
//!     .worker_program("node")
//!     .worker_path("/opt/claude-worker/index.js")
//!     .project_dir("/home/me/project")
//!     .model(Model::Opus)
//!     .permission_mode(PermissionMode::AcceptEdits)
//!     .build()?;
//! # Ok::<(), claude_relay::Error>(())
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::options::{Model, PermissionMode};
use crate::permission::{DenyAll, PermissionHandler};
use crate::tools::ToolObserver;
use crate::{Error, Result};

/// Default worker executable.
pub const DEFAULT_WORKER_PROGRAM: &str = "node";

/// Configuration for the streaming engine and the session log store.
///
/// Use [`EngineConfig::builder()`] to create a new configuration.
#[derive(Clone)]
pub struct EngineConfig {
    // Worker invocation
    pub(crate) worker_program: PathBuf,
    pub(crate) worker_args: Vec<String>,
    pub(crate) worker_path: Option<PathBuf>,
    pub(crate) project_dir: PathBuf,
    pub(crate) env_vars: HashMap<String, String>,
    pub(crate) inherit_env: bool,

    // Per-turn defaults
    pub(crate) model: Option<Model>,
    pub(crate) permission_mode: PermissionMode,
    pub(crate) system_prompt: Option<String>,
    pub(crate) max_tokens: Option<u32>,
    pub(crate) streaming: bool,

    // History
    pub(crate) claude_home: PathBuf,

    // Hooks
    pub(crate) permission_handler: Arc<dyn PermissionHandler>,
    pub(crate) tool_observer: Option<Arc<dyn ToolObserver>>,
}

impl EngineConfig {
    /// Create a new builder for EngineConfig.
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    pub fn worker_program(&self) -> &Path {
        &self.worker_program
    }

    pub fn worker_path(&self) -> Option<&Path> {
        self.worker_path.as_deref()
    }

    /// Project root: the worker's working directory.
    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn model(&self) -> Option<&Model> {
        self.model.as_ref()
    }

    pub fn permission_mode(&self) -> PermissionMode {
        self.permission_mode
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub fn streaming(&self) -> bool {
        self.streaming
    }

    /// Directory holding the external CLI's state (`~/.claude` by default).
    pub fn claude_home(&self) -> &Path {
        &self.claude_home
    }

    /// Root of the per-project session log namespaces.
    pub fn projects_dir(&self) -> PathBuf {
        self.claude_home.join("projects")
    }

    pub fn tool_observer(&self) -> Option<&Arc<dyn ToolObserver>> {
        self.tool_observer.as_ref()
    }

    pub(crate) fn permission_handler(&self) -> &Arc<dyn PermissionHandler> {
        &self.permission_handler
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("worker_program", &self.worker_program)
            .field("worker_args", &self.worker_args)
            .field("worker_path", &self.worker_path)
            .field("project_dir", &self.project_dir)
            .field("env_vars", &self.env_vars.keys().collect::<Vec<_>>())
            .field("inherit_env", &self.inherit_env)
            .field("model", &self.model)
            .field("permission_mode", &self.permission_mode)
            .field("system_prompt", &self.system_prompt.as_ref().map(|_| ".."))
            .field("max_tokens", &self.max_tokens)
            .field("streaming", &self.streaming)
            .field("claude_home", &self.claude_home)
            .field("tool_observer", &self.tool_observer.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`EngineConfig`].
///
/// Validated when [`build()`](EngineConfigBuilder::build) is called. Whether
/// the worker can actually start is a separate question answered by the
/// engine's [`ReadinessCheck`](super::ReadinessCheck) before each spawn.
#[derive(Clone, Default)]
pub struct EngineConfigBuilder {
    worker_program: Option<PathBuf>,
    worker_args: Vec<String>,
    worker_path: Option<PathBuf>,
    project_dir: Option<PathBuf>,
    env_vars: HashMap<String, String>,
    inherit_env: Option<bool>,

    model: Option<Model>,
    permission_mode: PermissionMode,
    system_prompt: Option<String>,
    max_tokens: Option<u32>,
    streaming: Option<bool>,

    claude_home: Option<PathBuf>,

    permission_handler: Option<Arc<dyn PermissionHandler>>,
    tool_observer: Option<Arc<dyn ToolObserver>>,
}

impl EngineConfigBuilder {
    // -------------------------------------------------------------------------
    // Worker invocation
    // -------------------------------------------------------------------------

    /// Executable to launch (default: `node`).
    pub fn worker_program(mut self, program: impl Into<PathBuf>) -> Self {
        self.worker_program = Some(program.into());
        self
    }

    /// Arguments passed to the executable (e.g. the worker script).
    pub fn worker_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.worker_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Resolved worker entry point, forwarded in every send command.
    pub fn worker_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.worker_path = Some(path.into());
        self
    }

    /// Project root (default: the current directory).
    pub fn project_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_dir = Some(path.into());
        self
    }

    /// Set an environment variable for the worker.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Whether the worker inherits the parent environment (default: true).
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = Some(inherit);
        self
    }

    // -------------------------------------------------------------------------
    // Per-turn defaults
    // -------------------------------------------------------------------------

    pub fn model(mut self, model: impl Into<Model>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn permission_mode(mut self, mode: PermissionMode) -> Self {
        self.permission_mode = mode;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Ask the worker for incremental deltas (default: true).
    pub fn streaming(mut self, streaming: bool) -> Self {
        self.streaming = Some(streaming);
        self
    }

    // -------------------------------------------------------------------------
    // History
    // -------------------------------------------------------------------------

    /// Override the CLI state directory (default: `~/.claude`).
    pub fn claude_home(mut self, path: impl Into<PathBuf>) -> Self {
        self.claude_home = Some(path.into());
        self
    }

    // -------------------------------------------------------------------------
    // Hooks
    // -------------------------------------------------------------------------

    /// Handler used when a turn does not bring its own (default: deny all).
    pub fn permission_handler(mut self, handler: Arc<dyn PermissionHandler>) -> Self {
        self.permission_handler = Some(handler);
        self
    }

    pub fn tool_observer(mut self, observer: Arc<dyn ToolObserver>) -> Self {
        self.tool_observer = Some(observer);
        self
    }

    // -------------------------------------------------------------------------
    // Build
    // -------------------------------------------------------------------------

    /// Build the configuration.
    ///
    /// This validates:
    /// - The worker program is not empty
    /// - The project directory exists
    /// - `max_tokens` is positive if set
    pub fn build(self) -> Result<EngineConfig> {
        let worker_program = self
            .worker_program
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKER_PROGRAM));
        if worker_program.as_os_str().is_empty() {
            return Err(Error::InvalidConfig("worker program must not be empty".into()));
        }

        let project_dir = match self.project_dir {
            Some(dir) => dir,
            None => std::env::current_dir().map_err(|e| {
                Error::InvalidConfig(format!("cannot determine project directory: {e}"))
            })?,
        };
        if !project_dir.is_dir() {
            return Err(Error::InvalidConfig(format!(
                "project directory does not exist: {}",
                project_dir.display()
            )));
        }

        if self.max_tokens == Some(0) {
            return Err(Error::InvalidConfig("max_tokens must be positive".into()));
        }

        let claude_home = match self.claude_home {
            Some(home) => home,
            None => default_claude_home()?,
        };

        Ok(EngineConfig {
            worker_program,
            worker_args: self.worker_args,
            worker_path: self.worker_path,
            project_dir,
            env_vars: self.env_vars,
            inherit_env: self.inherit_env.unwrap_or(true),
            model: self.model,
            permission_mode: self.permission_mode,
            system_prompt: self.system_prompt,
            max_tokens: self.max_tokens,
            streaming: self.streaming.unwrap_or(true),
            claude_home,
            permission_handler: self
                .permission_handler
                .unwrap_or_else(|| Arc::new(DenyAll::default())),
            tool_observer: self.tool_observer,
        })
    }
}

/// `~/.claude`, where the external CLI keeps its state.
pub fn default_claude_home() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(".claude"))
        .ok_or_else(|| Error::InvalidConfig("cannot determine home directory".into()))
}
