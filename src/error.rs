/// Errors that can occur when using claude-relay.
///
/// Errors are organized by category:
/// - Setup errors: the worker is unavailable or misconfigured
/// - Spawn errors: failed to start the worker process
/// - IO errors: communication failures with the worker
/// - Protocol errors: malformed worker output
/// - Runtime errors: failures during a turn
/// - History errors: invalid session lookups
///
/// Inside a turn none of these escape the event stream; the engine turns
/// them into [`StreamEvent::Error`](crate::StreamEvent::Error).
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    // -------------------------------------------------------------------------
    // Setup errors
    // -------------------------------------------------------------------------
    /// The readiness check failed; no process was spawned.
    #[error("worker is not ready: finish setup before sending messages")]
    SetupNotReady,

    /// Invalid configuration provided to builder.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // -------------------------------------------------------------------------
    // Spawn errors
    // -------------------------------------------------------------------------
    /// Worker executable not found.
    #[error("worker executable not found: {program}")]
    WorkerNotFound { program: String },

    /// Failed to spawn the worker process.
    #[error("failed to spawn worker process: {0}")]
    ProcessSpawn(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // IO errors
    // -------------------------------------------------------------------------
    /// IO error communicating with the worker.
    #[error("IO error: {0}")]
    Io(#[source] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol errors
    // -------------------------------------------------------------------------
    /// Failed to parse or produce JSON.
    #[error("failed to parse JSON: {message}")]
    JsonParse {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// A known protocol tag carried a malformed payload.
    #[error("malformed [{tag}] payload: {message}")]
    ProtocolDecode { tag: String, message: String },

    // -------------------------------------------------------------------------
    // Runtime errors
    // -------------------------------------------------------------------------
    /// The worker exited with a nonzero status.
    #[error("worker exited with status {code:?}")]
    UnexpectedExit { code: Option<i32> },

    /// `send_message` was called while another turn was still running.
    #[error("a turn is already in flight for this conversation")]
    TurnInFlight,

    /// The prior messages held no user-authored message to send.
    #[error("no user message to send")]
    NoUserMessage,

    /// The turn was cancelled by the caller.
    #[error("turn cancelled")]
    Cancelled,

    // -------------------------------------------------------------------------
    // History errors
    // -------------------------------------------------------------------------
    /// A session id that cannot name a log file.
    #[error("invalid session id: {0:?}")]
    InvalidSessionId(String),
}

/// A specialized Result type for claude-relay operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a JSON parse error with context.
    pub fn json_parse(source: serde_json::Error, raw: &str) -> Self {
        Self::JsonParse {
            message: format!(
                "at column {}: {}",
                source.column(),
                raw.chars().take(100).collect::<String>()
            ),
            source,
        }
    }

    /// Create a protocol decode error for a tag.
    pub fn protocol(tag: impl Into<String>, message: impl ToString) -> Self {
        Self::ProtocolDecode {
            tag: tag.into(),
            message: message.to_string(),
        }
    }

    /// Create an IO error.
    pub fn io(source: std::io::Error) -> Self {
        Self::Io(source)
    }

    /// Check if this error means the worker cannot be used until setup changes.
    pub fn is_setup_error(&self) -> bool {
        matches!(
            self,
            Error::SetupNotReady | Error::InvalidConfig(_) | Error::WorkerNotFound { .. }
        )
    }

    /// Check if the turn can continue after this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::ProtocolDecode { .. } | Error::UnexpectedExit { .. })
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::JsonParse {
            message: err.to_string(),
            source: err,
        }
    }
}
