//! Worker process management.
//!
//! Every turn spawns a fresh worker. The worker reads one send command from
//! stdin, streams tagged lines to stdout, and exits when the turn is done.
//! Permission replies travel over the same stdin pipe.
//!
//! # Architecture
//!
//! ```text
//! claude-relay                         worker
//! ┌──────────────┐                   ┌─────────────┐
//! │ WorkerProcess│──stdin (command)─▶│             │
//! │              │──stdin (replies)─▶│             │
//! │              │◀──stdout ([TAG])──│             │
//! │              │◀──stderr (logs)───│             │
//! └──────────────┘                   └─────────────┘
//! ```

mod io;
mod spawn;

pub use io::{drain_stderr, LineReader, LineWriter};
pub use spawn::WorkerProcess;
