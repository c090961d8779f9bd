//! Readiness checks queried before every spawn.
//!
//! The engine never spawns a worker while its readiness check reports false;
//! the turn ends with a single setup error instead.

use std::path::PathBuf;

/// Predicate telling the engine whether the worker can be started.
pub trait ReadinessCheck: Send + Sync {
    fn is_ready(&self) -> bool;
}

impl<F> ReadinessCheck for F
where
    F: Fn() -> bool + Send + Sync,
{
    fn is_ready(&self) -> bool {
        self()
    }
}

/// Always ready. Useful when setup is validated elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReady;

impl ReadinessCheck for AlwaysReady {
    fn is_ready(&self) -> bool {
        true
    }
}

/// Ready when the worker entry point exists as a file.
#[derive(Debug, Clone)]
pub struct WorkerPathExists {
    path: PathBuf,
}

impl WorkerPathExists {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReadinessCheck for WorkerPathExists {
    fn is_ready(&self) -> bool {
        let ready = self.path.is_file();
        if !ready {
            tracing::debug!(path = %self.path.display(), "worker entry point missing");
        }
        ready
    }
}
