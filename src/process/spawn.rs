//! Worker spawning and lifecycle management.

use std::process::{ExitStatus, Stdio};

use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};

use crate::config::EngineConfig;
use crate::{Error, Result};

/// A running worker process.
///
/// One worker serves exactly one turn.
///
/// # Cancellation
///
/// Dropping a `WorkerProcess` kills the subprocess if it's still running.
pub struct WorkerProcess {
    child: Child,
}

impl WorkerProcess {
    /// Spawn the worker described by the config with piped stdio.
    ///
    /// The worker runs in the project directory.
    pub fn spawn(config: &EngineConfig) -> Result<Self> {
        let mut cmd = build_command(config);
        cmd.stdin(Stdio::piped());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::WorkerNotFound {
                    program: config.worker_program().display().to_string(),
                }
            } else {
                Error::ProcessSpawn(e)
            }
        })?;

        tracing::debug!(
            pid = child.id(),
            program = %config.worker_program().display(),
            cwd = %config.project_dir().display(),
            "spawned worker"
        );

        Ok(Self { child })
    }

    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Take the worker's stdin. Only available once.
    pub fn take_stdin(&mut self) -> Option<ChildStdin> {
        self.child.stdin.take()
    }

    /// Take the worker's stdout. Only available once.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take the worker's stderr. Only available once.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Wait for the process to exit.
    pub async fn wait(&mut self) -> Result<ExitStatus> {
        self.child.wait().await.map_err(Error::io)
    }

    /// Kill the process and reap it.
    pub async fn kill(&mut self) -> Result<()> {
        self.child.kill().await.map_err(Error::io)
    }

    /// Start killing the process without waiting.
    pub fn start_kill(&mut self) -> Result<()> {
        self.child.start_kill().map_err(Error::io)
    }

    /// Check if the process has exited without blocking.
    pub fn try_wait(&mut self) -> Result<Option<ExitStatus>> {
        self.child.try_wait().map_err(Error::io)
    }
}

impl Drop for WorkerProcess {
    fn drop(&mut self) {
        // Fails harmlessly if the child was already reaped.
        let _ = self.child.start_kill();
    }
}

fn build_command(config: &EngineConfig) -> Command {
    let mut cmd = Command::new(config.worker_program());
    cmd.args(&config.worker_args);
    cmd.current_dir(config.project_dir());

    if !config.inherit_env {
        cmd.env_clear();
    }
    cmd.envs(&config.env_vars);
    cmd.kill_on_drop(true);

    cmd
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(program: &str, args: &[&str]) -> (tempfile::TempDir, EngineConfig) {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::builder()
            .worker_program(program)
            .worker_args(args.iter().copied())
            .project_dir(dir.path())
            .claude_home(dir.path())
            .build()
            .unwrap();
        (dir, config)
    }

    #[test]
    fn worker_process_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<WorkerProcess>();
    }

    #[tokio::test]
    async fn missing_program_is_not_found() {
        let (_dir, config) = config("/nonexistent/worker-binary", &[]);
        let result = WorkerProcess::spawn(&config);
        assert!(matches!(result, Err(Error::WorkerNotFound { .. })));
    }

    #[tokio::test]
    async fn runs_in_project_dir() {
        let (dir, config) = config("sh", &["-c", "pwd"]);
        let mut worker = WorkerProcess::spawn(&config).unwrap();
        let stdout = worker.take_stdout().unwrap();
        assert!(worker.take_stdout().is_none());

        let mut reader = super::super::LineReader::new(stdout);
        let line = reader.read_line().await.unwrap().unwrap();
        let expected = dir.path().canonicalize().unwrap();
        assert_eq!(std::path::Path::new(&line).canonicalize().unwrap(), expected);
        assert!(worker.wait().await.unwrap().success());
    }

    #[tokio::test]
    async fn passes_env() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::builder()
            .worker_program("sh")
            .worker_args(["-c", "echo \"$RELAY_TEST\""])
            .project_dir(dir.path())
            .claude_home(dir.path())
            .env("RELAY_TEST", "present")
            .build()
            .unwrap();

        let mut worker = WorkerProcess::spawn(&config).unwrap();
        let mut reader = super::super::LineReader::new(worker.take_stdout().unwrap());
        assert_eq!(reader.read_line().await.unwrap().as_deref(), Some("present"));
    }

    #[tokio::test]
    async fn kill_stops_long_running_worker() {
        let (_dir, config) = config("sh", &["-c", "sleep 30"]);
        let mut worker = WorkerProcess::spawn(&config).unwrap();
        assert!(worker.try_wait().unwrap().is_none());
        worker.kill().await.unwrap();
        assert!(!worker.wait().await.unwrap().success());
    }
}
