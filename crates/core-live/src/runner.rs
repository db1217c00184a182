//! Process runner: persist the snippet, run the interpreter, capture output.
//!
//! `InterpreterRunner` writes every snippet to the same transient file (the
//! configured scratch path), runs `<interpreter> <scratch path>` with the
//! ambient environment plus `PYTHONIOENCODING=utf-8`, waits for both output
//! streams and the exit status, then deletes the file. The file is deleted
//! even when the run future is dropped mid-flight.
//!
//! Known limitation: the scratch path is shared by every run in the process.
//! Two runs that overlap (possible under `SupersedePolicy::Finish`) may
//! overwrite each other's snippet between write and interpreter start.
//!
//! The runner never interprets output. Every failure (write, launch, non-zero
//! exit, timeout) is folded into `ExecutionResult::failure` as text for the
//! reconciler; nothing is returned as an `Err` past this boundary.

use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::{Output, Stdio};
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info};

/// Captured outcome of one run. Produced exactly once per `ExecutionRequest`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// Runtime-level failure text (write, launch, non-zero exit, timeout).
    pub failure: Option<String>,
}

impl ExecutionResult {
    pub fn success(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            failure: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("File write error: {0}")]
    Write(#[source] io::Error),
    #[error("failed to launch interpreter `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to wait for interpreter: {0}")]
    Wait(#[source] io::Error),
    /// Non-zero exit; `message` is the captured stderr or a status line when stderr is empty.
    #[error("{message}")]
    Exit { code: Option<i32>, message: String },
    #[error("execution timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

impl RunError {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunError::Write(_) => "write",
            RunError::Launch { .. } => "launch",
            RunError::Wait(_) => "wait",
            RunError::Exit { .. } => "exit",
            RunError::Timeout(_) => "timeout",
        }
    }
}

pub type RunFuture<'a> = Pin<Box<dyn Future<Output = ExecutionResult> + Send + 'a>>;

/// Executes snippets. Object safe so sessions can hold `Arc<dyn ProcessRunner>`.
pub trait ProcessRunner: Send + Sync + 'static {
    fn run<'a>(&'a self, request: &'a crate::ExecutionRequest) -> RunFuture<'a>;
}

#[derive(Debug, Clone)]
pub struct InterpreterRunner {
    interpreter: PathBuf,
    scratch_path: PathBuf,
    timeout: Option<Duration>,
}

impl InterpreterRunner {
    pub fn new(interpreter: impl Into<PathBuf>, scratch_path: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
            scratch_path: scratch_path.into(),
            timeout: None,
        }
    }

    /// Bound each run; the interpreter is killed when the bound elapses.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn from_config(config: &core_config::Config, workspace_root: Option<&Path>) -> Self {
        let live = config.live();
        Self::new(
            config.resolve_interpreter(workspace_root),
            live.scratch_path(),
        )
        .with_timeout(live.run_timeout())
    }

    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    pub fn scratch_path(&self) -> &Path {
        &self.scratch_path
    }

    async fn execute(&self, request: &crate::ExecutionRequest) -> ExecutionResult {
        let start = Instant::now();
        if let Err(e) = tokio::fs::write(&self.scratch_path, request.source()).await {
            let err = RunError::Write(e);
            debug!(target: "live.runner", kind = err.as_str(), path = %self.scratch_path.display(), "scratch_write_failed");
            return ExecutionResult::failed(err.to_string());
        }

        let scratch = ScratchFile(&self.scratch_path);
        let outcome = self.invoke().await;
        drop(scratch);

        let elapsed_ms = start.elapsed().as_millis() as u64;
        match outcome {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
                let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
                info!(
                    target: "live.runner",
                    line = request.target_line(),
                    code = ?output.status.code(),
                    stdout_len = stdout.len(),
                    stderr_len = stderr.len(),
                    elapsed_ms,
                    "run_complete"
                );
                if output.status.success() {
                    return ExecutionResult::success(stdout, stderr);
                }
                let message = if stderr.trim().is_empty() {
                    format!("interpreter exited with {}", output.status)
                } else {
                    stderr.clone()
                };
                let err = RunError::Exit {
                    code: output.status.code(),
                    message,
                };
                ExecutionResult {
                    stdout,
                    stderr,
                    failure: Some(err.to_string()),
                }
            }
            Err(err) => {
                info!(
                    target: "live.runner",
                    line = request.target_line(),
                    kind = err.as_str(),
                    elapsed_ms,
                    "run_failed"
                );
                ExecutionResult::failed(err.to_string())
            }
        }
    }

    async fn invoke(&self) -> Result<Output, RunError> {
        let mut cmd = Command::new(&self.interpreter);
        cmd.arg(&self.scratch_path)
            .env("PYTHONIOENCODING", "utf-8")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd.spawn().map_err(|source| RunError::Launch {
            program: self.interpreter.display().to_string(),
            source,
        })?;
        debug!(target: "live.runner", pid = ?child.id(), "interpreter_spawned");

        // Dropping the wait future on timeout drops the child, which kills it.
        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| RunError::Timeout(limit))?,
            None => wait.await,
        }
        .map_err(RunError::Wait)?;

        Ok(output)
    }
}

/// Deletes the scratch file when dropped, so an aborted run cleans up too.
struct ScratchFile<'a>(&'a Path);

impl Drop for ScratchFile<'_> {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(self.0) {
            debug!(target: "live.runner", ?e, "scratch_remove_failed");
        }
    }
}

impl ProcessRunner for InterpreterRunner {
    fn run<'a>(&'a self, request: &'a crate::ExecutionRequest) -> RunFuture<'a> {
        Box::pin(self.execute(request))
    }
}
