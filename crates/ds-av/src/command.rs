//! Builder for executing external tool commands with timeout support.
//!
//! Programs are always started directly from a list of argument tokens; no
//! shell is ever involved, so an argument is passed through as exactly one
//! `argv` entry whatever characters it contains.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;

/// Default command timeout: 5 minutes.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Default time between SIGTERM and SIGKILL.
const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(2);

/// Cap on how much of each output stream is kept.
const MAX_CAPTURE_BYTES: usize = 64 * 1024;

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output (lossy UTF-8).
    pub stdout: String,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// Why a tool invocation failed.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The program could not be started (missing binary, permission denied).
    #[error("failed to spawn: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran and exited unsuccessfully.
    #[error("exited with status {status}: {stderr}")]
    Exited {
        tool: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The program was still running when the timeout elapsed and was
    /// terminated.
    #[error("timed out after {timeout:?}")]
    TimedOut { tool: String, timeout: Duration },

    /// Waiting on the process failed.
    #[error("I/O error waiting for process: {source}")]
    Wait {
        tool: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    /// Name of the tool that failed.
    pub fn tool(&self) -> &str {
        match self {
            ToolError::Spawn { tool, .. }
            | ToolError::Exited { tool, .. }
            | ToolError::TimedOut { tool, .. }
            | ToolError::Wait { tool, .. } => tool,
        }
    }
}

impl From<ToolError> for ds_core::Error {
    fn from(e: ToolError) -> Self {
        ds_core::Error::tool(e.tool().to_string(), e.to_string())
    }
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use ds_av::ToolCommand;
/// use std::path::PathBuf;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), ds_av::ToolError> {
/// let output = ToolCommand::new(PathBuf::from("ffmpeg"))
///     .arg("-hide_banner")
///     .arg("-version")
///     .timeout(Duration::from_secs(5))
///     .execute()
///     .await?;
/// println!("{}", output.stdout);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    kill_grace: Duration,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Set how long a timed-out process gets to exit after SIGTERM before it
    /// is killed outright.
    pub fn kill_grace(&mut self, d: Duration) -> &mut Self {
        self.kill_grace = d;
        self
    }

    /// The program that will be executed.
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// The argument vector, exactly as the child will receive it.
    pub fn argv(&self) -> &[String] {
        &self.args
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// The child is always reaped before this returns. On timeout it is sent
    /// SIGTERM, given the kill grace period, then killed. If the returned
    /// future is dropped before completion the child is killed as well.
    pub async fn execute(&self) -> Result<ToolOutput, ToolError> {
        let program_name = self.program_name();

        tracing::debug!(tool = %program_name, args = ?self.args, "Spawning tool");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| ToolError::Spawn {
            tool: program_name.clone(),
            source: e,
        })?;

        // Drain both pipes concurrently so a chatty child never blocks on a
        // full pipe while we wait for it.
        let stdout_task = child.stdout.take().map(|out| tokio::spawn(drain_capped(out)));
        let stderr_task = child.stderr.take().map(|err| tokio::spawn(drain_capped(err)));

        let result = tokio::time::timeout(self.timeout, child.wait()).await;

        match result {
            Ok(Ok(status)) => {
                let stdout = collect(stdout_task, self.kill_grace).await;
                let stderr = collect(stderr_task, self.kill_grace).await;

                if !status.success() {
                    return Err(ToolError::Exited {
                        tool: program_name,
                        status,
                        stderr: stderr.trim().to_string(),
                    });
                }

                Ok(ToolOutput {
                    status,
                    stdout,
                    stderr,
                })
            }
            Ok(Err(e)) => {
                terminate(&mut child, self.kill_grace).await;
                abort(stdout_task);
                abort(stderr_task);
                Err(ToolError::Wait {
                    tool: program_name,
                    source: e,
                })
            }
            Err(_elapsed) => {
                tracing::warn!(
                    tool = %program_name,
                    timeout = ?self.timeout,
                    "Tool timed out; terminating"
                );
                terminate(&mut child, self.kill_grace).await;
                abort(stdout_task);
                abort(stderr_task);
                Err(ToolError::TimedOut {
                    tool: program_name,
                    timeout: self.timeout,
                })
            }
        }
    }
}

/// Ask the child to stop, then kill it if it has not exited within `grace`.
async fn terminate(child: &mut Child, grace: Duration) {
    #[cfg(unix)]
    {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = child.id() {
            match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                Ok(()) => {
                    if let Ok(Ok(_)) = tokio::time::timeout(grace, child.wait()).await {
                        return;
                    }
                }
                Err(e) => tracing::debug!(pid, "SIGTERM failed: {e}"),
            }
        }
    }

    #[cfg(not(unix))]
    let _ = grace;

    if let Err(e) = child.kill().await {
        tracing::debug!("Failed to kill child process: {e}");
    }
}

/// Read a stream to EOF, keeping at most [`MAX_CAPTURE_BYTES`].
async fn drain_capped<R: AsyncRead + Unpin>(mut reader: R) -> Vec<u8> {
    let mut kept = Vec::new();
    let mut chunk = [0u8; 8192];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let room = MAX_CAPTURE_BYTES.saturating_sub(kept.len());
                kept.extend_from_slice(&chunk[..n.min(room)]);
            }
        }
    }
    kept
}

/// Join a drain task. A grandchild may keep the pipe open after the child
/// exits, so the wait is bounded.
async fn collect(task: Option<JoinHandle<Vec<u8>>>, limit: Duration) -> String {
    let Some(mut task) = task else {
        return String::new();
    };
    match tokio::time::timeout(limit, &mut task).await {
        Ok(Ok(bytes)) => String::from_utf8_lossy(&bytes).to_string(),
        Ok(Err(_)) => String::new(),
        Err(_) => {
            task.abort();
            String::new()
        }
    }
}

fn abort(task: Option<JoinHandle<Vec<u8>>>) {
    if let Some(task) = task {
        task.abort();
    }
}
