//! Process-backed invoker
//!
//! Each invocation gets its own scratch directory, used as the working
//! directory and exported as `TMPDIR`. On Unix the tool is started in a new
//! process group so that a timeout or an aborted run kills everything it
//! spawned, not just the direct child.

use std::path::Path;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;

use super::{Invocation, Invoker, Tool};

/// How long to keep reading output once the tool is gone
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Launches tools as real child processes
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessInvoker;

#[async_trait]
impl Invoker for ProcessInvoker {
    async fn invoke(&self, tool: &Tool, input: &Path, timeout: Duration) -> Invocation {
        let start = Instant::now();

        let scratch = match tempfile::Builder::new()
            .prefix(&format!("descdiff-{}-", tool.role))
            .tempdir()
        {
            Ok(dir) => dir,
            Err(e) => {
                return Invocation::launch_failed(
                    format!("Failed to create scratch directory: {}", e),
                    start.elapsed(),
                )
            }
        };

        let mut cmd = Command::new(&tool.program);
        cmd.args(&tool.args)
            .arg(input)
            .current_dir(scratch.path())
            .env("TMPDIR", scratch.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::debug!("Failed to start {} tool: {}", tool.role, e);
                return Invocation::launch_failed(
                    format!("Failed to start '{}': {}", tool.program.display(), e),
                    start.elapsed(),
                );
            }
        };

        // Armed until the group has been killed; dropping it early (aborted
        // worker) kills the whole process group.
        let mut group = GroupGuard::new(child.id());

        let stdout = Capture::spawn(child.stdout.take());
        let stderr = Capture::spawn(child.stderr.take());

        // Only the tool itself is bounded. Output is collected afterwards so
        // a background process holding a pipe open cannot stall the entry.
        let waited = tokio::time::timeout(timeout, child.wait()).await;
        let elapsed = start.elapsed();

        // Leftover descendants are killed either way
        group.kill();

        let mut invocation = match waited {
            Ok(Ok(status)) => {
                Invocation::completed(status.code(), String::new(), String::new(), elapsed)
            }
            Ok(Err(e)) => Invocation::launch_failed(
                format!("Failed to wait for '{}': {}", tool.program.display(), e),
                elapsed,
            ),
            Err(_) => {
                tracing::warn!(
                    "{} tool timed out after {}s on {}",
                    tool.role,
                    timeout.as_secs(),
                    input.display()
                );
                let _ = child.kill().await;
                Invocation::timed_out(elapsed)
            }
        };

        // Partial output is kept for timeouts too
        invocation.stdout = stdout.finish().await;
        invocation.stderr = stderr.finish().await;
        invocation.scratch_dir = Some(scratch.path().to_path_buf());
        invocation
    }
}

/// Reads a child pipe in the background into a shared buffer
struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl Capture {
    fn spawn<R: AsyncRead + Unpin + Send + 'static>(stream: Option<R>) -> Self {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let task = stream.map(|mut stream| {
            let buf = Arc::clone(&buf);
            tokio::spawn(async move {
                let mut chunk = [0u8; 8192];
                loop {
                    match stream.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => buf
                            .lock()
                            .unwrap_or_else(|e| e.into_inner())
                            .extend_from_slice(&chunk[..n]),
                        Err(e) => {
                            tracing::debug!("Error reading tool output: {}", e);
                            break;
                        }
                    }
                }
            })
        });
        Self { buf, task }
    }

    /// Wait briefly for the pipe to close, then decode what was read lossily
    async fn finish(mut self) -> String {
        if let Some(mut task) = self.task.take() {
            if tokio::time::timeout(DRAIN_TIMEOUT, &mut task).await.is_err() {
                tracing::debug!("Tool output still open after exit, truncating");
                task.abort();
            }
        }
        let buf = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }
}

/// Kills the tool's process group when dropped while armed
struct GroupGuard {
    pid: Option<u32>,
}

impl GroupGuard {
    fn new(pid: Option<u32>) -> Self {
        Self { pid }
    }

    fn kill(&mut self) {
        if let Some(pid) = self.pid.take() {
            kill_process_group(pid);
        }
    }
}

impl Drop for GroupGuard {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    // The child leads its own group, so -pid addresses every process in it
    let result = unsafe { libc::kill(-(pid as i32), libc::SIGKILL) };
    if result != 0 {
        tracing::trace!("Process group {} already gone", pid);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {
    // kill_on_drop covers the direct child
}
