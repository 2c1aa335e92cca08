//! External tool invocation
//!
//! Comparison and scheduling only ever see an [`Invocation`]; how a tool is
//! actually launched sits behind the [`Invoker`] trait so the rest of the
//! harness can be driven by fake invokers in tests.

mod process;

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

pub use process::ProcessInvoker;

/// Which side of the comparison a tool is on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolRole {
    Baseline,
    Modified,
}

impl ToolRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolRole::Baseline => "baseline",
            ToolRole::Modified => "modified",
        }
    }
}

impl fmt::Display for ToolRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully resolved external tool
#[derive(Debug, Clone)]
pub struct Tool {
    pub role: ToolRole,
    pub program: PathBuf,
    /// Arguments placed before the descriptor path
    pub args: Vec<String>,
}

/// How an invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The process exited (normally or by signal)
    Completed,
    /// The process exceeded its time bound and was killed
    TimedOut,
    /// The process could not be started
    LaunchFailed(String),
}

/// Captured result of running one tool on one descriptor
#[derive(Debug, Clone)]
pub struct Invocation {
    pub outcome: Outcome,
    /// Exit code; `None` when killed by a signal or never started
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    /// Scratch directory the tool ran in (removed after the run)
    pub scratch_dir: Option<PathBuf>,
}

impl Invocation {
    /// A process that ran to completion
    pub fn completed(exit_code: Option<i32>, stdout: String, stderr: String, duration: Duration) -> Self {
        Self {
            outcome: Outcome::Completed,
            exit_code,
            stdout,
            stderr,
            duration,
            scratch_dir: None,
        }
    }

    /// A process killed after exceeding its time bound
    pub fn timed_out(duration: Duration) -> Self {
        Self {
            outcome: Outcome::TimedOut,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration,
            scratch_dir: None,
        }
    }

    /// A process that never started
    pub fn launch_failed(reason: impl Into<String>, duration: Duration) -> Self {
        Self {
            outcome: Outcome::LaunchFailed(reason.into()),
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration,
            scratch_dir: None,
        }
    }

    /// Short human-readable status, e.g. `exit 0`, `signal`, `timeout`
    pub fn status_label(&self) -> String {
        match (&self.outcome, self.exit_code) {
            (Outcome::Completed, Some(code)) => format!("exit {}", code),
            (Outcome::Completed, None) => "killed by signal".to_string(),
            (Outcome::TimedOut, _) => "timeout".to_string(),
            (Outcome::LaunchFailed(_), _) => "launch failed".to_string(),
        }
    }
}

/// Runs an external tool on one descriptor file
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Run `tool` on `input`, killing it once `timeout` has elapsed
    ///
    /// Never fails: launch problems and timeouts are reported through
    /// [`Invocation::outcome`].
    async fn invoke(&self, tool: &Tool, input: &Path, timeout: Duration) -> Invocation;
}
