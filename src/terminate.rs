//! Forced termination of foreign port owners.
//!
//! Reclamation kills processes this tool did not spawn, so there is no
//! child handle to signal or reap — only a PID snapshot that may already be
//! stale. "No such process" is therefore already-satisfied, not an error.
//! Supervised children are never stopped through this path; they get the
//! graceful escalation in [`crate::supervisor`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// A termination request that could not be delivered.
#[derive(Debug, Error)]
#[error("failed to terminate pid {pid}: {reason}")]
pub struct TerminateError {
    pub pid: u32,
    pub reason: String,
}

/// Forced-stop capability for a single PID.
#[async_trait]
pub trait ProcessTerminator: Send + Sync {
    /// Request forced termination of `pid`. A PID that is already gone is
    /// success, not an error.
    async fn terminate(&self, pid: u32) -> Result<(), TerminateError>;
}

/// SIGKILL through the kernel, tolerating ESRCH.
#[cfg(unix)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SignalTerminator;

#[cfg(unix)]
#[async_trait]
impl ProcessTerminator for SignalTerminator {
    async fn terminate(&self, pid: u32) -> Result<(), TerminateError> {
        use nix::errno::Errno;
        use nix::sys::signal::{self, Signal};
        use nix::unistd::Pid;

        match signal::kill(Pid::from_raw(pid as i32), Signal::SIGKILL) {
            Ok(()) => Ok(()),
            // Gone between the probe and the kill.
            Err(Errno::ESRCH) => Ok(()),
            Err(e) => Err(TerminateError {
                pid,
                reason: e.to_string(),
            }),
        }
    }
}

/// `taskkill /F /PID <pid>` — the Windows forced-stop command.
#[cfg(not(unix))]
#[derive(Debug, Clone, Copy, Default)]
pub struct TaskkillTerminator;

#[cfg(not(unix))]
#[async_trait]
impl ProcessTerminator for TaskkillTerminator {
    async fn terminate(&self, pid: u32) -> Result<(), TerminateError> {
        let output = tokio::process::Command::new("taskkill")
            .args(["/F", "/PID", &pid.to_string()])
            .output()
            .await
            .map_err(|e| TerminateError {
                pid,
                reason: e.to_string(),
            })?;

        if output.status.success() {
            return Ok(());
        }

        // taskkill's "not found" is the ESRCH of this platform.
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("not found") {
            Ok(())
        } else {
            Err(TerminateError {
                pid,
                reason: stderr.trim().to_string(),
            })
        }
    }
}

/// Pick the termination mechanism for this platform.
pub fn detect_terminator() -> Arc<dyn ProcessTerminator> {
    #[cfg(unix)]
    {
        Arc::new(SignalTerminator)
    }

    #[cfg(not(unix))]
    {
        Arc::new(TaskkillTerminator)
    }
}
