//! Graceful child shutdown with SIGTERM → SIGKILL escalation.

use std::io;
use std::process::ExitStatus;

use tokio::process::Child;

#[cfg(unix)]
use std::time::Duration;
#[cfg(unix)]
use tokio::time::timeout;

#[cfg(unix)]
use nix::sys::signal::{self, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

/// Grace period between SIGTERM and SIGKILL.
#[cfg(unix)]
const TERM_GRACE: Duration = Duration::from_secs(5);

/// Shut down a child and reap it.
///
/// Unix: SIGTERM, wait up to [`TERM_GRACE`] for a voluntary exit, then
/// SIGKILL. A child that already exited is reaped without error. Other
/// platforms have no graceful signal and kill immediately.
pub async fn shutdown_child(mut child: Child) -> io::Result<ExitStatus> {
    #[cfg(unix)]
    {
        shutdown_unix(&mut child).await
    }

    #[cfg(not(unix))]
    {
        child.kill().await?;
        child.wait().await
    }
}

#[cfg(unix)]
async fn shutdown_unix(child: &mut Child) -> io::Result<ExitStatus> {
    let pid = child
        .id()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "child has no PID"))?;

    if let Err(e) = signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        if e == nix::errno::Errno::ESRCH {
            // Already exited; just reap.
            return child.wait().await;
        }
        return Err(io::Error::other(e));
    }

    if let Ok(result) = timeout(TERM_GRACE, child.wait()).await {
        return result;
    }

    // Grace period elapsed: escalate. Child::kill sends SIGKILL on Unix.
    child.kill().await?;
    child.wait().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::process::Command;
    use tokio::time::sleep;

    #[tokio::test]
    #[cfg(unix)]
    async fn sigterm_stops_a_cooperative_child() {
        let child = Command::new("sleep")
            .arg("30")
            .spawn()
            .expect("failed to spawn sleep");

        let status = shutdown_child(child).await.expect("shutdown failed");
        assert!(!status.success());
    }

    #[tokio::test]
    async fn already_exited_child_is_reaped_without_error() {
        let child = Command::new("echo")
            .arg("done")
            .spawn()
            .expect("failed to spawn echo");

        sleep(std::time::Duration::from_millis(100)).await;

        let status = shutdown_child(child).await.expect("shutdown failed");
        assert!(status.success());
    }
}
