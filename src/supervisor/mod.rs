//! Supervision of the dev-server child processes.
//!
//! Children run with inherited stdio so their logs land in the operator's
//! terminal alongside the orchestrator's own output. Each launched child
//! gets a watcher task that either reports an unexpected exit on the
//! failure channel or, when termination is requested, runs the graceful
//! shutdown path and reaps the process.
//!
//! Launching never blocks on the child: supervised processes are
//! long-running servers that live until explicitly terminated.

mod shutdown;
mod types;

pub use shutdown::shutdown_child;
pub use types::{ProcessHandle, Role, ServiceSpec, SupervisorEvent};

use std::collections::HashMap;
use std::io;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tokio::sync::Mutex;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// The OS could not start a child at all (missing executable, bad working
/// directory). Fatal for startup; never retried.
#[derive(Debug, Error)]
#[error("failed to launch {role} (`{command}`): {source}")]
pub struct LaunchError {
    pub role: Role,
    pub command: String,
    #[source]
    pub source: io::Error,
}

/// Process supervision seam. The production implementation spawns real
/// children; tests substitute a recording fake.
#[async_trait]
pub trait Supervise: Send + Sync {
    /// Spawn `spec` without waiting for it to finish.
    async fn launch(&self, spec: &ServiceSpec) -> Result<ProcessHandle, LaunchError>;

    /// Terminate the child for `role` and wait for it to be reaped.
    /// Idempotent: unknown or already-dead roles are a no-op.
    async fn terminate(&self, role: Role);

    /// Terminate every tracked child, best-effort.
    async fn terminate_all(&self);
}

struct TrackedChild {
    pid: u32,
    cancel: CancellationToken,
    watcher: JoinHandle<()>,
}

/// Supervisor backed by `tokio::process`.
///
/// The role→child map is mutated only through the supervisor's own mutex;
/// the watcher tasks never touch it.
pub struct DevSupervisor {
    children: Mutex<HashMap<Role, TrackedChild>>,
    events: UnboundedSender<SupervisorEvent>,
}

impl DevSupervisor {
    /// Create a supervisor and the receiving end of its failure channel.
    pub fn new() -> (Arc<Self>, UnboundedReceiver<SupervisorEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let supervisor = Arc::new(Self {
            children: Mutex::new(HashMap::new()),
            events,
        });
        (supervisor, rx)
    }
}

#[async_trait]
impl Supervise for DevSupervisor {
    async fn launch(&self, spec: &ServiceSpec) -> Result<ProcessHandle, LaunchError> {
        let mut child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|source| LaunchError {
                role: spec.role,
                command: spec.command_line(),
                source,
            })?;

        let pid = child.id().ok_or_else(|| LaunchError {
            role: spec.role,
            command: spec.command_line(),
            source: io::Error::other("child has no PID"),
        })?;

        let role = spec.role;
        let cancel = CancellationToken::new();
        let watch_cancel = cancel.clone();
        let events = self.events.clone();

        let watcher = tokio::spawn(async move {
            let natural_exit = tokio::select! {
                status = child.wait() => Some(status),
                _ = watch_cancel.cancelled() => None,
            };

            match natural_exit {
                Some(status) => {
                    // Exit with no termination requested. The receiver may
                    // be gone during late teardown; that is fine.
                    let _ = events.send(SupervisorEvent::Exited {
                        role,
                        status: status.ok(),
                    });
                }
                None => match shutdown_child(child).await {
                    Ok(status) => debug!(role = %role, status = ?status, "child terminated"),
                    Err(e) => warn!(role = %role, error = %e, "child termination failed"),
                },
            }
        });

        info!(role = %role, pid = %pid, command = %spec.command_line(), "launched");

        let mut children = self.children.lock().await;
        children.insert(role, TrackedChild {
            pid,
            cancel,
            watcher,
        });

        Ok(ProcessHandle { role, pid })
    }

    async fn terminate(&self, role: Role) {
        let tracked = self.children.lock().await.remove(&role);
        let Some(tracked) = tracked else {
            debug!(role = %role, "terminate: nothing tracked for role");
            return;
        };

        info!(role = %role, pid = %tracked.pid, "stopping");
        tracked.cancel.cancel();

        // Request and confirmation are separate steps: wait for the
        // watcher to finish the shutdown path before reporting done.
        if let Err(e) = tracked.watcher.await {
            warn!(role = %role, error = %e, "watcher task failed during termination");
        }
    }

    async fn terminate_all(&self) {
        let roles: Vec<Role> = self.children.lock().await.keys().copied().collect();
        for role in roles {
            self.terminate(role).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use std::time::Duration;
    #[cfg(unix)]
    use tokio::time::timeout;

    #[cfg(unix)]
    fn sleep_spec(role: Role, dir: &std::path::Path) -> ServiceSpec {
        ServiceSpec::new(role, "sleep", &["30"], dir)
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn launch_then_terminate_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let (supervisor, _events) = DevSupervisor::new();

        let handle = supervisor
            .launch(&sleep_spec(Role::Backend, dir.path()))
            .await
            .expect("launch failed");
        assert_eq!(handle.role, Role::Backend);
        assert!(handle.pid > 0);

        supervisor.terminate(Role::Backend).await;

        // Second terminate is a no-op, not an error.
        supervisor.terminate(Role::Backend).await;
    }

    #[tokio::test]
    async fn missing_executable_is_a_launch_error() {
        let (supervisor, _events) = DevSupervisor::new();
        let spec = ServiceSpec::new(Role::Frontend, "definitely-not-a-real-command", &[], ".");

        let err = supervisor.launch(&spec).await.expect_err("launch succeeded");
        assert_eq!(err.role, Role::Frontend);
        assert!(err.to_string().contains("frontend"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn unexpected_exit_is_reported_on_the_channel() {
        let (supervisor, mut events) = DevSupervisor::new();
        let spec = ServiceSpec::new(Role::Backend, "true", &[], ".");

        supervisor.launch(&spec).await.expect("launch failed");

        let event = timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("no event within timeout")
            .expect("channel closed");
        let SupervisorEvent::Exited { role, status } = event;
        assert_eq!(role, Role::Backend);
        assert!(status.expect("no exit status").success());
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn requested_termination_does_not_report_an_exit() {
        let dir = tempfile::tempdir().expect("tempdir failed");
        let (supervisor, mut events) = DevSupervisor::new();

        supervisor
            .launch(&sleep_spec(Role::Frontend, dir.path()))
            .await
            .expect("launch failed");
        supervisor.terminate_all().await;

        // The watcher took the cancellation branch, so no Exited event.
        assert!(
            timeout(Duration::from_millis(200), events.recv())
                .await
                .is_err()
        );
    }
}
