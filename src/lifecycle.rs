//! Top-level lifecycle driver: reclaim, verify, launch, wait, shut down.
//!
//! The controller walks `Idle -> Reclaiming -> Verifying -> Launching ->
//! Running -> ShuttingDown -> Stopped`. Ports are reclaimed one at a time —
//! the underlying system queries share output formats and interleaving them
//! makes the logs unreadable. Shutdown is guarded by a one-time gate so
//! every trigger source (signal, child failure, launch-failure unwind)
//! funnels into a single execution of the teardown sequence.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

use crate::config::DevConfig;
use crate::error::OrchestratorError;
use crate::probe::PortProber;
use crate::reclaim::PortReclaimer;
use crate::supervisor::{Supervise, SupervisorEvent};
use crate::terminate::ProcessTerminator;

/// Observable controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecyclePhase {
    Idle,
    Reclaiming,
    Verifying,
    Launching,
    Running,
    ShuttingDown,
    Stopped,
}

pub struct LifecycleController {
    config: DevConfig,
    prober: Arc<dyn PortProber>,
    reclaimer: PortReclaimer,
    supervisor: Arc<dyn Supervise>,
    events: Mutex<UnboundedReceiver<SupervisorEvent>>,
    phase: std::sync::Mutex<LifecyclePhase>,
    shutdown_started: AtomicBool,
}

impl LifecycleController {
    pub fn new(
        config: DevConfig,
        prober: Arc<dyn PortProber>,
        terminator: Arc<dyn ProcessTerminator>,
        supervisor: Arc<dyn Supervise>,
        events: UnboundedReceiver<SupervisorEvent>,
    ) -> Self {
        let reclaimer = PortReclaimer::new(Arc::clone(&prober), terminator);
        Self {
            config,
            prober,
            reclaimer,
            supervisor,
            events: Mutex::new(events),
            phase: std::sync::Mutex::new(LifecyclePhase::Idle),
            shutdown_started: AtomicBool::new(false),
        }
    }

    pub fn phase(&self) -> LifecyclePhase {
        *self.phase.lock().unwrap()
    }

    fn set_phase(&self, phase: LifecyclePhase) {
        *self.phase.lock().unwrap() = phase;
        debug!(phase = ?phase, "lifecycle phase");
    }

    /// Full run: bring the environment up, print the banner, then block
    /// until a shutdown trigger and tear everything down.
    pub async fn run(&self) -> Result<(), OrchestratorError> {
        self.startup().await?;
        self.print_banner();
        self.wait().await
    }

    /// Drive `Idle -> Running`: reclaim every managed port, verify all of
    /// them free, then launch the services.
    pub async fn startup(&self) -> Result<(), OrchestratorError> {
        self.set_phase(LifecyclePhase::Reclaiming);
        println!("Stopping any existing processes...");
        for port in self.config.managed_ports() {
            let outcome = self.reclaimer.reclaim(port, &self.config.budget).await;
            if !outcome.freed {
                self.set_phase(LifecyclePhase::Stopped);
                return Err(OrchestratorError::ReclaimExhausted {
                    port,
                    attempts: outcome.attempts,
                });
            }
        }

        self.set_phase(LifecyclePhase::Verifying);
        for port in self.config.managed_ports() {
            // Launching a server on an occupied port fails with a confusing
            // downstream error; catch it here. Inconclusive probes count as
            // occupied.
            let occupied = self.prober.occupied(port).await.unwrap_or(true);
            if occupied {
                self.set_phase(LifecyclePhase::Stopped);
                return Err(OrchestratorError::PortStillOccupied { port });
            }
        }

        self.set_phase(LifecyclePhase::Launching);
        println!("Starting development servers...");
        for spec in self.config.services() {
            if let Err(e) = self.supervisor.launch(&spec).await {
                error!(role = %spec.role, error = %e, "launch failed");
                // Tear down whatever did start; roles that never launched
                // get no termination request.
                self.shutdown().await;
                return Err(OrchestratorError::Launch(e));
            }
        }

        self.set_phase(LifecyclePhase::Running);
        Ok(())
    }

    /// Block in `Running` until a termination signal arrives or a child
    /// exits unexpectedly, then run the shutdown sequence. The returned
    /// error, if any, shapes the process exit code.
    pub async fn wait(&self) -> Result<(), OrchestratorError> {
        let mut events = self.events.lock().await;
        tokio::select! {
            signal = wait_for_shutdown_signal() => {
                match signal {
                    Ok(name) => info!(signal = %name, "termination signal received"),
                    // Failing to listen for signals is an internal fault;
                    // shut down rather than run unsupervised.
                    Err(e) => warn!(error = %e, "signal listener failed, shutting down"),
                }
                self.shutdown().await;
                Ok(())
            }
            event = events.recv() => {
                match event {
                    Some(SupervisorEvent::Exited { role, status }) => {
                        if self.shutdown_started.load(Ordering::SeqCst) {
                            // Exits during teardown are expected.
                            return Ok(());
                        }
                        error!(role = %role, status = ?status, "child exited unexpectedly");
                        self.shutdown().await;
                        Err(OrchestratorError::UnexpectedChildExit { role })
                    }
                    None => {
                        self.shutdown().await;
                        Ok(())
                    }
                }
            }
        }
    }

    /// Idempotent teardown: terminate the tracked children, then reclaim
    /// every managed port so an immediate restart does not collide with
    /// lingering bindings. Only the first caller executes the sequence;
    /// concurrent and later triggers are no-ops.
    pub async fn shutdown(&self) {
        if self.shutdown_started.swap(true, Ordering::SeqCst) {
            return;
        }

        self.set_phase(LifecyclePhase::ShuttingDown);
        info!("shutting down development servers");

        self.supervisor.terminate_all().await;

        for port in self.config.managed_ports() {
            let outcome = self.reclaimer.reclaim(port, &self.config.budget).await;
            if !outcome.freed {
                warn!(port = %port, "port still occupied after shutdown reclaim");
            }
        }

        self.set_phase(LifecyclePhase::Stopped);
    }

    fn print_banner(&self) {
        println!();
        println!("Development servers started!");
        println!("Frontend: {}", self.config.frontend_url());
        println!("Backend: {}", self.config.backend_url());
        println!();
        println!("Press Ctrl+C to stop both servers.");
        println!();
    }
}

/// Resolve when the operator asks the orchestrator to stop.
#[cfg(unix)]
async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut term = signal(SignalKind::terminate())?;
    tokio::select! {
        result = tokio::signal::ctrl_c() => result.map(|()| "SIGINT"),
        _ = term.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await.map(|()| "ctrl-c")
}
