//! Port reclamation: snapshot owners, kill, settle, re-probe.
//!
//! The loop is bounded by an explicit [`RetryBudget`] — reclamation never
//! recurses and never spins unbounded against a permanently busy port. A
//! successful outcome is advisory only: the port was observed free at the
//! last probe, nothing prevents another process from binding it afterward.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::probe::PortProber;
use crate::terminate::ProcessTerminator;

/// Bounded reclaim configuration, applied per port.
///
/// `attempts` counts kill/settle/re-probe cycles; `settle` is how long the
/// OS gets to release a binding after its owner is killed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    pub attempts: u32,
    pub settle: Duration,
}

impl Default for RetryBudget {
    fn default() -> Self {
        Self {
            attempts: 5,
            settle: Duration::from_secs(1),
        }
    }
}

/// What a reclaim run observed and did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReclaimOutcome {
    /// Port observed free at the final probe.
    pub freed: bool,
    /// Kill/settle cycles executed.
    pub attempts: u32,
    /// Termination requests issued.
    pub kills: u32,
}

/// Stateless reclamation service: port in, outcome out.
///
/// Owns no state between calls; every probe is a fresh snapshot of the OS
/// process table.
pub struct PortReclaimer {
    prober: Arc<dyn PortProber>,
    terminator: Arc<dyn ProcessTerminator>,
}

impl PortReclaimer {
    pub fn new(prober: Arc<dyn PortProber>, terminator: Arc<dyn ProcessTerminator>) -> Self {
        Self { prober, terminator }
    }

    /// Free `port` by killing whatever owns it, within `budget`.
    ///
    /// An already-free port returns immediately: no termination requests,
    /// no settling delay. Owners that vanish between the probe and the
    /// kill are treated as already satisfied. An inconclusive probe counts
    /// as "still occupied" and consumes budget — the conservative reading,
    /// so a launch never proceeds over a port we cannot see.
    pub async fn reclaim(&self, port: u16, budget: &RetryBudget) -> ReclaimOutcome {
        let mut attempts = 0;
        let mut kills = 0;

        loop {
            let owners = match self.prober.owners(port).await {
                Ok(owners) => owners,
                Err(e) => {
                    warn!(port = %port, error = %e, "port probe inconclusive, treating as occupied");
                    if attempts >= budget.attempts {
                        return ReclaimOutcome {
                            freed: false,
                            attempts,
                            kills,
                        };
                    }
                    attempts += 1;
                    sleep(budget.settle).await;
                    continue;
                }
            };

            if owners.is_empty() {
                if attempts > 0 {
                    info!(port = %port, attempts = %attempts, "port freed");
                }
                return ReclaimOutcome {
                    freed: true,
                    attempts,
                    kills,
                };
            }

            if attempts >= budget.attempts {
                warn!(port = %port, "retry budget exhausted, port still occupied");
                return ReclaimOutcome {
                    freed: false,
                    attempts,
                    kills,
                };
            }
            attempts += 1;

            info!(
                port = %port,
                owners = owners.len(),
                attempt = %attempts,
                "terminating processes holding port"
            );
            for pid in owners.iter() {
                kills += 1;
                if let Err(e) = self.terminator.terminate(pid).await {
                    // Best-effort: the owner may have exited on its own
                    // since the probe.
                    debug!(port = %port, pid = %pid, error = %e, "termination request failed");
                }
            }

            sleep(budget.settle).await;
        }
    }
}
