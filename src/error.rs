//! Orchestrator error taxonomy and exit-code mappings.
//!
//! Every failure surfaced to the operator names the resource involved
//! (port number or role); the binary never exits silently on failure.

use thiserror::Error;

use crate::probe::ProbeError;
use crate::supervisor::{LaunchError, Role};

/// Top-level failure of the orchestrator run.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The retry budget was consumed without confirming the port free.
    #[error("unable to free port {port} after {attempts} attempts; check running processes manually")]
    ReclaimExhausted { port: u16, attempts: u32 },

    /// Final pre-launch verification still saw the port bound.
    #[error("port {port} is still occupied after reclamation")]
    PortStillOccupied { port: u16 },

    /// The OS failed to start a child process at all.
    #[error(transparent)]
    Launch(#[from] LaunchError),

    /// A launched child exited without a shutdown having been requested.
    #[error("{role} server exited unexpectedly")]
    UnexpectedChildExit { role: Role },

    /// The port query mechanism itself is unusable on this system.
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Invalid configuration (bad project root, unparseable overrides).
    #[error(transparent)]
    Config(#[from] anyhow::Error),
}

impl OrchestratorError {
    /// Map error to appropriate exit code.
    ///
    /// Follows Unix sysexits conventions where a category fits:
    /// 69 (EX_UNAVAILABLE) for ports we could not free or probe,
    /// 71 (EX_OSERR) for processes the OS could not start,
    /// 78 (EX_CONFIG) for configuration problems.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ReclaimExhausted { .. } | Self::PortStillOccupied { .. } | Self::Probe(_) => 69,
            Self::Launch(_) => 71,
            Self::UnexpectedChildExit { .. } => 1,
            Self::Config(_) => 78,
        }
    }
}
