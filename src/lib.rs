//! Development-environment orchestrator for the Aksharamala web stack.
//!
//! `aks-dev` brings up the two cooperating dev servers (Go backend, Vite
//! frontend) on fixed ports. Before launching anything it reclaims those
//! ports from stale processes left behind by earlier runs, and on interrupt
//! it tears both servers down and reclaims the ports again so an immediate
//! restart is clean.
//!
//! Layering, leaves first:
//! - [`probe`] — is a TCP port currently bound, and by which PIDs
//! - [`terminate`] — forced termination of foreign port owners
//! - [`reclaim`] — bounded kill/settle/re-probe loop per port
//! - [`supervisor`] — launch and tear down the dev-server children
//! - [`lifecycle`] — the top-level state machine driving all of the above

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod parser;
pub mod probe;
pub mod reclaim;
pub mod supervisor;
pub mod terminate;

pub use config::DevConfig;
pub use error::OrchestratorError;
pub use lifecycle::{LifecycleController, LifecyclePhase};
pub use reclaim::{PortReclaimer, ReclaimOutcome, RetryBudget};

// Silence unused dev-dependency warnings
#[cfg(test)]
use tokio_test as _;
