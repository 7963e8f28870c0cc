//! Port occupancy probing over the OS connection table.
//!
//! The prober answers one question: which PIDs hold a given TCP port right
//! now. A clean "nothing listening" answer is success with an empty set,
//! never an error; an error means the query mechanism itself could not run,
//! and callers must not read that as "free".
//!
//! Platform differences live behind [`PortProber`]: `lsof` on Unix-likes,
//! `netstat` on Windows. The implementation is picked once at startup by
//! [`detect_prober`]; the rest of the orchestrator is platform-blind.

mod lsof;
mod netstat;

pub use lsof::LsofProber;
pub use netstat::NetstatProber;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

/// PIDs bound to a port at the moment of a probe.
///
/// This is a snapshot, recomputed on every probe. It can go stale
/// immediately; consumers must tolerate owners that have already exited by
/// the time they act on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwningProcessSet(Vec<u32>);

impl OwningProcessSet {
    /// Build a set from raw PIDs, deduplicated (netstat reports one row
    /// per connection, so a busy server shows up many times).
    pub fn new(mut pids: Vec<u32>) -> Self {
        pids.sort_unstable();
        pids.dedup();
        Self(pids)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().copied()
    }
}

/// The probe could not be carried out. Distinct from "port free".
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The query tool failed to run or produced an unreadable result.
    #[error("port query failed for {port}: {reason}")]
    QueryFailed { port: u16, reason: String },

    /// No usable query mechanism exists on this system.
    #[error("no port query mechanism available: {0}")]
    MechanismUnavailable(String),
}

/// Read access to the OS connection table.
#[async_trait]
pub trait PortProber: Send + Sync {
    /// Snapshot the PIDs currently bound to `port`.
    async fn owners(&self, port: u16) -> Result<OwningProcessSet, ProbeError>;

    /// True iff at least one owning process was observed.
    async fn occupied(&self, port: u16) -> Result<bool, ProbeError> {
        Ok(!self.owners(port).await?.is_empty())
    }
}

/// Pick the probing mechanism for this platform.
///
/// Windows always has `netstat`; elsewhere `lsof` must be on the PATH or
/// startup fails with a descriptive error rather than guessing later.
pub fn detect_prober() -> Result<Arc<dyn PortProber>, ProbeError> {
    #[cfg(windows)]
    {
        Ok(Arc::new(NetstatProber::new()))
    }

    #[cfg(not(windows))]
    {
        which::which("lsof").map_err(|e| {
            ProbeError::MechanismUnavailable(format!("lsof not found on PATH: {e}"))
        })?;
        Ok(Arc::new(LsofProber::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owning_set_dedups_and_orders() {
        let set = OwningProcessSet::new(vec![4242, 17, 4242, 99]);
        assert_eq!(set.len(), 3);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![17, 99, 4242]);
    }

    #[test]
    fn empty_set_is_empty() {
        assert!(OwningProcessSet::default().is_empty());
        assert!(OwningProcessSet::new(Vec::new()).is_empty());
    }
}
