//! `netstat`-backed prober for Windows.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{OwningProcessSet, PortProber, ProbeError};

/// Probes by running `netstat -ano` and scanning local addresses for the
/// target port. The owning PID is the trailing column of each matching row.
#[derive(Debug, Clone, Copy, Default)]
pub struct NetstatProber;

impl NetstatProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PortProber for NetstatProber {
    async fn owners(&self, port: u16) -> Result<OwningProcessSet, ProbeError> {
        let output = Command::new("netstat")
            .arg("-ano")
            .output()
            .await
            .map_err(|e| ProbeError::QueryFailed {
                port,
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ProbeError::QueryFailed {
                port,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let pids = parse_netstat_table(&String::from_utf8_lossy(&output.stdout), port);
        debug!(port = %port, owners = pids.len(), "probed port via netstat");
        Ok(OwningProcessSet::new(pids))
    }
}

/// Extract owning PIDs for `port` from `netstat -ano` output.
///
/// A row counts when its local-address column ends in `:<port>`; the PID
/// is the last whitespace-separated column. Header rows and rows without a
/// numeric PID are skipped. PID 0 is the idle/system pseudo-process and is
/// never a reclaim target.
fn parse_netstat_table(table: &str, port: u16) -> Vec<u32> {
    let suffix = format!(":{port}");
    table
        .lines()
        .filter_map(|line| {
            let mut cols = line.split_whitespace();
            let proto = cols.next()?;
            if proto != "TCP" && proto != "UDP" {
                return None;
            }
            let local = cols.next()?;
            if !local.ends_with(&suffix) {
                return None;
            }
            let pid = line.split_whitespace().next_back()?.parse::<u32>().ok()?;
            (pid != 0).then_some(pid)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
Active Connections

  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       912
  TCP    0.0.0.0:5173           0.0.0.0:0              LISTENING       4312
  TCP    127.0.0.1:5173         127.0.0.1:61002        ESTABLISHED     4312
  TCP    [::]:8081              [::]:0                 LISTENING       7788
  TCP    127.0.0.1:51730        127.0.0.1:443          TIME_WAIT       0
  UDP    0.0.0.0:5353           *:*                                    1204
";

    #[test]
    fn finds_pid_for_listening_port() {
        assert_eq!(parse_netstat_table(SAMPLE, 8081), vec![7788]);
    }

    #[test]
    fn multiple_rows_collapse_to_one_pid() {
        let set = OwningProcessSet::new(parse_netstat_table(SAMPLE, 5173));
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![4312]);
    }

    #[test]
    fn port_suffix_does_not_match_longer_ports() {
        // 51730 must not be mistaken for 5173.
        assert!(parse_netstat_table(SAMPLE, 173).is_empty());
    }

    #[test]
    fn unmanaged_port_has_no_owners() {
        assert!(parse_netstat_table(SAMPLE, 5174).is_empty());
    }

    #[test]
    fn pid_zero_is_never_reported() {
        assert!(parse_netstat_table(SAMPLE, 51730).is_empty());
    }
}
