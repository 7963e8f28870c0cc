//! `lsof`-backed prober for Unix-likes.

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use super::{OwningProcessSet, PortProber, ProbeError};

/// Probes by running `lsof -t -i :<port>`, one PID per output line.
///
/// `lsof` exits non-zero when nothing matches; with empty output that is a
/// clean "nothing listening", not a query failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct LsofProber;

impl LsofProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PortProber for LsofProber {
    async fn owners(&self, port: u16) -> Result<OwningProcessSet, ProbeError> {
        let output = Command::new("lsof")
            .arg("-t")
            .arg("-i")
            .arg(format!(":{port}"))
            .output()
            .await
            .map_err(|e| ProbeError::QueryFailed {
                port,
                reason: e.to_string(),
            })?;

        let pids = parse_pid_lines(&String::from_utf8_lossy(&output.stdout));

        // Exit 1 with a silent stderr just means "no match"; anything
        // louder is the tool itself failing.
        if pids.is_empty() && !output.status.success() && !output.stderr.is_empty() {
            return Err(ProbeError::QueryFailed {
                port,
                reason: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        debug!(port = %port, owners = pids.len(), "probed port via lsof");
        Ok(OwningProcessSet::new(pids))
    }
}

/// One PID per line, as `lsof -t` prints them. Non-numeric lines are
/// skipped rather than treated as failures.
fn parse_pid_lines(stdout: &str) -> Vec<u32> {
    stdout
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_pid_per_line() {
        assert_eq!(parse_pid_lines("1234\n5678\n"), vec![1234, 5678]);
    }

    #[test]
    fn empty_output_means_no_owners() {
        assert!(parse_pid_lines("").is_empty());
        assert!(parse_pid_lines("\n").is_empty());
    }

    #[test]
    fn skips_non_numeric_noise() {
        assert_eq!(parse_pid_lines("1234\nlsof: warning\n"), vec![1234]);
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn probing_an_unbound_port_is_free_not_error() {
        if which::which("lsof").is_err() {
            return;
        }
        // Bind a listener to grab a free port, then drop it and probe.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind failed");
        let port = listener.local_addr().expect("no local addr").port();
        drop(listener);

        let owners = LsofProber::new().owners(port).await.expect("probe failed");
        assert!(owners.is_empty());
    }
}
