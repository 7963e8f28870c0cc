//! Orchestrator configuration: managed ports, service commands, retry
//! budget.
//!
//! The managed port set is fixed and known at startup; nothing extends it
//! at runtime.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::warn;
use url::Url;

use crate::reclaim::RetryBudget;
use crate::supervisor::{Role, ServiceSpec};

/// Fallback API base URL when `VITE_API_BASE_URL` is unset. Matches the
/// frontend's own fallback so both sides agree on the backend port.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8081";

/// Primary Vite dev-server port.
pub const FRONTEND_PORT: u16 = 5173;

/// Vite falls over to this port when the primary is taken; managed so a
/// half-restarted dev server cannot squat on it.
pub const FRONTEND_BACKUP_PORT: u16 = 5174;

#[derive(Debug, Clone)]
pub struct DevConfig {
    /// Backend HTTP port, derived from the API base URL.
    pub backend_port: u16,
    /// Project root holding the Go backend; the frontend lives in `web/`
    /// beneath it.
    pub root: PathBuf,
    /// Reclaim budget applied to every managed port.
    pub budget: RetryBudget,
}

impl DevConfig {
    /// Build a config for `root`, reading the backend port from the
    /// environment.
    ///
    /// Fails when `root` does not exist — a mistyped `--root` should stop
    /// the run before any process gets killed on its behalf.
    pub fn new(root: &Path) -> anyhow::Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("project root {} is not accessible", root.display()))?;
        Ok(Self {
            backend_port: backend_port_from_env(),
            root,
            budget: RetryBudget::default(),
        })
    }

    /// The fixed set of ports the orchestrator manages.
    pub fn managed_ports(&self) -> Vec<u16> {
        vec![self.backend_port, FRONTEND_PORT, FRONTEND_BACKUP_PORT]
    }

    /// Commands to supervise. Backend first — the ordering only keeps the
    /// startup logs readable, both servers bind independent ports.
    pub fn services(&self) -> Vec<ServiceSpec> {
        vec![
            ServiceSpec::new(
                Role::Backend,
                "go",
                &["run", "cmd/webserver/main.go"],
                &self.root,
            ),
            ServiceSpec::new(Role::Frontend, "npm", &["start"], self.root.join("web")),
        ]
    }

    pub fn backend_url(&self) -> String {
        format!("http://localhost:{}", self.backend_port)
    }

    pub fn frontend_url(&self) -> String {
        format!("http://localhost:{FRONTEND_PORT}")
    }
}

/// Read the backend port out of `VITE_API_BASE_URL`, the same override the
/// frontend honors in its vite config.
fn backend_port_from_env() -> u16 {
    let value = std::env::var("VITE_API_BASE_URL")
        .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
    match backend_port_from_url(&value) {
        Some(port) => port,
        None => {
            warn!(url = %value, "could not read a port from VITE_API_BASE_URL, using 8081");
            8081
        }
    }
}

fn backend_port_from_url(value: &str) -> Option<u16> {
    Url::parse(value).ok()?.port_or_known_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_port_parses_from_base_url() {
        assert_eq!(backend_port_from_url("http://localhost:8081"), Some(8081));
        assert_eq!(backend_port_from_url("http://localhost:8080"), Some(8080));
    }

    #[test]
    fn scheme_default_applies_when_port_is_omitted() {
        assert_eq!(backend_port_from_url("http://localhost"), Some(80));
    }

    #[test]
    fn garbage_urls_yield_no_port() {
        assert_eq!(backend_port_from_url("not a url"), None);
        assert_eq!(backend_port_from_url(""), None);
    }

    #[test]
    fn managed_ports_cover_backend_and_both_frontend_ports() {
        let config = DevConfig {
            backend_port: 8081,
            root: PathBuf::from("."),
            budget: RetryBudget::default(),
        };
        assert_eq!(config.managed_ports(), vec![8081, 5173, 5174]);
    }

    #[test]
    fn services_launch_backend_first_frontend_in_web_dir() {
        let config = DevConfig {
            backend_port: 8081,
            root: PathBuf::from("/proj"),
            budget: RetryBudget::default(),
        };
        let services = config.services();
        assert_eq!(services[0].role, Role::Backend);
        assert_eq!(services[1].role, Role::Frontend);
        assert_eq!(services[1].dir, PathBuf::from("/proj/web"));
    }

    #[test]
    fn missing_root_is_a_config_error() {
        let err = DevConfig::new(Path::new("/definitely/not/a/real/dir")).unwrap_err();
        assert!(err.to_string().contains("not accessible"));
    }
}
