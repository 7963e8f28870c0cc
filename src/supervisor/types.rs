//! Shared types for supervised dev-server processes.

use std::fmt;
use std::path::PathBuf;
use std::process::ExitStatus;

/// A supervised long-running server. Exactly one child exists per role at
/// any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Backend,
    Frontend,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Backend => write!(f, "backend"),
            Self::Frontend => write!(f, "frontend"),
        }
    }
}

/// Command line and working directory for one role.
#[derive(Debug, Clone)]
pub struct ServiceSpec {
    pub role: Role,
    pub program: String,
    pub args: Vec<String>,
    pub dir: PathBuf,
}

impl ServiceSpec {
    pub fn new(
        role: Role,
        program: impl Into<String>,
        args: &[&str],
        dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            role,
            program: program.into(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            dir: dir.into(),
        }
    }

    /// The full command line, for operator-facing messages.
    pub fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Opaque reference to a launched child. Lives from successful launch
/// until confirmed termination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessHandle {
    pub role: Role,
    pub pid: u32,
}

/// Pushed on the supervisor's failure channel when a child exits without a
/// termination having been requested.
#[derive(Debug)]
pub enum SupervisorEvent {
    Exited {
        role: Role,
        /// `None` when the exit status could not be collected.
        status: Option<ExitStatus>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_display_as_lowercase_names() {
        assert_eq!(Role::Backend.to_string(), "backend");
        assert_eq!(Role::Frontend.to_string(), "frontend");
    }

    #[test]
    fn command_line_joins_program_and_args() {
        let spec = ServiceSpec::new(Role::Backend, "go", &["run", "cmd/webserver/main.go"], ".");
        assert_eq!(spec.command_line(), "go run cmd/webserver/main.go");
    }
}
