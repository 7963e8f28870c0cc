//! Binary entry point - the composition root.
//!
//! Platform-specific probing and termination are selected here once; the
//! lifecycle controller itself is platform-blind. Exit codes: 0 after a
//! clean interrupt shutdown, non-zero whenever startup aborts or a child
//! dies unexpectedly.

use std::time::Duration;

use clap::Parser;

use aks_dev::config::DevConfig;
use aks_dev::error::OrchestratorError;
use aks_dev::lifecycle::LifecycleController;
use aks_dev::parser::Cli;
use aks_dev::probe::detect_prober;
use aks_dev::reclaim::RetryBudget;
use aks_dev::supervisor::DevSupervisor;
use aks_dev::terminate::detect_terminator;

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<(), OrchestratorError> {
    let mut config = DevConfig::new(&cli.root)?;
    if let Some(port) = cli.backend_port {
        config.backend_port = port;
    }
    config.budget = RetryBudget {
        attempts: cli.retries,
        settle: Duration::from_millis(cli.settle_ms),
    };

    let prober = detect_prober()?;
    let terminator = detect_terminator();
    let (supervisor, events) = DevSupervisor::new();

    let controller = LifecycleController::new(config, prober, terminator, supervisor, events);
    controller.run().await
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
