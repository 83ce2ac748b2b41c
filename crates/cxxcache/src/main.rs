//! Binary entrypoint: parses the CLI, initializes logging, and dispatches.

use clap::Parser;
use cxxcache::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    cxxcache_domain::infra::logging::set_log_fn(cxxcache_infrastructure::tracing_log_fn);
    let _logging_guard = cxxcache::logging_init::init(std::env::var("CXXCACHE_LOG_DIR").ok().as_deref());

    let cli = Cli::parse();
    if let Err(err) = cxxcache::run(cli).await {
        tracing::error!(error = %err, "cxxcache exited with an error");
        std::process::exit(1);
    }
    Ok(())
}
