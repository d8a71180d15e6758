use anyhow::Result;
use std::time::Duration;
use timeup::commands::Cli;
use tracing_subscriber::EnvFilter;

/// Stdin reads park a blocking thread until the host closes the pipe.
const RUNTIME_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    let filter = if std::env::var("TIMEUP_DEBUG").is_ok() {
        EnvFilter::new("timeup=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("timeup=info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let runtime = tokio::runtime::Runtime::new()?;
    let result = runtime.block_on(Cli::menu());
    runtime.shutdown_timeout(RUNTIME_SHUTDOWN_TIMEOUT);
    result
}
