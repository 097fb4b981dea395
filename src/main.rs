//! greenlight-guard server binary.
//!
//! ```text
//! request → recover panic → rate limit → authenticate → gates → handler
//! ```

use std::path::PathBuf;

use clap::Parser;

use greenlight_guard::config::{load_config, AppConfig};
use greenlight_guard::lifecycle::startup;
use greenlight_guard::observability::logging;

#[derive(Parser)]
#[command(name = "greenlight-guard")]
#[command(about = "Guarded resource API server", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener bind address
    #[arg(long)]
    bind: Option<String>,

    /// Disable rate limiting
    #[arg(long)]
    no_rate_limit: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if cli.no_rate_limit {
        config.rate_limit.enabled = false;
    }

    logging::init_logging(&config.observability);
    tracing::info!("greenlight-guard v{} starting", env!("CARGO_PKG_VERSION"));

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
