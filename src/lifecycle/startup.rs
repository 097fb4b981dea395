//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (metrics, sweeper via the server)
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener starts last (traffic only when ready)

use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::config::AppConfig;
use crate::http::{AppState, HttpServer};
use crate::identity::MemoryDirectory;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load identity fixtures from {path}: {source}")]
    Fixtures {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid metrics address '{0}'")]
    MetricsAddress(String),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the identity directory named by the config, or an empty one.
pub fn load_directory(config: &AppConfig) -> Result<MemoryDirectory, StartupError> {
    match &config.directory.fixtures_path {
        Some(path) => MemoryDirectory::load_from_file(path).map_err(|source| StartupError::Fixtures {
            path: path.display().to_string(),
            source,
        }),
        None => {
            tracing::warn!("No identity fixtures configured; every token will be rejected");
            Ok(MemoryDirectory::new())
        }
    }
}

/// Start every subsystem and serve until a termination signal arrives.
pub async fn run(config: AppConfig) -> Result<(), StartupError> {
    tracing::info!(
        bind_address = %config.listener.bind_address,
        rate_limit_enabled = config.rate_limit.enabled,
        requests_per_second = config.rate_limit.requests_per_second,
        burst_size = config.rate_limit.burst_size,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config
            .observability
            .metrics_address
            .parse()
            .map_err(|_| StartupError::MetricsAddress(config.observability.metrics_address.clone()))?;
        metrics::init_metrics(addr);
    }

    let directory = load_directory(&config)?;
    let state = AppState::with_directory(&config, directory);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        trigger.trigger();
    });

    HttpServer::new(config, state).run(listener, shutdown).await?;
    Ok(())
}
