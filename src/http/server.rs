//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Assemble the middleware chain around the resource routes
//! - Bind server to listener with client address info
//! - Run the rate limiter sweeper alongside the server
//! - Stop both on shutdown

use axum::{middleware, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::http::recover::recover_panic_layer;
use crate::http::request::RequestUuid;
use crate::http::routes::api_routes;
use crate::identity::{MemoryDirectory, PermissionStore, UserStore};
use crate::lifecycle::Shutdown;
use crate::security::{authenticate, rate_limit, RateLimiter};

/// Collaborators shared by the middleware chain.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub limiter: Arc<RateLimiter>,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        permissions: Arc<dyn PermissionStore>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            users,
            permissions,
            limiter,
        }
    }

    /// State backed by a single in-memory directory.
    pub fn with_directory(config: &AppConfig, directory: MemoryDirectory) -> Self {
        let directory = Arc::new(directory);
        Self::new(
            directory.clone(),
            directory,
            Arc::new(RateLimiter::new(&config.rate_limit)),
        )
    }
}

/// Wrap `routes` in the request-processing chain.
///
/// Outermost first: panic recovery, request id and tracing, rate limiting,
/// authentication. Authorization gates sit on the individual routes.
pub fn guard(routes: Router, state: &AppState) -> Router {
    routes
        .layer(middleware::from_fn_with_state(state.users.clone(), authenticate))
        .layer(middleware::from_fn_with_state(state.limiter.clone(), rate_limit))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(RequestUuid))
        .layer(recover_panic_layer())
}

/// HTTP server for the resource API.
pub struct HttpServer {
    router: Router,
    state: AppState,
    config: AppConfig,
}

impl HttpServer {
    /// Create a new HTTP server serving the resource routes.
    pub fn new(config: AppConfig, state: AppState) -> Self {
        let router = guard(api_routes(state.permissions.clone()), &state);
        Self {
            router,
            state,
            config,
        }
    }

    /// Run the server until `shutdown` is triggered.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            rate_limit_enabled = self.state.limiter.is_enabled(),
            "HTTP server starting"
        );

        let sweeper = tokio::spawn(self.state.limiter.clone().run_sweeper(shutdown.subscribe()));

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        let mut stop = shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        // Covers the case where serve returned without a shutdown signal.
        shutdown.trigger();
        if let Err(e) = sweeper.await {
            tracing::error!(error = %e, "Rate limiter sweeper task failed");
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
