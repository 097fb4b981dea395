//! Per-client-IP rate limiting.

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::RateLimitConfig;
use crate::http::response::ApiError;

/// A simple token bucket rate limiter.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.duration_since(self.last_update).as_secs_f64();

        // Refill tokens
        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Rate state tracked for one client IP.
#[derive(Debug)]
struct Client {
    bucket: TokenBucket,
    last_seen: Instant,
}

/// Shared per-IP limiter state.
///
/// One mutex guards the whole map. Request-path critical sections cover only
/// lookup-or-create plus the bucket arithmetic, and the sweep holds the lock
/// for a single `retain` pass, so neither side can starve the other.
pub struct RateLimiter {
    clients: Mutex<HashMap<IpAddr, Client>>,
    enabled: bool,
    rps: f64,
    burst: f64,
    sweep_interval: Duration,
    idle_timeout: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            enabled: config.enabled,
            rps: config.requests_per_second,
            burst: config.burst_size as f64,
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn lock_clients(&self) -> MutexGuard<'_, HashMap<IpAddr, Client>> {
        // Bucket math cannot leave the map inconsistent, so a poisoned lock is still usable.
        self.clients.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Try to admit one request from `ip`. Consumed tokens are never refunded.
    pub fn check(&self, ip: IpAddr) -> bool {
        if !self.enabled {
            return true;
        }

        let now = Instant::now();
        let mut clients = self.lock_clients();
        let client = clients.entry(ip).or_insert_with(|| Client {
            bucket: TokenBucket::new(self.burst, now),
            last_seen: now,
        });
        client.last_seen = now;

        client.bucket.try_acquire(self.burst, self.rps, now)
    }

    /// Evict clients not seen within the idle timeout. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let idle_timeout = self.idle_timeout;

        let mut clients = self.lock_clients();
        let before = clients.len();
        clients.retain(|_, client| now.duration_since(client.last_seen) <= idle_timeout);
        before - clients.len()
    }

    /// Number of client IPs currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.lock_clients().len()
    }

    /// Periodically sweep idle clients until shutdown is signalled.
    pub async fn run_sweeper(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        if !self.enabled {
            tracing::info!("Rate limiting disabled, sweeper not started");
            return;
        }

        tracing::info!(
            interval_secs = self.sweep_interval.as_secs(),
            idle_timeout_secs = self.idle_timeout.as_secs(),
            "Rate limiter sweeper starting"
        );

        let mut ticker = time::interval(self.sweep_interval);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.sweep();
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining = self.tracked_clients(), "Swept idle rate limit clients");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limiter sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

/// Middleware admitting requests while the client's bucket has tokens.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if !limiter.is_enabled() {
        return Ok(next.run(request).await);
    }

    let ip = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .ok_or_else(|| ApiError::Internal("missing client address".into()))?;

    if !limiter.check(ip) {
        tracing::warn!(client = %ip, "Rate limit exceeded");
        return Err(ApiError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}
