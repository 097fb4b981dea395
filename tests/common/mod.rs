//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    extract::ConnectInfo,
    http::{header, Request},
    middleware,
    response::Response,
    routing::get,
    Router,
};
use serde_json::Value;

use greenlight_guard::config::{AppConfig, RateLimitConfig};
use greenlight_guard::http::{guard, AppState};
use greenlight_guard::identity::{
    Identity, MemoryDirectory, PermissionStore, Permissions, StoreError, User, UserStore,
    SCOPE_AUTHENTICATION,
};
use greenlight_guard::security::{
    require_activated_user, require_authenticated_user, require_permission, PermissionGate,
    RateLimiter,
};

/// Activated user holding `movies:read`.
pub const ACTIVE_READER: &str = "BusinessManBusinessPlan123";
/// User whose account is not activated (holds `movies:read`).
pub const INACTIVE_READER: &str = "BusinessManBusinessPlanNOO";
/// Activated user without any permission.
pub const ACTIVE_NO_PERMS: &str = "BusinessManBusinessPlan000";

const FAR_FUTURE: u64 = 9_999_999_999;

fn user(id: i64, name: &str, activated: bool) -> User {
    User {
        id,
        name: name.to_string(),
        email: format!("user{id}@example.com"),
        activated,
    }
}

pub fn directory() -> MemoryDirectory {
    let directory = MemoryDirectory::new();

    directory.insert_user(user(1, "Ryan Gosling", true));
    directory.insert_token(ACTIVE_READER, 1, SCOPE_AUTHENTICATION, FAR_FUTURE);
    directory.grant(1, Permissions::new(["movies:read"]));

    directory.insert_user(user(2, "NOT Ryan Gosling", false));
    directory.insert_token(INACTIVE_READER, 2, SCOPE_AUTHENTICATION, FAR_FUTURE);
    directory.grant(2, Permissions::new(["movies:read"]));

    directory.insert_user(user(3, "Someone Else", true));
    directory.insert_token(ACTIVE_NO_PERMS, 3, SCOPE_AUTHENTICATION, FAR_FUTURE);

    directory
}

/// Collaborator whose backend is down.
pub struct FailingDirectory;

#[async_trait]
impl UserStore for FailingDirectory {
    async fn get_for_token(&self, _scope: &str, _token: &str) -> Result<User, StoreError> {
        Err(StoreError::Backend("connection refused".into()))
    }
}

#[async_trait]
impl PermissionStore for FailingDirectory {
    async fn get_all_for_user(&self, _user_id: i64) -> Result<Permissions, StoreError> {
        Err(StoreError::Backend("connection refused".into()))
    }
}

pub fn rate_limit(enabled: bool, burst: u32) -> RateLimitConfig {
    RateLimitConfig {
        enabled,
        requests_per_second: 2.0,
        burst_size: burst,
        ..RateLimitConfig::default()
    }
}

pub fn state(rate_limit: RateLimitConfig) -> AppState {
    let mut config = AppConfig::default();
    config.rate_limit = rate_limit;
    AppState::with_directory(&config, directory())
}

pub fn state_with(
    users: Arc<dyn UserStore>,
    permissions: Arc<dyn PermissionStore>,
) -> AppState {
    AppState::new(users, permissions, Arc::new(RateLimiter::new(&rate_limit(false, 1))))
}

async fn ok() -> &'static str {
    "ok"
}

async fn whoami(identity: Identity) -> String {
    match identity.user() {
        Some(user) => user.name.clone(),
        None => "anonymous".to_string(),
    }
}

async fn panicking() -> &'static str {
    panic!("something went wrong")
}

/// Routes mirroring each gate, wrapped in the full chain.
pub fn router(state: &AppState) -> Router {
    let can_read = PermissionGate::new("movies:read", state.permissions.clone());

    let routes = Router::new()
        .route("/v1/movies", get(ok))
        .route("/whoami", get(whoami))
        .route("/panic", get(panicking))
        .route(
            "/testauth/v1/movies",
            get(ok).route_layer(middleware::from_fn(require_authenticated_user)),
        )
        .route(
            "/testactivated/v1/movies",
            get(ok).route_layer(middleware::from_fn(require_activated_user)),
        )
        .route(
            "/testpermissions/v1/movies",
            get(ok).route_layer(middleware::from_fn_with_state(can_read, require_permission)),
        );

    guard(routes, state)
}

/// A GET request from a fixed client address.
pub fn get_request(uri: &str, authorization: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(value) = authorization {
        builder = builder.header(header::AUTHORIZATION, value);
    }
    let mut request = builder.body(Body::empty()).unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 50_000))));
    request
}

pub async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
