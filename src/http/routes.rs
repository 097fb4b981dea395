//! Resource routes.
//!
//! The movie handlers are placeholders for the resource API; they exist so
//! the gates have something to guard.

use std::sync::Arc;

use axum::{
    http::{Method, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http::response::error_response;
use crate::identity::{Identity, PermissionStore};
use crate::security::{require_permission, PermissionGate};

pub const MOVIES_READ: &str = "movies:read";
pub const MOVIES_WRITE: &str = "movies:write";

/// Build the resource routes with their authorization gates.
pub fn api_routes(permissions: Arc<dyn PermissionStore>) -> Router {
    let can_read = PermissionGate::new(MOVIES_READ, permissions.clone());
    let can_write = PermissionGate::new(MOVIES_WRITE, permissions);

    Router::new()
        .route("/v1/healthcheck", get(healthcheck))
        .route(
            "/v1/movies",
            get(list_movies)
                .route_layer(middleware::from_fn_with_state(can_read, require_permission)),
        )
        .route(
            "/v1/movies",
            post(create_movie)
                .route_layer(middleware::from_fn_with_state(can_write, require_permission)),
        )
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
}

async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({
        "status": "available",
        "system_info": {
            "version": env!("CARGO_PKG_VERSION"),
        },
    }))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieInput {
    pub title: String,
    #[serde(default)]
    pub year: i32,
    #[serde(default)]
    pub genres: Vec<String>,
}

async fn list_movies() -> Json<serde_json::Value> {
    Json(json!({ "movies": [] }))
}

async fn create_movie(identity: Identity, Json(input): Json<MovieInput>) -> Response {
    if let Some(user) = identity.user() {
        tracing::info!(user_id = user.id, title = %input.title, "Movie submitted");
    }
    (StatusCode::CREATED, Json(json!({ "movie": input }))).into_response()
}

async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "the requested resource could not be found")
}

async fn method_not_allowed(method: Method) -> Response {
    error_response(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("the {method} method is not supported for this resource"),
    )
}
