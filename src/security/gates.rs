//! Authorization gates.
//!
//! Each gate assumes authentication already ran and nests the one before it:
//! permission ⊃ activation ⊃ authentication. A request therefore always
//! fails with 401 before it can fail with 403.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::http::response::ApiError;
use crate::identity::{Identity, PermissionStore, User};

/// The user behind `identity`, or 401 for anonymous requests.
pub fn authenticated_user(identity: &Identity) -> Result<&User, ApiError> {
    identity.user().ok_or(ApiError::AuthenticationRequired)
}

/// An authenticated user whose account is activated, or 403.
pub fn activated_user(identity: &Identity) -> Result<&User, ApiError> {
    let user = authenticated_user(identity)?;
    if !user.activated {
        return Err(ApiError::InactiveAccount);
    }
    Ok(user)
}

pub async fn require_authenticated_user(
    identity: Identity,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    authenticated_user(&identity)?;
    Ok(next.run(request).await)
}

pub async fn require_activated_user(
    identity: Identity,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    activated_user(&identity)?;
    Ok(next.run(request).await)
}

/// State for [`require_permission`]: the required code and where grants live.
#[derive(Clone)]
pub struct PermissionGate {
    code: Arc<str>,
    permissions: Arc<dyn PermissionStore>,
}

impl PermissionGate {
    pub fn new(code: &str, permissions: Arc<dyn PermissionStore>) -> Self {
        Self {
            code: Arc::from(code),
            permissions,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }
}

pub async fn require_permission(
    State(gate): State<PermissionGate>,
    identity: Identity,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let user = activated_user(&identity)?;

    let permissions = gate.permissions.get_all_for_user(user.id).await?;
    if !permissions.includes(gate.code()) {
        tracing::debug!(user_id = user.id, permission = gate.code(), "Permission denied");
        return Err(ApiError::NotPermitted);
    }

    Ok(next.run(request).await)
}
