//! Bearer token authentication.
//!
//! Runs for every request. A missing `Authorization` header resolves to the
//! anonymous identity; a present header must carry a well-formed bearer token
//! that resolves to a user, otherwise the request is rejected with 401.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::http::response::ApiError;
use crate::identity::{Identity, StoreError, UserStore, SCOPE_AUTHENTICATION, TOKEN_LENGTH};

/// Extract the token from an `Authorization` header value.
///
/// The value must be exactly two space-separated fields, the first being
/// the literal `Bearer`.
pub fn parse_bearer(value: &str) -> Option<&str> {
    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some("Bearer"), Some(token), None) => Some(token),
        _ => None,
    }
}

/// Check token shape before any lookup.
pub fn is_well_formed_token(token: &str) -> bool {
    token.len() == TOKEN_LENGTH && token.bytes().all(|b| b.is_ascii_alphanumeric())
}

async fn resolve_identity(users: &dyn UserStore, headers: &HeaderMap) -> Result<Identity, ApiError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(Identity::Anonymous);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(parse_bearer)
        .ok_or(ApiError::InvalidAuthenticationToken)?;

    if !is_well_formed_token(token) {
        return Err(ApiError::InvalidAuthenticationToken);
    }

    match users.get_for_token(SCOPE_AUTHENTICATION, token).await {
        Ok(user) => Ok(Identity::User(Arc::new(user))),
        Err(StoreError::RecordNotFound) => Err(ApiError::InvalidAuthenticationToken),
        Err(e) => Err(e.into()),
    }
}

/// Middleware attaching the request's [`Identity`].
pub async fn authenticate(
    State(users): State<Arc<dyn UserStore>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let resolved = resolve_identity(users.as_ref(), request.headers()).await;
    let mut response = match resolved {
        Ok(identity) => {
            if let Identity::User(user) = &identity {
                tracing::debug!(user_id = user.id, "Authenticated request");
            }
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(err) => {
            tracing::debug!(error = %err, "Authentication rejected");
            err.into_response()
        }
    };

    response
        .headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    response
}
