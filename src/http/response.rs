//! Error responses.
//!
//! # Responsibilities
//! - Wrap error payloads in a `{"error": ...}` JSON envelope
//! - Map chain failures to stable status codes and messages
//! - Log server-side faults without leaking their detail to the client
//!
//! # Design Decisions
//! - Every failure the chain produces is JSON, including recovered panics
//! - Serialization failure degrades to a bare 500 instead of panicking

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::identity::StoreError;
use crate::observability::metrics;

/// Message returned for every server-side fault.
pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

#[derive(Serialize)]
struct ErrorEnvelope<T> {
    error: T,
}

/// Write `payload` as `{"error": payload}` with the given status.
///
/// `payload` may be a plain message or any structured value.
pub fn error_response<T: Serialize>(status: StatusCode, payload: T) -> Response {
    match serde_json::to_vec(&ErrorEnvelope { error: payload }) {
        Ok(body) => (
            status,
            [(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, status = %status, "Failed to serialize error response");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Failures produced by the request-processing chain.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("invalid or missing authentication token")]
    InvalidAuthenticationToken,

    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    #[error("your user account must be activated to access this resource")]
    InactiveAccount,

    #[error("your user account doesn't have the necessary permissions to access this resource")]
    NotPermitted,

    #[error("store failure: {0}")]
    Store(#[from] StoreError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InvalidAuthenticationToken | ApiError::AuthenticationRequired => {
                StatusCode::UNAUTHORIZED
            }
            ApiError::InactiveAccount | ApiError::NotPermitted => StatusCode::FORBIDDEN,
            ApiError::Store(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn reason(&self) -> &'static str {
        match self {
            ApiError::RateLimitExceeded => "rate_limited",
            ApiError::InvalidAuthenticationToken => "invalid_token",
            ApiError::AuthenticationRequired => "unauthenticated",
            ApiError::InactiveAccount => "inactive",
            ApiError::NotPermitted => "forbidden",
            ApiError::Store(_) | ApiError::Internal(_) => "server_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        metrics::record_rejection(self.reason());

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
            return error_response(status, SERVER_ERROR_MESSAGE);
        }

        let mut response = error_response(status, self.to_string());
        if matches!(self, ApiError::InvalidAuthenticationToken) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}
