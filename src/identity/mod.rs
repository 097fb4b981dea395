//! Identity subsystem.
//!
//! # Data Flow
//! ```text
//! Authorization: Bearer <token>
//!     → security::authenticate (syntax + format checks)
//!     → UserStore::get_for_token (token → User)
//!     → Identity attached to request extensions
//!     → security::gates (PermissionStore::get_all_for_user when needed)
//! ```
//!
//! # Design Decisions
//! - Stores are collaborators behind traits; this crate never owns persistence
//! - "Not found" is distinct from backend failure so callers can map 401 vs 500
//! - Identity is immutable once attached to a request

pub mod memory;

use std::collections::HashSet;
use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemoryDirectory;

/// Scope of tokens accepted by the identity resolver.
pub const SCOPE_AUTHENTICATION: &str = "authentication";

/// Length of every token the service issues.
pub const TOKEN_LENGTH: usize = 26;

/// A registered user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub activated: bool,
}

/// The identity resolved for a single request.
///
/// Inserted into request extensions by the authenticate middleware. Handlers
/// and gates extract it directly; a request that never went through
/// authentication extracts as [`Identity::Anonymous`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Identity {
    #[default]
    Anonymous,
    User(Arc<User>),
}

impl Identity {
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Identity::Anonymous)
    }

    pub fn user(&self) -> Option<&User> {
        match self {
            Identity::Anonymous => None,
            Identity::User(user) => Some(user),
        }
    }
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Identity>().cloned().unwrap_or_default())
    }
}

/// Permission codes granted to a user, e.g. `movies:read`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permissions(HashSet<String>);

impl Permissions {
    pub fn new<I, T>(codes: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self(codes.into_iter().map(Into::into).collect())
    }

    /// Exact-match membership test.
    pub fn includes(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Errors returned by identity and permission collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record not found")]
    RecordNotFound,

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Resolves bearer tokens to users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up the user owning a non-expired token with the given scope.
    ///
    /// Returns [`StoreError::RecordNotFound`] when no such token exists.
    async fn get_for_token(&self, scope: &str, token: &str) -> Result<User, StoreError>;
}

/// Lists the permission codes held by a user.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn get_all_for_user(&self, user_id: i64) -> Result<Permissions, StoreError>;
}
