//! Request-processing chain guarding a resource API.
//!
//! Every request passes panic recovery, per-IP rate limiting, bearer token
//! authentication and, per route, authorization gates before it reaches a
//! resource handler.

pub mod config;
pub mod http;
pub mod identity;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::AppConfig;
pub use http::{guard, AppState, HttpServer};
pub use identity::{Identity, MemoryDirectory, PermissionStore, Permissions, StoreError, User, UserStore};
pub use lifecycle::Shutdown;
pub use security::RateLimiter;
