//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (after panic recovery):
//!     → rate_limit.rs (per-IP token bucket, 429)
//!     → authenticate.rs (bearer token → Identity, 401)
//!     → gates.rs (authenticated 401, activated 403, permission 403)
//!     → resource handler
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any security check failure
//! - Each layer handles only its own failures and passes everything else through
//! - Limiter state is an injected struct, never a global

pub mod authenticate;
pub mod gates;
pub mod rate_limit;

pub use authenticate::authenticate;
pub use gates::{require_activated_user, require_authenticated_user, require_permission, PermissionGate};
pub use rate_limit::{rate_limit, RateLimiter};
