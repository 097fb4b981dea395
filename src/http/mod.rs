//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, connect info)
//!     → recover.rs (panic → 500, Connection: close)
//!     → request.rs (x-request-id)
//!     → security (rate limit → authenticate → gates)
//!     → routes.rs (resource handlers)
//!     → response.rs (JSON error envelope on any failure)
//! ```

pub mod recover;
pub mod request;
pub mod response;
pub mod routes;
pub mod server;

pub use request::{RequestUuid, X_REQUEST_ID};
pub use response::{error_response, ApiError, SERVER_ERROR_MESSAGE};
pub use server::{guard, AppState, HttpServer};
