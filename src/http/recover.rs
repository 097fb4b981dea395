//! Panic recovery.
//!
//! Outermost layer of the chain: a panic anywhere below it becomes a JSON
//! 500 response and the connection is marked for closing.

use std::any::Any;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use tower_http::catch_panic::CatchPanicLayer;

use crate::http::response::{error_response, SERVER_ERROR_MESSAGE};
use crate::observability::metrics;

/// Signature of the panic handler installed by [`recover_panic_layer`].
pub type PanicHandler = fn(Box<dyn Any + Send + 'static>) -> Response;

/// Layer that converts handler panics into 500 responses.
pub fn recover_panic_layer() -> CatchPanicLayer<PanicHandler> {
    CatchPanicLayer::custom(recover_panic as PanicHandler)
}

/// Build the response for a recovered panic.
pub fn recover_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let description = panic_description(err.as_ref());
    tracing::error!(panic = %description, "Recovered from handler panic");
    metrics::record_rejection("panic");

    let mut response = error_response(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR_MESSAGE);
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

fn panic_description(err: &(dyn Any + Send)) -> String {
    if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else {
        "unknown panic payload".to_string()
    }
}
