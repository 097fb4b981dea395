//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (rates > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::AppConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{field}: must be greater than zero")]
    NotPositive { field: &'static str },
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);

    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    let rl = &config.rate_limit;
    if rl.enabled {
        if rl.requests_per_second.is_nan() || rl.requests_per_second <= 0.0 {
            errors.push(ValidationError::NotPositive { field: "rate_limit.requests_per_second" });
        }
        if rl.burst_size == 0 {
            errors.push(ValidationError::NotPositive { field: "rate_limit.burst_size" });
        }
        if rl.sweep_interval_secs == 0 {
            errors.push(ValidationError::NotPositive { field: "rate_limit.sweep_interval_secs" });
        }
        if rl.idle_timeout_secs == 0 {
            errors.push(ValidationError::NotPositive { field: "rate_limit.idle_timeout_secs" });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
