//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (rate > 0, burst > 0, parsable addresses)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>

use std::fmt;
use std::net::SocketAddr;

use super::schema::AppConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn error(field: &'static str, message: impl Into<String>) -> ValidationError {
    ValidationError {
        field,
        message: message.into(),
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let control = &config.control;
    if control.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(error(
            "control.bind_address",
            format!("'{}' is not a socket address", control.bind_address),
        ));
    }
    if !control.path.starts_with('/') {
        errors.push(error("control.path", "must start with '/'"));
    }
    let rate = control.rate_limit.requests_per_second;
    if !rate.is_finite() || rate <= 0.0 {
        errors.push(error(
            "control.rate_limit.requests_per_second",
            "must be a positive number",
        ));
    }
    if control.rate_limit.burst == 0 {
        errors.push(error("control.rate_limit.burst", "must be at least 1"));
    }
    if control.bearer_token.as_deref().is_some_and(str::is_empty) {
        errors.push(error("control.bearer_token", "must not be empty when set"));
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(error(
            "observability.metrics_address",
            format!("'{}' is not a socket address", observability.metrics_address),
        ));
    }

    if config.double_tap.exit_code < 0 || config.double_tap.exit_code > 255 {
        errors.push(error("double_tap.exit_code", "must be between 0 and 255"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
