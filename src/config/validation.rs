//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("{field}: unsupported value '{value}'")]
    Unsupported { field: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "listener.bind_address",
            value: config.listener.bind_address.clone(),
        });
    }

    if !matches!(config.listener.public_scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::Unsupported {
            field: "listener.public_scheme",
            value: config.listener.public_scheme.clone(),
        });
    }

    if config.upstream.timeout_secs == 0 {
        errors.push(ValidationError::ZeroValue("upstream.timeout_secs"));
    }
    if config.upstream.user_agent.trim().is_empty() {
        errors.push(ValidationError::Empty("upstream.user_agent"));
    }
    if config.upstream.max_body_size == 0 {
        errors.push(ValidationError::ZeroValue("upstream.max_body_size"));
    }
    if config.realtime.session_queue == 0 {
        errors.push(ValidationError::ZeroValue("realtime.session_queue"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroValue("security.max_body_size"));
    }

    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::Unsupported {
            field: "observability.log_format",
            value: config.observability.log_format.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
