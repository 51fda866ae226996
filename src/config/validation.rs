//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (worker count, queue capacity, timeouts > 0)
//! - Every worker lane needs a queue slot: queue_capacity >= workers.count
//! - Check the bind address and TLS paths are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServerConfig → Result<(), Vec<ValidationError>>
//! - Runs before a server is constructed

use std::net::SocketAddr;

use crate::config::schema::{ListenerConfig, ServerConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("workers.count must be at least 1")]
    ZeroWorkers,
    #[error("workers.queue_capacity must be at least 1")]
    ZeroQueueCapacity,
    #[error("workers.queue_capacity ({capacity}) must be at least workers.count ({workers})")]
    QueueSmallerThanWorkers { capacity: usize, workers: usize },
    #[error("listener.max_connections must be at least 1")]
    ZeroMaxConnections,
    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),
    #[error("listener.tls.{0} must not be empty")]
    EmptyTlsPath(&'static str),
    #[error("timeouts.{0} must be greater than zero when set")]
    ZeroTimeout(&'static str),
    #[error("limits.{0} must be at least 1")]
    ZeroLimit(&'static str),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &ServerConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.workers.count == 0 {
        errors.push(ValidationError::ZeroWorkers);
    }
    if config.workers.queue_capacity == 0 {
        errors.push(ValidationError::ZeroQueueCapacity);
    } else if config.workers.queue_capacity < config.workers.count {
        errors.push(ValidationError::QueueSmallerThanWorkers {
            capacity: config.workers.queue_capacity,
            workers: config.workers.count,
        });
    }
    for listener in std::iter::once(&config.listener).chain(&config.additional_listeners) {
        validate_listener(listener, &mut errors);
    }

    let timeouts = [
        ("read_secs", config.timeouts.read_secs),
        ("handshake_secs", config.timeouts.handshake_secs),
        ("handler_secs", config.timeouts.handler_secs),
    ];
    for (name, value) in timeouts {
        if value == Some(0) {
            errors.push(ValidationError::ZeroTimeout(name));
        }
    }

    if config.limits.max_line_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("max_line_bytes"));
    }
    if config.limits.max_headers == 0 {
        errors.push(ValidationError::ZeroLimit("max_headers"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_listener(listener: &ListenerConfig, errors: &mut Vec<ValidationError>) {
    if listener.max_connections == 0 {
        errors.push(ValidationError::ZeroMaxConnections);
    }
    if listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            listener.bind_address.clone(),
        ));
    }
    if let Some(tls) = &listener.tls {
        if tls.cert_path.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("cert_path"));
        }
        if tls.key_path.trim().is_empty() {
            errors.push(ValidationError::EmptyTlsPath("key_path"));
        }
    }
}
