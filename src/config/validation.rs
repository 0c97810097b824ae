//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (capacities and intervals > 0, addresses parse)
//! - Check rate limit patterns are well formed
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::AppConfig;
use crate::routing::PathPattern;

/// One semantic problem, located by its dotted field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("not a socket address: {:?}", config.listener.bind_address),
        ));
    }
    if config.listener.max_body_bytes == 0 {
        errors.push(ValidationError::new("listener.max_body_bytes", "must be > 0"));
    }

    for (i, rule) in config.rate_limit.rules.iter().enumerate() {
        let field = |name: &str| format!("rate_limit.rules[{i}].{name}");
        if let Err(e) = PathPattern::parse(&rule.pattern) {
            errors.push(ValidationError::new(field("pattern"), e.to_string()));
        }
        if rule.capacity == 0 {
            errors.push(ValidationError::new(field("capacity"), "must be > 0"));
        }
        if rule.interval_ms == 0 {
            errors.push(ValidationError::new(field("interval_ms"), "must be > 0"));
        }
    }

    if config.session.enabled {
        if config.session.sweep_interval_secs == 0 {
            errors.push(ValidationError::new("session.sweep_interval_secs", "must be > 0"));
        }
        if config.session.max_inactive_secs == 0 {
            errors.push(ValidationError::new("session.max_inactive_secs", "must be > 0"));
        }
    }

    let obs = &config.observability;
    if !matches!(
        obs.log_level.as_str(),
        "trace" | "debug" | "info" | "warn" | "error"
    ) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("unknown level {:?}", obs.log_level),
        ));
    }
    if obs.metrics_enabled && obs.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("not a socket address: {:?}", obs.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
