//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML, and every
//! section has a default so a minimal (or absent) file is valid.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::routing::MatchStrategy;
use crate::scheduler::SchedulingMode;
use crate::security::BucketStrategy;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration for the HTTP adapter.
    pub listener: ListenerConfig,

    pub scheduler: SchedulerConfig,

    pub routing: RoutingConfig,

    /// Path-scoped rate limit rules.
    pub rate_limit: RateLimitConfig,

    pub session: SessionConfig,

    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Requests with larger bodies are refused with 413.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// `continuation` (default, async task per request) or `task` (blocking
    /// pool, capped by `max_blocking_threads`).
    pub mode: SchedulingMode,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Pattern index: `trie` or `linear`.
    pub strategy: MatchStrategy,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Evaluated in order; the first rule whose pattern matches decides.
    pub rules: Vec<RateLimitRuleConfig>,
}

/// One `[[rate_limit.rules]]` entry.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitRuleConfig {
    /// Path pattern (`/api/**`, `/user/*`, ...).
    pub pattern: String,

    #[serde(default)]
    pub strategy: BucketStrategy,

    pub capacity: u32,

    /// Reset interval for `fixed`, tick for `metered`.
    pub interval_ms: u64,
}

impl RateLimitRuleConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Session store and sentinel configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    pub enabled: bool,

    /// Sentinel sweep period in seconds.
    pub sweep_interval_secs: u64,

    /// Default inactivity timeout for new sessions in seconds.
    pub max_inactive_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sweep_interval_secs: 60,
            max_inactive_secs: 1800,
        }
    }
}

impl SessionConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn max_inactive(&self) -> Duration {
        Duration::from_secs(self.max_inactive_secs)
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.scheduler.mode, SchedulingMode::Continuation);
        assert_eq!(config.routing.strategy, MatchStrategy::Trie);
        assert!(config.rate_limit.rules.is_empty());
        assert!(config.session.enabled);
    }

    #[test]
    fn parses_every_section() {
        let config: AppConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:3000"

            [scheduler]
            mode = "task"

            [routing]
            strategy = "linear"

            [[rate_limit.rules]]
            pattern = "/api/**"
            strategy = "metered"
            capacity = 10
            interval_ms = 100

            [[rate_limit.rules]]
            pattern = "/login"
            capacity = 5
            interval_ms = 60000

            [session]
            enabled = false

            [observability]
            log_level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.bind_address, "127.0.0.1:3000");
        assert_eq!(config.scheduler.mode, SchedulingMode::Task);
        assert_eq!(config.routing.strategy, MatchStrategy::Linear);
        assert_eq!(config.rate_limit.rules.len(), 2);
        assert_eq!(config.rate_limit.rules[0].strategy, BucketStrategy::Metered);
        assert_eq!(config.rate_limit.rules[1].strategy, BucketStrategy::Fixed);
        assert_eq!(config.rate_limit.rules[1].interval(), Duration::from_secs(60));
        assert!(!config.session.enabled);
        assert_eq!(config.observability.log_level, "debug");
    }
}
