//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → AppConfig (validated, immutable)
//!     → lifecycle::startup (routing strategy, scheduler mode, rules, sessions)
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; rate limit rules can be replaced at runtime
//!   through `Application::replace_rate_limits`, everything else needs a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AppConfig, ListenerConfig, ObservabilityConfig, RateLimitConfig, RateLimitRuleConfig,
    RoutingConfig, SchedulerConfig, SessionConfig,
};
pub use validation::{validate_config, ValidationError};
