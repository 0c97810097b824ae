//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → AppBuilder (routes, middleware, interceptors, rules)
//!     → build() → Application (frozen chain + scheduler)
//!     → spawn sentinel → start listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → broadcast → server drains, sentinel exits
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then core, then listeners
//! - Registration errors abort startup; nothing is silently overridden
//! - Listeners start last (traffic only when ready)

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
pub use startup::{AppBuilder, Application};
