//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → tracing events (route misses, rejections, sweeps, startup summary)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → logging.rs subscriber (stdout, filtered by RUST_LOG or config)
//!     → Prometheus exporter (own HTTP listener, scrape)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every log line a request produces
//! - Metrics are cheap (atomic increments) and optional

pub mod logging;
pub mod metrics;
