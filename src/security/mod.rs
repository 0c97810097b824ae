//! Admission control.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → path_guard.rs (reject `..` segments with 400)
//!     → rate_limit.rs (first matching rule's bucket, 429 when empty)
//!         → token_bucket.rs (fixed-window or metered try_acquire)
//!     → rest of the chain
//! ```
//!
//! # Design Decisions
//! - Fail closed: a rejected request never reaches interceptors or routing
//! - Acquisition never blocks; the common path is a single CAS
//! - Rule sets are replaced whole, buckets are never shared between rule sets

pub mod path_guard;
pub mod rate_limit;
pub mod token_bucket;

pub use path_guard::PathGuard;
pub use rate_limit::{BucketStrategy, RateLimitRule, RateLimitStage, RateLimiter};
pub use token_bucket::{FixedWindowBucket, MeteredBucket, TokenBucket};
