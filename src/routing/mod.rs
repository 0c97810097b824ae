//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     register(method, template, handler)
//!     → template.rs (parse segments, collect variable names)
//!     → literal template? → exact index (method → path → route)
//!     → otherwise         → pattern index (trie.rs or linear.rs)
//!     → build() freezes the table
//!
//! Per request:
//!     (method, raw path)
//!     → path.rs (strip query + trailing slash)
//!     → exact index probe (O(1))
//!     → pattern index walk
//!     → RouteMatch { route, params } or RouteNotFound
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex anywhere: segment comparisons only
//! - Duplicate bindings fail the build instead of shadowing
//! - Pattern precedence is literal > variable > wildcard, segment by segment

pub mod linear;
pub mod method;
pub mod path;
pub mod pattern;
pub mod route;
pub mod table;
pub mod template;
pub mod trie;

pub use method::Method;
pub use pattern::PathPattern;
pub use route::{Handler, PathParams, Route, RouteMatch};
pub use table::{Controller, MatchStrategy, RouteTable, RouteTableBuilder};
