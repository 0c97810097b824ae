//! Request scheduling.
//!
//! # Data Flow
//! ```text
//! Transport ──► Scheduler::dispatch(request, sink)
//!                   │
//!                   ├─ Task mode:          spawn_blocking ─► blocking_read(session lock)
//!                   └─ Continuation mode:  spawn          ─► read(session lock).await
//!                   │
//!                   ▼
//!               RequestContext ─► Chain::execute ─► Outcome (Ready | Pending → resolve)
//!                   │
//!                   ▼
//!               finish: committed response / reply / error → Response ─► sink
//! ```
//!
//! # Design Decisions
//! - Both modes share one chain; ordering and short-circuit behave identically
//! - Errors never escape: anything left after the chain maps to a status code
//! - The read side of the session lock spans the whole pass
//! - Continuation is the default; Task mode is bounded by the blocking pool size

pub mod executor;

pub use executor::{ResponseSink, Scheduler, SchedulingMode};
