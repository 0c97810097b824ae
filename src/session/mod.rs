//! Session storage and its concurrency contract.
//!
//! # Data Flow
//! ```text
//! Request context:  SessionLock::read ──► whole pipeline pass ──► release
//!                                            │
//!                                            └─► ctx.sessions(): get / put / remove
//!
//! Sentinel (every sweep_interval):
//!     SessionLock::write ──► store.evict_expired(now) ──► release
//! ```
//!
//! # Design Decisions
//! - One process-wide reader/writer lock, held for the whole pipeline pass
//! - A sweep stalls new requests for its duration; sweeps are short and periodic
//! - Attribute TTLs are checked on read and enforced on sweep

pub mod lock;
pub mod sentinel;
pub mod store;

pub use lock::SessionLock;
pub use sentinel::Sentinel;
pub use store::{MemorySessionStore, Session, SessionStore, SweepReport, DEFAULT_MAX_INACTIVE};
