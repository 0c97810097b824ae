//! Request-processing pipeline.
//!
//! # Data Flow
//! ```text
//! RequestContext (request, response builder, params)
//!     → chain.rs: stage 0 → stage 1 → ... (each may stop here)
//!     → interceptor.rs: pre_handle* → next → post_handle* → after_completion*
//!     → dispatch.rs: route lookup → handler
//!     ← Outcome::Ready(reply) or Outcome::Pending(deferred + continuations)
//!     ← unwinds back through every stage that called next
//! ```
//!
//! # Design Decisions
//! - The chain is an immutable slice; `Next` is a cursor, nothing is mutated per request
//! - "Maybe deferred" is an explicit enum, not a runtime-specific future type
//! - No implicit try/catch around stages; interceptors always get their cleanup call

pub mod chain;
pub mod context;
pub mod dispatch;
pub mod interceptor;
pub mod message;
pub mod outcome;

pub use chain::{from_fn, Chain, FnMiddleware, Middleware, Next};
pub use context::{RequestContext, X_REQUEST_ID};
pub use dispatch::RoutingStage;
pub use interceptor::{Interceptor, InterceptorRegistry, InterceptorStage};
pub use message::{Headers, Json, Reply, Request, Response, ResponseBuilder};
pub use outcome::{settle, Continuation, Deferred, Outcome, Responder};
