//! HTTP transport adapter.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum, x-request-id assigned, trace span)
//!     → request.rs (axum parts + buffered body → core Request)
//!     → Scheduler::handle
//!     → response.rs (core Response → axum response)
//!     → Send to client (x-request-id propagated)
//! ```
//!
//! Connection handling and framing stay with axum/hyper; this module only
//! translates values at the boundary.

pub mod request;
pub mod response;
pub mod server;

pub use server::HttpServer;
