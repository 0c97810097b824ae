//! Embeddable HTTP request-processing core.
//!
//! Routes a parsed request to a pre-bound handler through an ordered
//! middleware chain, with path-scoped interceptors, token-bucket admission
//! control and a scheduler that owns the session lock discipline.

// Core
pub mod error;
pub mod pipeline;
pub mod routing;
pub mod scheduler;

// Admission control and shared state
pub mod security;
pub mod session;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

// Transport adapter
pub mod http;

pub use config::AppConfig;
pub use error::{BuildError, DispatchError, DispatchResult};
pub use http::HttpServer;
pub use lifecycle::{AppBuilder, Application, Shutdown};
pub use pipeline::{Interceptor, Middleware, Next, Outcome, Reply, Request, RequestContext, Response};
pub use routing::{Controller, Handler, MatchStrategy, Method, RouteTableBuilder};
pub use scheduler::{Scheduler, SchedulingMode};
