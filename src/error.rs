//! Error taxonomy for the dispatch core.
//!
//! Two families:
//! - [`BuildError`]: raised while assembling the application. Fatal to startup.
//! - [`DispatchError`]: raised while serving one request. Local to that request's
//!   execution context; the scheduler maps it to a response and nothing shared is touched.

use std::error::Error as StdError;

use crate::routing::Method;

/// Boxed error returned by application handlers.
pub type HandlerError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors detected while building the route table, interceptor registry or rule set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    /// Same method and same path shape registered twice.
    #[error("duplicate route: {method} {path}")]
    DuplicateRoute { method: Method, path: String },

    /// Two interceptors share the same order value.
    #[error("duplicate interceptor order: {0}")]
    DuplicateInterceptorOrder(i32),

    #[error("invalid route template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    #[error("invalid path pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("invalid rate limit rule for {pattern}: {reason}")]
    InvalidRule { pattern: String, reason: String },

    /// Metered buckets spawn their refill task on the current tokio runtime.
    #[error("no tokio runtime available to start a background task")]
    NoRuntime,
}

/// Errors raised while a request passes through the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("no route for {method} {path}")]
    RouteNotFound { method: Method, path: String },

    #[error("method not supported: {0}")]
    MethodNotSupported(String),

    #[error("rate limited by rule {pattern}")]
    RateLimited { pattern: String },

    /// A response was already committed to the execution context.
    #[error("response already produced")]
    AlreadyResponded,

    /// `Next::run` was called past the terminal stage.
    #[error("middleware chain exhausted without a terminal stage")]
    ChainExhausted,

    #[error("handler failed: {0}")]
    Handler(#[source] HandlerError),
}

impl DispatchError {
    /// Wrap any handler-side error.
    pub fn handler<E>(err: E) -> Self
    where
        E: Into<HandlerError>,
    {
        DispatchError::Handler(err.into())
    }

    /// HTTP status the response-mapping layer uses for this error.
    pub fn status(&self) -> u16 {
        match self {
            DispatchError::RouteNotFound { .. } => 404,
            DispatchError::MethodNotSupported(_) => 405,
            DispatchError::RateLimited { .. } => 429,
            DispatchError::AlreadyResponded
            | DispatchError::ChainExhausted
            | DispatchError::Handler(_) => 500,
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;
