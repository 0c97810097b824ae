//! Middleware chain.
//!
//! The chain is an immutable list of stages built once at startup. Each stage
//! receives a [`Next`] cursor over the stages after it; calling
//! [`Next::run`] continues the pipeline, not calling it short-circuits and the
//! stage's own return value becomes the result. The terminal stage (routing)
//! sits last and never calls `next`.
//!
//! Stages get no implicit error handling: an `Err` from `next.run` propagates
//! through every stage that simply returns it. A stage that wants to see
//! failures wraps its own `next` call (see [`settle`](super::outcome::settle)).

use std::fmt;
use std::sync::Arc;

use crate::error::{DispatchError, DispatchResult};
use crate::pipeline::context::RequestContext;
use crate::pipeline::outcome::Outcome;

/// A request-processing stage.
pub trait Middleware: Send + Sync + 'static {
    /// Name used in logs.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    fn invoke(&self, ctx: &mut RequestContext, next: Next<'_>) -> DispatchResult<Outcome>;
}

/// Cursor over the remainder of the chain.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Middleware>],
}

impl<'a> Next<'a> {
    /// Run the rest of the chain.
    pub fn run(self, ctx: &mut RequestContext) -> DispatchResult<Outcome> {
        match self.stages.split_first() {
            Some((stage, rest)) => stage.invoke(ctx, Next { stages: rest }),
            None => Err(DispatchError::ChainExhausted),
        }
    }

    /// Number of stages still ahead, terminal included.
    pub fn remaining(&self) -> usize {
        self.stages.len()
    }
}

/// The assembled, immutable pipeline.
#[derive(Clone)]
pub struct Chain {
    stages: Arc<[Arc<dyn Middleware>]>,
}

impl Chain {
    /// Link `stages` in order and append `terminal` last.
    pub fn new(mut stages: Vec<Arc<dyn Middleware>>, terminal: Arc<dyn Middleware>) -> Self {
        stages.push(terminal);
        Self {
            stages: stages.into(),
        }
    }

    pub fn execute(&self, ctx: &mut RequestContext) -> DispatchResult<Outcome> {
        Next {
            stages: &self.stages,
        }
        .run(ctx)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.stage_names()).finish()
    }
}

/// Middleware built from a closure.
pub struct FnMiddleware<F> {
    name: String,
    f: F,
}

/// Wrap a closure as a named middleware stage.
pub fn from_fn<F>(name: impl Into<String>, f: F) -> FnMiddleware<F>
where
    F: Fn(&mut RequestContext, Next<'_>) -> DispatchResult<Outcome> + Send + Sync + 'static,
{
    FnMiddleware {
        name: name.into(),
        f,
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut RequestContext, Next<'_>) -> DispatchResult<Outcome> + Send + Sync + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn invoke(&self, ctx: &mut RequestContext, next: Next<'_>) -> DispatchResult<Outcome> {
        (self.f)(ctx, next)
    }
}
