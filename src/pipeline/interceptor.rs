//! Path-scoped interceptors run from a single middleware stage.
//!
//! Per request:
//! 1. collect every interceptor with a pattern matching the normalized path
//! 2. order them ascending by [`Interceptor::order`]
//! 3. `pre_handle` in ascending order, stopping at the first `false` or error
//! 4. if all passed: run the rest of the chain, then `post_handle` in
//!    descending order, each able to replace the reply
//! 5. always: `after_completion` in descending order for every interceptor whose
//!    `pre_handle` ran, with the error if there was one; the error is then
//!    returned again

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{BuildError, DispatchError, DispatchResult};
use crate::observability::metrics;
use crate::pipeline::chain::{Middleware, Next};
use crate::pipeline::context::RequestContext;
use crate::pipeline::message::Reply;
use crate::pipeline::outcome::{settle, Outcome};
use crate::routing::PathPattern;

/// A lightweight hook with pre/post/always phases.
pub trait Interceptor: Send + Sync + 'static {
    /// Position among all registered interceptors. Must be unique.
    fn order(&self) -> i32;

    /// Return `false` to stop the request here. The interceptor is expected to
    /// have written whatever response the client should see.
    fn pre_handle(&self, _ctx: &mut RequestContext) -> DispatchResult<bool> {
        Ok(true)
    }

    fn post_handle(&self, _ctx: &mut RequestContext, reply: Reply) -> DispatchResult<Reply> {
        Ok(reply)
    }

    fn after_completion(&self, _ctx: &mut RequestContext, _error: Option<&DispatchError>) {}
}

struct Entry {
    patterns: Vec<PathPattern>,
    interceptor: Arc<dyn Interceptor>,
}

/// Registered interceptors, kept sorted by order.
#[derive(Default)]
pub struct InterceptorRegistry {
    entries: Vec<Entry>,
    orders: HashSet<i32>,
}

impl InterceptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `interceptor` for every path matching `pattern`.
    pub fn add(
        &mut self,
        pattern: &str,
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<&mut Self, BuildError> {
        self.add_patterns(&[pattern], interceptor)
    }

    /// Register `interceptor` for several patterns at once. A path matching more
    /// than one of them still runs the interceptor once.
    pub fn add_patterns(
        &mut self,
        patterns: &[&str],
        interceptor: Arc<dyn Interceptor>,
    ) -> Result<&mut Self, BuildError> {
        let order = interceptor.order();
        if self.orders.contains(&order) {
            return Err(BuildError::DuplicateInterceptorOrder(order));
        }
        let patterns = patterns
            .iter()
            .map(|p| PathPattern::parse(p))
            .collect::<Result<Vec<_>, _>>()?;

        let pos = self
            .entries
            .partition_point(|e| e.interceptor.order() < order);
        self.entries.insert(
            pos,
            Entry {
                patterns,
                interceptor,
            },
        );
        self.orders.insert(order);
        Ok(self)
    }

    /// Interceptors applying to `path`, ascending by order.
    pub fn matching(&self, path: &str) -> Vec<Arc<dyn Interceptor>> {
        self.entries
            .iter()
            .filter(|e| e.patterns.iter().any(|p| p.matches(path)))
            .map(|e| Arc::clone(&e.interceptor))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Middleware stage driving the interceptor registry.
pub struct InterceptorStage {
    registry: Arc<InterceptorRegistry>,
}

impl InterceptorStage {
    pub fn new(registry: InterceptorRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }
}

impl Middleware for InterceptorStage {
    fn name(&self) -> &str {
        "interceptors"
    }

    fn invoke(&self, ctx: &mut RequestContext, next: Next<'_>) -> DispatchResult<Outcome> {
        let matched = self.registry.matching(ctx.request().path());
        if matched.is_empty() {
            return next.run(ctx);
        }

        let mut entered = 0;
        let mut verdict = Ok(true);
        for interceptor in &matched {
            entered += 1;
            verdict = interceptor.pre_handle(ctx);
            if !matches!(verdict, Ok(true)) {
                break;
            }
        }

        match verdict {
            Err(err) => {
                let result = complete(&matched[..entered], ctx, Err(err));
                result.map(Outcome::Ready)
            }
            Ok(false) => {
                let rejected_by = matched[entered - 1].order();
                tracing::debug!(
                    request_id = ctx.request_id().unwrap_or("-"),
                    path = %ctx.request().path(),
                    order = rejected_by,
                    "Interceptor rejected request"
                );
                metrics::record_interceptor_rejection();
                complete(&matched[..entered], ctx, Ok(Reply::Empty)).map(Outcome::Ready)
            }
            Ok(true) => {
                let result = next.run(ctx);
                settle(result, ctx, move |ctx, result| {
                    let result = result.and_then(|reply| {
                        matched
                            .iter()
                            .rev()
                            .try_fold(reply, |reply, i| i.post_handle(ctx, reply))
                    });
                    complete(&matched, ctx, result)
                })
            }
        }
    }
}

/// Cleanup pass: `after_completion` in descending order, then hand the result back.
fn complete(
    entered: &[Arc<dyn Interceptor>],
    ctx: &mut RequestContext,
    result: DispatchResult<Reply>,
) -> DispatchResult<Reply> {
    let error = result.as_ref().err();
    for interceptor in entered.iter().rev() {
        interceptor.after_completion(ctx, error);
    }
    result
}
