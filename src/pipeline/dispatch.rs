//! Terminal stage: route lookup and handler invocation.

use std::sync::Arc;

use crate::error::{DispatchError, DispatchResult};
use crate::pipeline::chain::{Middleware, Next};
use crate::pipeline::context::RequestContext;
use crate::pipeline::outcome::Outcome;
use crate::routing::{Method, RouteTable};

/// Consults the route table and calls the bound handler. Never calls `next`.
#[derive(Debug)]
pub struct RoutingStage {
    table: Arc<RouteTable>,
}

impl RoutingStage {
    pub fn new(table: Arc<RouteTable>) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &Arc<RouteTable> {
        &self.table
    }
}

impl Middleware for RoutingStage {
    fn name(&self) -> &str {
        "routing"
    }

    fn invoke(&self, ctx: &mut RequestContext, _next: Next<'_>) -> DispatchResult<Outcome> {
        let method: Method = ctx.request().method().parse()?;
        let matched = match self.table.match_route(method, ctx.request().target()) {
            Ok(m) => m,
            Err(err) => {
                if let DispatchError::RouteNotFound { path, .. } = &err {
                    tracing::debug!(
                        request_id = ctx.request_id().unwrap_or("-"),
                        method = %method,
                        path = %path,
                        "No route matched"
                    );
                }
                return Err(err);
            }
        };

        let handler = matched.route.handler().clone();
        ctx.bind_route(matched);
        handler.call(ctx)
    }
}
