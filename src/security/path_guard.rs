//! Path traversal guard.
//!
//! Rejects any request whose path contains a `..` segment with 400 before
//! routing sees it. The route matcher itself never special-cases `..`.

use crate::error::DispatchResult;
use crate::pipeline::{Middleware, Next, Outcome, Reply, RequestContext, Response};
use crate::routing::path::has_parent_segment;

#[derive(Debug, Default, Clone, Copy)]
pub struct PathGuard;

impl Middleware for PathGuard {
    fn name(&self) -> &str {
        "path_guard"
    }

    fn invoke(&self, ctx: &mut RequestContext, next: Next<'_>) -> DispatchResult<Outcome> {
        if has_parent_segment(ctx.request().target()) {
            tracing::warn!(
                request_id = ctx.request_id().unwrap_or("-"),
                target = %ctx.request().target(),
                "Rejected path with parent segment"
            );
            return Ok(Outcome::Ready(Reply::Response(Response::bad_request())));
        }
        next.run(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{from_fn, Chain, Request};
    use std::sync::Arc;

    fn chain() -> Chain {
        let terminal = from_fn("terminal", |_ctx: &mut RequestContext, _next: Next<'_>| {
            Ok(Outcome::ready("reached"))
        });
        Chain::new(vec![Arc::new(PathGuard)], Arc::new(terminal))
    }

    #[test]
    fn parent_segment_gets_400() {
        let mut ctx = RequestContext::new(Request::new("GET", "/static/../secret"));
        match chain().execute(&mut ctx).unwrap() {
            Outcome::Ready(Reply::Response(resp)) => assert_eq!(resp.status, 400),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn dots_inside_a_segment_pass() {
        let mut ctx = RequestContext::new(Request::new("GET", "/files/a..b"));
        assert!(matches!(
            chain().execute(&mut ctx).unwrap(),
            Outcome::Ready(Reply::Text(ref s)) if s == "reached"
        ));
    }
}
