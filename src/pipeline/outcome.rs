//! Maybe-deferred results.
//!
//! A stage's `next.run(ctx)` either returns a finished [`Reply`] or a
//! [`Deferred`] computation. Stages that post-process attach continuations with
//! [`Outcome::then`]/[`Outcome::map`]; on a ready value they run immediately,
//! on a deferred one they run after the future resolves, innermost first, which
//! is the same order the call stack would have unwound in.

use std::fmt;
use std::future::Future;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use serde::Serialize;

use crate::error::{DispatchError, DispatchResult};
use crate::pipeline::context::RequestContext;
use crate::pipeline::message::{Json, Reply, Response};

/// Continuation applied to a deferred result once it resolves.
pub type Continuation =
    Box<dyn FnOnce(&mut RequestContext, DispatchResult<Reply>) -> DispatchResult<Reply> + Send>;

/// A not-yet-completed reply plus the post-processing queued on it.
pub struct Deferred {
    future: BoxFuture<'static, DispatchResult<Reply>>,
    continuations: Vec<Continuation>,
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("continuations", &self.continuations.len())
            .finish()
    }
}

#[derive(Debug)]
pub enum Outcome {
    Ready(Reply),
    Pending(Deferred),
}

impl Outcome {
    pub fn ready(reply: impl Into<Reply>) -> Self {
        Outcome::Ready(reply.into())
    }

    pub fn empty() -> Self {
        Outcome::Ready(Reply::Empty)
    }

    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = DispatchResult<Reply>> + Send + 'static,
    {
        Outcome::Pending(Deferred {
            future: future.boxed(),
            continuations: Vec::new(),
        })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }

    /// Run `f` on the result now if ready, or once the deferred value resolves.
    ///
    /// `f` sees failures of the deferred computation as `Err`.
    pub fn then<F>(self, ctx: &mut RequestContext, f: F) -> DispatchResult<Outcome>
    where
        F: FnOnce(&mut RequestContext, DispatchResult<Reply>) -> DispatchResult<Reply> + Send + 'static,
    {
        match self {
            Outcome::Ready(reply) => f(ctx, Ok(reply)).map(Outcome::Ready),
            Outcome::Pending(mut deferred) => {
                deferred.continuations.push(Box::new(f));
                Ok(Outcome::Pending(deferred))
            }
        }
    }

    /// Transform a successful reply, now or later.
    pub fn map<F>(self, ctx: &mut RequestContext, f: F) -> DispatchResult<Outcome>
    where
        F: FnOnce(&mut RequestContext, Reply) -> DispatchResult<Reply> + Send + 'static,
    {
        self.then(ctx, move |ctx, result| result.and_then(|reply| f(ctx, reply)))
    }

    /// Drive the outcome to a finished reply.
    pub async fn resolve(self, ctx: &mut RequestContext) -> DispatchResult<Reply> {
        match self {
            Outcome::Ready(reply) => Ok(reply),
            Outcome::Pending(deferred) => {
                let mut result = deferred.future.await;
                for continuation in deferred.continuations {
                    result = continuation(ctx, result);
                }
                result
            }
        }
    }
}

/// Attach `f` to whatever `next.run(ctx)` returned, including an immediate error.
///
/// Stages that must observe failures (cleanup hooks, error mapping) use this
/// instead of `?` on their `next` call.
pub fn settle<F>(
    result: DispatchResult<Outcome>,
    ctx: &mut RequestContext,
    f: F,
) -> DispatchResult<Outcome>
where
    F: FnOnce(&mut RequestContext, DispatchResult<Reply>) -> DispatchResult<Reply> + Send + 'static,
{
    match result {
        Ok(outcome) => outcome.then(ctx, f),
        Err(err) => f(ctx, Err(err)).map(Outcome::Ready),
    }
}

/// Values a handler may return.
pub trait Responder {
    fn into_outcome(self) -> DispatchResult<Outcome>;
}

impl Responder for Outcome {
    fn into_outcome(self) -> DispatchResult<Outcome> {
        Ok(self)
    }
}

impl Responder for Reply {
    fn into_outcome(self) -> DispatchResult<Outcome> {
        Ok(Outcome::Ready(self))
    }
}

impl Responder for () {
    fn into_outcome(self) -> DispatchResult<Outcome> {
        Ok(Outcome::empty())
    }
}

impl Responder for String {
    fn into_outcome(self) -> DispatchResult<Outcome> {
        Ok(Outcome::ready(self))
    }
}

impl Responder for &'static str {
    fn into_outcome(self) -> DispatchResult<Outcome> {
        Ok(Outcome::ready(self))
    }
}

impl Responder for Response {
    fn into_outcome(self) -> DispatchResult<Outcome> {
        Ok(Outcome::ready(self))
    }
}

impl Responder for serde_json::Value {
    fn into_outcome(self) -> DispatchResult<Outcome> {
        Ok(Outcome::ready(self))
    }
}

impl<T: Serialize> Responder for Json<T> {
    fn into_outcome(self) -> DispatchResult<Outcome> {
        self.into_reply().map(Outcome::Ready)
    }
}

impl<T: Responder> Responder for Result<T, DispatchError> {
    fn into_outcome(self) -> DispatchResult<Outcome> {
        self.and_then(Responder::into_outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::message::Request;
    use std::sync::{Arc, Mutex};

    fn ctx() -> RequestContext {
        RequestContext::new(Request::new("GET", "/"))
    }

    #[test]
    fn map_on_ready_runs_immediately() {
        let mut ctx = ctx();
        let out = Outcome::ready("a")
            .map(&mut ctx, |_, r| match r {
                Reply::Text(s) => Ok(Reply::Text(s + "b")),
                other => Ok(other),
            })
            .unwrap();
        match out {
            Outcome::Ready(Reply::Text(s)) => assert_eq!(s, "ab"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn continuations_run_in_attach_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = ctx();
        let mut out = Outcome::deferred(async { Ok(Reply::Text("x".into())) });
        for tag in ["inner", "middle", "outer"] {
            let log = log.clone();
            out = out
                .map(&mut ctx, move |_, r| {
                    log.lock().unwrap().push(tag);
                    Ok(r)
                })
                .unwrap();
        }
        assert!(log.lock().unwrap().is_empty());
        let reply = out.resolve(&mut ctx).await.unwrap();
        assert_eq!(reply, Reply::Text("x".into()));
        assert_eq!(*log.lock().unwrap(), vec!["inner", "middle", "outer"]);
    }

    #[tokio::test]
    async fn then_sees_deferred_failure() {
        let mut ctx = ctx();
        let out = Outcome::deferred(async { Err(DispatchError::handler("late failure")) })
            .then(&mut ctx, |_, r| {
                assert!(r.is_err());
                Ok(Reply::Text("recovered".into()))
            })
            .unwrap();
        assert_eq!(out.resolve(&mut ctx).await.unwrap(), Reply::Text("recovered".into()));
    }

    #[test]
    fn settle_sees_immediate_error() {
        let mut ctx = ctx();
        let out = settle(Err(DispatchError::ChainExhausted), &mut ctx, |_, r| {
            assert!(matches!(r, Err(DispatchError::ChainExhausted)));
            Ok(Reply::Empty)
        })
        .unwrap();
        assert!(out.is_ready());
    }
}
