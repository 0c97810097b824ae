//! Request scheduler.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::error::DispatchResult;
use crate::observability::metrics;
use crate::pipeline::{Chain, Outcome, Reply, Request, RequestContext, Response, X_REQUEST_ID};
use crate::session::{SessionLock, SessionStore};

/// How a request is given its execution context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulingMode {
    /// One blocking-pool task per request. Handlers may block; deferred
    /// outcomes are driven to completion on that same task.
    ///
    /// Each in-flight request occupies a blocking-pool thread, so concurrency
    /// is capped by the runtime's `max_blocking_threads` (512 by default).
    /// Requests past that cap queue until a thread frees up.
    Task,
    /// One async task per request. Deferred outcomes are awaited as continuations;
    /// handlers must not block. Thousands of requests can be in flight at once.
    #[default]
    Continuation,
}

/// Receives the final response of one request.
pub trait ResponseSink: Send + 'static {
    fn deliver(self, response: Response);
}

impl<F> ResponseSink for F
where
    F: FnOnce(Response) + Send + 'static,
{
    fn deliver(self, response: Response) {
        self(response)
    }
}

/// Drives requests through the chain under the session read lock.
///
/// Cheap to clone; all clones share the same chain, lock and store.
#[derive(Clone)]
pub struct Scheduler {
    chain: Chain,
    mode: SchedulingMode,
    lock: SessionLock,
    sessions: Option<Arc<dyn SessionStore>>,
}

impl Scheduler {
    pub fn new(
        chain: Chain,
        mode: SchedulingMode,
        lock: SessionLock,
        sessions: Option<Arc<dyn SessionStore>>,
    ) -> Self {
        Self {
            chain,
            mode,
            lock,
            sessions,
        }
    }

    pub fn mode(&self) -> SchedulingMode {
        self.mode
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    pub fn session_lock(&self) -> &SessionLock {
        &self.lock
    }

    /// Schedule `request` and hand its response to `sink`.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, like `tokio::spawn`.
    pub fn dispatch<S: ResponseSink>(&self, mut request: Request, sink: S) -> JoinHandle<()> {
        if request.headers().get(X_REQUEST_ID).is_none() {
            request
                .headers_mut()
                .set(X_REQUEST_ID, Uuid::new_v4().to_string());
        }

        let chain = self.chain.clone();
        let lock = self.lock.clone();
        let sessions = self.sessions.clone();

        match self.mode {
            SchedulingMode::Task => tokio::task::spawn_blocking(move || {
                let guard = lock.blocking_read();
                let mut ctx = RequestContext::new(request).with_sessions(sessions);
                let result = match chain.execute(&mut ctx) {
                    Ok(Outcome::Ready(reply)) => Ok(reply),
                    Ok(pending) => Handle::current().block_on(pending.resolve(&mut ctx)),
                    Err(err) => Err(err),
                };
                let response = finish(ctx, result);
                drop(guard);
                sink.deliver(response);
            }),
            SchedulingMode::Continuation => tokio::spawn(async move {
                let guard = lock.read().await;
                let mut ctx = RequestContext::new(request).with_sessions(sessions);
                let result = match chain.execute(&mut ctx) {
                    Ok(outcome) => outcome.resolve(&mut ctx).await,
                    Err(err) => Err(err),
                };
                let response = finish(ctx, result);
                drop(guard);
                sink.deliver(response);
            }),
        }
    }

    /// Schedule `request` and wait for its response.
    pub async fn handle(&self, request: Request) -> Response {
        let (tx, rx) = oneshot::channel();
        self.dispatch(request, move |response: Response| {
            let _ = tx.send(response);
        });
        match rx.await {
            Ok(response) => response,
            Err(_) => {
                tracing::error!("Request task ended without producing a response");
                Response::internal_error()
            }
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("mode", &self.mode)
            .field("chain", &self.chain)
            .field("sessions", &self.sessions.is_some())
            .finish()
    }
}

/// Map the pipeline result to the response handed to the sink.
fn finish(mut ctx: RequestContext, result: DispatchResult<Reply>) -> Response {
    let method = ctx.request().method().to_string();
    let started = ctx.started();

    let response = match result {
        Ok(reply) => ctx.into_response(reply),
        Err(err) => match ctx.take_committed() {
            Some(committed) => committed,
            None => {
                let response = Response::from_error(&err);
                if response.status >= 500 {
                    tracing::error!(
                        request_id = ctx.request_id().unwrap_or("-"),
                        path = %ctx.request().path(),
                        error = %err,
                        "Request failed"
                    );
                } else {
                    tracing::debug!(
                        request_id = ctx.request_id().unwrap_or("-"),
                        path = %ctx.request().path(),
                        status = response.status,
                        error = %err,
                        "Request rejected"
                    );
                }
                response
            }
        },
    };

    metrics::record_request(&method, response.status, started);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{from_fn, Next, RoutingStage};
    use crate::routing::{Handler, MatchStrategy, RouteTable};
    use crate::error::DispatchError;

    fn scheduler(mode: SchedulingMode) -> Scheduler {
        let mut b = RouteTable::builder(MatchStrategy::Trie);
        b.get("/sync", Handler::new(|_ctx: &mut RequestContext| "sync"))
            .unwrap()
            .get(
                "/deferred",
                Handler::new(|_ctx: &mut RequestContext| {
                    Outcome::deferred(async { Ok(Reply::Text("later".into())) })
                }),
            )
            .unwrap()
            .get(
                "/fail",
                Handler::new(|_ctx: &mut RequestContext| -> DispatchResult<Outcome> {
                    Err(DispatchError::handler("broken"))
                }),
            )
            .unwrap();
        let stamp = from_fn("stamp", |ctx: &mut RequestContext, next: Next<'_>| {
            next.run(ctx)?.map(ctx, |ctx, reply| {
                ctx.response().headers.set("x-stamped", "1");
                Ok(reply)
            })
        });
        let chain = Chain::new(
            vec![Arc::new(stamp)],
            Arc::new(RoutingStage::new(Arc::new(b.build()))),
        );
        Scheduler::new(chain, mode, SessionLock::new(), None)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn both_modes_produce_the_same_responses() {
        for mode in [SchedulingMode::Task, SchedulingMode::Continuation] {
            let s = scheduler(mode);

            let resp = s.handle(Request::new("GET", "/sync")).await;
            assert_eq!(resp.status, 200);
            assert_eq!(resp.body_str(), "sync");
            assert_eq!(resp.headers.get("x-stamped"), Some("1"));

            let resp = s.handle(Request::new("GET", "/deferred")).await;
            assert_eq!(resp.body_str(), "later");
            assert_eq!(resp.headers.get("x-stamped"), Some("1"));

            assert_eq!(s.handle(Request::new("GET", "/nope")).await.status, 404);
            assert_eq!(s.handle(Request::new("GET", "/fail")).await.status, 500);
            assert_eq!(s.handle(Request::new("BREW", "/sync")).await.status, 405);
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn sink_receives_response() {
        let (tx, rx) = oneshot::channel();
        scheduler(SchedulingMode::Continuation).dispatch(
            Request::new("GET", "/sync?x=1"),
            move |resp: Response| {
                tx.send(resp.status).unwrap();
            },
        );
        assert_eq!(rx.await.unwrap(), 200);
    }
}
