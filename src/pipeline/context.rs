//! Per-request execution context.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::time::Instant;

use crate::error::{DispatchError, DispatchResult};
use crate::pipeline::message::{Reply, Request, Response, ResponseBuilder};
use crate::routing::{PathParams, Route, RouteMatch};
use crate::session::SessionStore;

/// Header carrying the correlation ID assigned by the transport.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Mutable state threaded through every stage of one request.
///
/// Created by the scheduler, dropped once the response has been handed to the sink.
pub struct RequestContext {
    request: Request,
    response: ResponseBuilder,
    route: Option<Arc<Route>>,
    params: PathParams,
    committed: Option<Response>,
    attributes: HashMap<String, String>,
    sessions: Option<Arc<dyn SessionStore>>,
    started: Instant,
}

impl RequestContext {
    pub fn new(request: Request) -> Self {
        Self {
            request,
            response: ResponseBuilder::default(),
            route: None,
            params: PathParams::default(),
            committed: None,
            attributes: HashMap::new(),
            sessions: None,
            started: Instant::now(),
        }
    }

    pub(crate) fn with_sessions(mut self, store: Option<Arc<dyn SessionStore>>) -> Self {
        self.sessions = store;
        self
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_mut(&mut self) -> &mut Request {
        &mut self.request
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request.headers().get(X_REQUEST_ID)
    }

    /// Status and headers that will be merged into the final response.
    pub fn response(&mut self) -> &mut ResponseBuilder {
        &mut self.response
    }

    pub fn route(&self) -> Option<&Arc<Route>> {
        self.route.as_ref()
    }

    pub fn params(&self) -> &PathParams {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    pub(crate) fn bind_route(&mut self, matched: RouteMatch) {
        self.route = Some(matched.route);
        self.params = matched.params;
    }

    /// Commit a response directly. Whatever the chain returns afterwards is discarded.
    pub fn write(&mut self, response: Response) -> DispatchResult<()> {
        if self.committed.is_some() {
            return Err(DispatchError::AlreadyResponded);
        }
        self.committed = Some(response);
        Ok(())
    }

    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    /// Free-form values stages hand to each other.
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    pub fn sessions(&self) -> Option<&Arc<dyn SessionStore>> {
        self.sessions.as_ref()
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Produce the response to hand off: a committed one wins over the reply.
    pub(crate) fn into_response(self, reply: Reply) -> Response {
        match self.committed {
            Some(response) => response,
            None => self.response.finish(reply),
        }
    }

    pub(crate) fn take_committed(&mut self) -> Option<Response> {
        self.committed.take()
    }
}
