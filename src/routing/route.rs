//! Route bindings and pre-resolved handlers.

use std::fmt;
use std::sync::Arc;

use crate::error::DispatchResult;
use crate::pipeline::{Outcome, RequestContext, Responder};
use crate::routing::template::Template;
use crate::routing::Method;

type HandlerFn = dyn Fn(&mut RequestContext) -> DispatchResult<Outcome> + Send + Sync;

/// An application callable, bound once at registration.
///
/// Cloning is cheap; the closure itself is shared.
#[derive(Clone)]
pub struct Handler(Arc<HandlerFn>);

impl Handler {
    /// Bind any closure whose return value can be turned into an [`Outcome`].
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&mut RequestContext) -> R + Send + Sync + 'static,
        R: Responder,
    {
        Handler(Arc::new(move |ctx: &mut RequestContext| f(ctx).into_outcome()))
    }

    /// Bind a method of a shared controller instance.
    pub fn bound<C, F, R>(controller: &Arc<C>, f: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(&C, &mut RequestContext) -> R + Send + Sync + 'static,
        R: Responder,
    {
        let controller = Arc::clone(controller);
        Handler::new(move |ctx: &mut RequestContext| f(&controller, ctx))
    }

    pub fn call(&self, ctx: &mut RequestContext) -> DispatchResult<Outcome> {
        (self.0)(ctx)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Handler(..)")
    }
}

/// An immutable (method, template) to handler binding.
#[derive(Debug)]
pub struct Route {
    method: Method,
    template: Template,
    handler: Handler,
}

impl Route {
    pub(crate) fn new(method: Method, template: Template, handler: Handler) -> Self {
        Self {
            method,
            template,
            handler,
        }
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn path_template(&self) -> &str {
        self.template.raw()
    }

    pub fn param_names(&self) -> &[String] {
        self.template.param_names()
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    pub(crate) fn template(&self) -> &Template {
        &self.template
    }
}

/// Captured path variables, in the order the template declares them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(Vec<(String, String)>);

impl PathParams {
    pub(crate) fn bind(names: &[String], values: Vec<String>) -> Self {
        PathParams(names.iter().cloned().zip(values).collect())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of a successful route lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub route: Arc<Route>,
    pub params: PathParams,
}
