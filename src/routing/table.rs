//! Two-tier route table.
//!
//! Literal templates go to an exact index (`method -> path -> route`, one hash
//! probe). Templates with variables or wildcards go to the pattern index, either
//! a [`PatternTrie`] or a [`PatternList`]. The table is built once by
//! [`RouteTableBuilder`] and is read-only afterwards, so lookups take no locks.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{BuildError, DispatchError, DispatchResult};
use crate::routing::linear::PatternList;
use crate::routing::path;
use crate::routing::route::{Handler, PathParams, Route, RouteMatch};
use crate::routing::template::Template;
use crate::routing::trie::PatternTrie;
use crate::routing::Method;

/// Pattern index implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStrategy {
    #[default]
    Trie,
    Linear,
}

#[derive(Debug)]
enum PatternIndex {
    Trie(PatternTrie),
    Linear(PatternList),
}

impl PatternIndex {
    fn insert(&mut self, route: Arc<Route>) -> Result<(), BuildError> {
        match self {
            PatternIndex::Trie(t) => t.insert(route),
            PatternIndex::Linear(l) => l.insert(route),
        }
    }

    fn lookup(&self, method: Method, parts: &[&str]) -> Option<(Arc<Route>, Vec<String>)> {
        match self {
            PatternIndex::Trie(t) => t.lookup(method, parts),
            PatternIndex::Linear(l) => l.lookup(method, parts),
        }
    }
}

/// Immutable route table.
#[derive(Debug)]
pub struct RouteTable {
    exact: HashMap<Method, HashMap<String, Arc<Route>>>,
    patterns: PatternIndex,
    len: usize,
}

impl RouteTable {
    pub fn builder(strategy: MatchStrategy) -> RouteTableBuilder {
        RouteTableBuilder::new(strategy)
    }

    /// Resolve `method` + `path` to a route and its captured variables.
    ///
    /// The exact index is probed first; pattern routes are consulted only on a miss.
    pub fn match_route(&self, method: Method, path: &str) -> DispatchResult<RouteMatch> {
        let normalized = path::normalize(path);

        if let Some(route) = self.exact.get(&method).and_then(|m| m.get(normalized)) {
            return Ok(RouteMatch {
                route: Arc::clone(route),
                params: PathParams::default(),
            });
        }

        let parts = path::segments(normalized);
        match self.patterns.lookup(method, &parts) {
            Some((route, captures)) => {
                let params = PathParams::bind(route.param_names(), captures);
                Ok(RouteMatch { route, params })
            }
            None => Err(DispatchError::RouteNotFound {
                method,
                path: normalized.to_string(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Something that owns handlers and registers them against a route table.
pub trait Controller: Send + Sync + 'static {
    fn routes(self: Arc<Self>, table: &mut RouteTableBuilder) -> Result<(), BuildError>;
}

/// Startup-phase builder for [`RouteTable`].
#[derive(Debug)]
pub struct RouteTableBuilder {
    exact: HashMap<Method, HashMap<String, Arc<Route>>>,
    patterns: PatternIndex,
    len: usize,
}

impl RouteTableBuilder {
    pub fn new(strategy: MatchStrategy) -> Self {
        let patterns = match strategy {
            MatchStrategy::Trie => PatternIndex::Trie(PatternTrie::new()),
            MatchStrategy::Linear => PatternIndex::Linear(PatternList::new()),
        };
        Self {
            exact: HashMap::new(),
            patterns,
            len: 0,
        }
    }

    /// Register a handler. Fails on a malformed template or a duplicate binding.
    pub fn register(
        &mut self,
        method: Method,
        path_template: &str,
        handler: Handler,
    ) -> Result<&mut Self, BuildError> {
        let template = Template::parse(path_template)?;
        if template.is_literal() {
            let key = template.normalized().to_string();
            let by_path = self.exact.entry(method).or_default();
            if by_path.contains_key(&key) {
                return Err(BuildError::DuplicateRoute { method, path: key });
            }
            by_path.insert(key, Arc::new(Route::new(method, template, handler)));
        } else {
            self.patterns
                .insert(Arc::new(Route::new(method, template, handler)))?;
        }
        self.len += 1;
        tracing::debug!(method = %method, template = %path_template, "Route registered");
        Ok(self)
    }

    pub fn get(&mut self, path: &str, handler: Handler) -> Result<&mut Self, BuildError> {
        self.register(Method::Get, path, handler)
    }

    pub fn post(&mut self, path: &str, handler: Handler) -> Result<&mut Self, BuildError> {
        self.register(Method::Post, path, handler)
    }

    pub fn put(&mut self, path: &str, handler: Handler) -> Result<&mut Self, BuildError> {
        self.register(Method::Put, path, handler)
    }

    pub fn delete(&mut self, path: &str, handler: Handler) -> Result<&mut Self, BuildError> {
        self.register(Method::Delete, path, handler)
    }

    pub fn patch(&mut self, path: &str, handler: Handler) -> Result<&mut Self, BuildError> {
        self.register(Method::Patch, path, handler)
    }

    pub fn head(&mut self, path: &str, handler: Handler) -> Result<&mut Self, BuildError> {
        self.register(Method::Head, path, handler)
    }

    pub fn options(&mut self, path: &str, handler: Handler) -> Result<&mut Self, BuildError> {
        self.register(Method::Options, path, handler)
    }

    pub fn controller<C: Controller>(&mut self, controller: Arc<C>) -> Result<&mut Self, BuildError> {
        controller.routes(self)?;
        Ok(self)
    }

    /// Freeze into a read-only table.
    pub fn build(self) -> RouteTable {
        RouteTable {
            exact: self.exact,
            patterns: self.patterns,
            len: self.len,
        }
    }
}
