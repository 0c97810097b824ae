//! Linear pattern list.
//!
//! Each method keeps its pattern routes in one vector scanned front to back;
//! the first route whose template matches wins. Insertion keeps the vector
//! ordered by segment precedence (literal < variable < wildcard, compared
//! segment by segment, ties in registration order), which makes the scan
//! agree with [`PatternTrie`](super::trie::PatternTrie) on every table.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::BuildError;
use crate::routing::route::Route;
use crate::routing::Method;

#[derive(Debug, Default)]
pub struct PatternList {
    routes: HashMap<Method, Vec<Arc<Route>>>,
}

impl PatternList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, route: Arc<Route>) -> Result<(), BuildError> {
        let list = self.routes.entry(route.method()).or_default();
        let shape = route.template().shape();
        if list.iter().any(|r| r.template().shape() == shape) {
            return Err(BuildError::DuplicateRoute {
                method: route.method(),
                path: route.path_template().to_string(),
            });
        }

        let ranks = route.template().ranks();
        let pos = list.partition_point(|r| r.template().ranks() <= ranks);
        list.insert(pos, route);
        Ok(())
    }

    pub fn lookup(&self, method: Method, parts: &[&str]) -> Option<(Arc<Route>, Vec<String>)> {
        self.routes.get(&method)?.iter().find_map(|route| {
            route
                .template()
                .capture(parts)
                .map(|captures| (Arc::clone(route), captures))
        })
    }

    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
