//! Segment trie for parameterized routes.
//!
//! Edges are path segments tagged literal, variable or wildcard. Lookup is a
//! depth-first walk trying literal, then variable, then wildcard edges at each
//! depth and backtracking on failure, so the first complete match is the most
//! specific one segment by segment.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::BuildError;
use crate::routing::route::Route;
use crate::routing::template::Segment;
use crate::routing::Method;

#[derive(Debug, Default)]
struct Node {
    literals: HashMap<String, Node>,
    variable: Option<Box<Node>>,
    wildcard: Option<Arc<Route>>,
    route: Option<Arc<Route>>,
}

/// Pattern index organized as one trie per method.
#[derive(Debug, Default)]
pub struct PatternTrie {
    roots: HashMap<Method, Node>,
}

impl PatternTrie {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, route: Arc<Route>) -> Result<(), BuildError> {
        let duplicate = || BuildError::DuplicateRoute {
            method: route.method(),
            path: route.path_template().to_string(),
        };

        let mut node = self.roots.entry(route.method()).or_default();
        for segment in route.template().segments() {
            match segment {
                Segment::Literal(lit) => {
                    node = node.literals.entry(lit.clone()).or_default();
                }
                Segment::Variable(_) => {
                    node = &mut **node.variable.get_or_insert_with(Default::default);
                }
                Segment::Wildcard(_) => {
                    if node.wildcard.is_some() {
                        return Err(duplicate());
                    }
                    node.wildcard = Some(Arc::clone(&route));
                    return Ok(());
                }
            }
        }

        if node.route.is_some() {
            return Err(duplicate());
        }
        node.route = Some(route);
        Ok(())
    }

    /// Find the route for `parts`, returning it with its captures in declaration order.
    pub fn lookup(&self, method: Method, parts: &[&str]) -> Option<(Arc<Route>, Vec<String>)> {
        let root = self.roots.get(&method)?;
        let mut captures = Vec::new();
        let route = walk(root, parts, 0, &mut captures)?;
        Some((Arc::clone(route), captures))
    }
}

fn walk<'t>(
    node: &'t Node,
    parts: &[&str],
    depth: usize,
    captures: &mut Vec<String>,
) -> Option<&'t Arc<Route>> {
    if depth == parts.len() {
        return node.route.as_ref();
    }
    let segment = parts[depth];

    if let Some(child) = node.literals.get(segment) {
        if let Some(found) = walk(child, parts, depth + 1, captures) {
            return Some(found);
        }
    }

    if let Some(child) = node.variable.as_deref() {
        if !segment.is_empty() {
            captures.push(segment.to_string());
            if let Some(found) = walk(child, parts, depth + 1, captures) {
                return Some(found);
            }
            captures.pop();
        }
    }

    if let Some(route) = node.wildcard.as_ref() {
        if matches!(route.template().segments().last(), Some(Segment::Wildcard(Some(_)))) {
            captures.push(parts[depth..].join("/"));
        }
        return Some(route);
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::route::Handler;
    use crate::routing::template::Template;

    fn route(method: Method, template: &str) -> Arc<Route> {
        Arc::new(Route::new(
            method,
            Template::parse(template).unwrap(),
            Handler::new(|_ctx| "ok"),
        ))
    }

    #[test]
    fn literal_beats_variable_beats_wildcard() {
        let mut trie = PatternTrie::new();
        trie.insert(route(Method::Get, "/files/*")).unwrap();
        trie.insert(route(Method::Get, "/files/{name}")).unwrap();
        trie.insert(route(Method::Get, "/files/{name}/raw")).unwrap();

        let (r, caps) = trie.lookup(Method::Get, &["files", "a.txt"]).unwrap();
        assert_eq!(r.path_template(), "/files/{name}");
        assert_eq!(caps, vec!["a.txt"]);

        let (r, _) = trie.lookup(Method::Get, &["files", "a.txt", "raw"]).unwrap();
        assert_eq!(r.path_template(), "/files/{name}/raw");

        let (r, caps) = trie.lookup(Method::Get, &["files", "a", "b"]).unwrap();
        assert_eq!(r.path_template(), "/files/*");
        assert!(caps.is_empty());
    }

    #[test]
    fn backtracks_out_of_a_dead_literal_branch() {
        let mut trie = PatternTrie::new();
        trie.insert(route(Method::Get, "/a/b/{x}/c")).unwrap();
        trie.insert(route(Method::Get, "/a/{y}/d")).unwrap();

        let (r, caps) = trie.lookup(Method::Get, &["a", "b", "d"]).unwrap();
        assert_eq!(r.path_template(), "/a/{y}/d");
        assert_eq!(caps, vec!["b"]);
    }

    #[test]
    fn same_shape_is_duplicate() {
        let mut trie = PatternTrie::new();
        trie.insert(route(Method::Get, "/u/{id}")).unwrap();
        let err = trie.insert(route(Method::Get, "/u/{name}")).unwrap_err();
        assert!(matches!(err, BuildError::DuplicateRoute { .. }));
        trie.insert(route(Method::Post, "/u/{name}")).unwrap();
    }

    #[test]
    fn method_mismatch_is_a_miss() {
        let mut trie = PatternTrie::new();
        trie.insert(route(Method::Get, "/u/{id}")).unwrap();
        assert!(trie.lookup(Method::Delete, &["u", "1"]).is_none());
    }
}
