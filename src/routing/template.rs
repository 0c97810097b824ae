//! Route template parsing.
//!
//! Template grammar, one item per `/`-separated segment:
//! - `users`: literal
//! - `{id}`: named variable, captures exactly one non-empty segment
//! - `{*rest}`: named wildcard, captures one or more trailing segments joined by `/`
//! - `*`: anonymous wildcard, same as above without a capture
//!
//! Wildcards are only valid as the last segment.

use crate::error::BuildError;
use crate::routing::path;

/// One parsed template segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Variable(String),
    Wildcard(Option<String>),
}

impl Segment {
    /// Precedence rank used when several pattern routes could match:
    /// literal beats variable beats wildcard.
    pub fn rank(&self) -> u8 {
        match self {
            Segment::Literal(_) => 0,
            Segment::Variable(_) => 1,
            Segment::Wildcard(_) => 2,
        }
    }
}

/// A parsed route template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    raw: String,
    normalized: String,
    segments: Vec<Segment>,
    param_names: Vec<String>,
}

impl Template {
    pub fn parse(raw: &str) -> Result<Self, BuildError> {
        let invalid = |reason: &str| BuildError::InvalidTemplate {
            template: raw.to_string(),
            reason: reason.to_string(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if raw.contains('?') {
            return Err(invalid("must not contain a query string"));
        }

        let normalized = path::normalize(raw);
        let parts = path::segments(normalized);
        let mut segments = Vec::with_capacity(parts.len());
        let mut param_names: Vec<String> = Vec::new();

        for (idx, part) in parts.iter().enumerate() {
            let last = idx + 1 == parts.len();
            let segment = if part.is_empty() {
                return Err(invalid("empty segment"));
            } else if *part == "*" {
                Segment::Wildcard(None)
            } else if let Some(inner) = part.strip_prefix('{').and_then(|p| p.strip_suffix('}')) {
                match inner.strip_prefix('*') {
                    Some(name) => Segment::Wildcard(Some(valid_name(name).ok_or_else(|| invalid("bad wildcard name"))?)),
                    None => Segment::Variable(valid_name(inner).ok_or_else(|| invalid("bad variable name"))?),
                }
            } else if part.contains('{') || part.contains('}') || part.contains('*') {
                return Err(invalid("variables must span a whole segment"));
            } else {
                Segment::Literal((*part).to_string())
            };

            if matches!(segment, Segment::Wildcard(_)) && !last {
                return Err(invalid("wildcard must be the last segment"));
            }
            if let Segment::Variable(name) | Segment::Wildcard(Some(name)) = &segment {
                if param_names.iter().any(|n| n == name) {
                    return Err(invalid("duplicate variable name"));
                }
                param_names.push(name.clone());
            }
            segments.push(segment);
        }

        Ok(Self {
            raw: raw.to_string(),
            normalized: normalized.to_string(),
            segments,
            param_names,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Template with query and trailing slash stripped; the exact-index key.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn is_literal(&self) -> bool {
        self.segments.iter().all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Template with variable names erased. Two templates with the same shape
    /// match exactly the same set of paths.
    pub fn shape(&self) -> String {
        if self.segments.is_empty() {
            return "/".to_string();
        }
        let mut out = String::new();
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(s) => out.push_str(s),
                Segment::Variable(_) => out.push_str("{}"),
                Segment::Wildcard(_) => out.push('*'),
            }
        }
        out
    }

    pub fn ranks(&self) -> Vec<u8> {
        self.segments.iter().map(Segment::rank).collect()
    }

    /// Match a split request path, returning captures in declaration order.
    pub fn capture(&self, parts: &[&str]) -> Option<Vec<String>> {
        let mut captures = Vec::with_capacity(self.param_names.len());
        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Literal(lit) => {
                    if parts.get(idx) != Some(&lit.as_str()) {
                        return None;
                    }
                }
                Segment::Variable(_) => match parts.get(idx) {
                    Some(part) if !part.is_empty() => captures.push((*part).to_string()),
                    _ => return None,
                },
                Segment::Wildcard(name) => {
                    if parts.len() <= idx {
                        return None;
                    }
                    if name.is_some() {
                        captures.push(parts[idx..].join("/"));
                    }
                    return Some(captures);
                }
            }
        }
        (parts.len() == self.segments.len()).then_some(captures)
    }
}

pub(crate) fn valid_name(name: &str) -> Option<String> {
    let ok = !name.is_empty()
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    ok.then(|| name.to_string())
}
