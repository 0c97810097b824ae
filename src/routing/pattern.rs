//! Path patterns used to scope interceptors and rate-limit rules.
//!
//! - `*` or `{name}` matches exactly one segment
//! - `**` matches zero or more segments
//! - anything else matches literally; `{`, `}` and `*` inside a literal are rejected

use std::fmt;

use crate::error::BuildError;
use crate::routing::path;
use crate::routing::template::valid_name;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    One,
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    parts: Vec<Part>,
}

impl PathPattern {
    pub fn parse(raw: &str) -> Result<Self, BuildError> {
        let invalid = |reason: &str| BuildError::InvalidPattern {
            pattern: raw.to_string(),
            reason: reason.to_string(),
        };

        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        let parts = path::segments(path::normalize(raw))
            .into_iter()
            .map(|s| match s {
                "**" => Ok(Part::Any),
                "*" => Ok(Part::One),
                s if s.starts_with('{') && s.ends_with('}') => valid_name(&s[1..s.len() - 1])
                    .map(|_| Part::One)
                    .ok_or_else(|| invalid("bad variable name")),
                s if s.contains(['{', '}', '*']) => {
                    Err(invalid("wildcards and variables must span a whole segment"))
                }
                s => Ok(Part::Literal(s.to_string())),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match a request path. The path is normalized first.
    pub fn matches(&self, request_path: &str) -> bool {
        let segments = path::segments(path::normalize(request_path));
        match_parts(&self.parts, &segments)
    }
}

fn match_parts(parts: &[Part], segments: &[&str]) -> bool {
    match parts.split_first() {
        None => segments.is_empty(),
        Some((Part::Any, rest)) => (0..=segments.len()).any(|skip| match_parts(rest, &segments[skip..])),
        Some((part, rest)) => match segments.split_first() {
            Some((seg, tail)) => {
                let head_ok = match part {
                    Part::Literal(lit) => lit == seg,
                    _ => !seg.is_empty(),
                };
                head_ok && match_parts(rest, tail)
            }
            None => false,
        },
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
