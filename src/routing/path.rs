//! Request path normalization.
//!
//! Every component that compares paths (route table, interceptor registry,
//! rate-limit rules) goes through [`normalize`] first so they agree on what
//! "the path" of a request is.

/// Strip the query string and a single trailing `/`. Empty paths become `/`.
pub fn normalize(path: &str) -> &str {
    let path = match path.find('?') {
        Some(idx) => &path[..idx],
        None => path,
    };
    if path.is_empty() || path == "/" {
        return "/";
    }
    path.strip_suffix('/').unwrap_or(path)
}

/// Split a normalized path into its segments. `/` has none.
pub fn segments(normalized: &str) -> Vec<&str> {
    if normalized == "/" {
        return Vec::new();
    }
    normalized
        .strip_prefix('/')
        .unwrap_or(normalized)
        .split('/')
        .collect()
}

/// True when any segment of the path is `..`.
pub fn has_parent_segment(path: &str) -> bool {
    segments(normalize(path)).iter().any(|s| *s == "..")
}
