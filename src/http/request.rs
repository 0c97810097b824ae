//! Inbound conversion: axum request parts → core [`Request`].
//!
//! # Design Decisions
//! - The request target keeps its query string; the core normalizes it
//! - Header values that are not visible ASCII are dropped with a debug log

use axum::body::Bytes;
use axum::http::request::Parts;

use crate::pipeline::Request;

pub fn into_core_request(parts: &Parts, body: Bytes) -> Request {
    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    let mut request = Request::new(parts.method.as_str(), target).with_body(body.to_vec());
    for (name, value) in &parts.headers {
        match value.to_str() {
            Ok(v) => request.headers_mut().append(name.as_str(), v),
            Err(_) => tracing::debug!(header = %name, "Dropped non-ASCII header value"),
        }
    }
    request
}
