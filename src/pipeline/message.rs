//! Request and response values exchanged with the transport layer.

use serde::Serialize;

use crate::error::{DispatchError, DispatchResult};
use crate::routing::path;

/// Ordered header list with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Replace every value of `name` with `value`.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.0.retain(|(k, _)| !k.eq_ignore_ascii_case(&name));
        self.0.push((name, value.into()));
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
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

/// A request as delivered by the transport: verb, target (path plus query), headers, body.
#[derive(Debug, Clone)]
pub struct Request {
    method: String,
    target: String,
    headers: Headers,
    body: Vec<u8>,
}

impl Request {
    pub fn new(method: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            target: target.into(),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Raw request target, query string included.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Normalized path: no query, no trailing slash.
    pub fn path(&self) -> &str {
        path::normalize(&self.target)
    }

    pub fn query(&self) -> Option<&str> {
        self.target.split_once('?').map(|(_, q)| q)
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

/// A fully built response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(status: u16, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let mut headers = Headers::new();
        headers.set("content-type", content_type);
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new(200, "text/plain; charset=utf-8", body.into())
    }

    pub fn json(value: &serde_json::Value) -> Self {
        Self::new(200, "application/json", value.to_string())
    }

    pub fn bad_request() -> Self {
        Self::new(400, "text/plain; charset=utf-8", "Bad Request")
    }

    pub fn too_many_requests() -> Self {
        Self::new(429, "text/plain; charset=utf-8", "Too Many Requests")
    }

    pub fn internal_error() -> Self {
        Self::new(500, "text/plain; charset=utf-8", "Internal Server Error")
    }

    /// Map an error that escaped the pipeline to a response.
    pub fn from_error(err: &DispatchError) -> Self {
        let status = err.status();
        let body = match err {
            DispatchError::RouteNotFound { .. } => "No matching route found",
            DispatchError::MethodNotSupported(_) => "Method Not Allowed",
            DispatchError::RateLimited { .. } => "Too Many Requests",
            _ => "Internal Server Error",
        };
        Self::new(status, "text/plain; charset=utf-8", body)
    }

    pub fn body_str(&self) -> &str {
        std::str::from_utf8(&self.body).unwrap_or_default()
    }
}

/// What a handler or stage produced.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Nothing to send beyond the response builder's status and headers.
    Empty,
    Text(String),
    Json(serde_json::Value),
    Bytes(Vec<u8>),
    /// A response built by the handler itself; bypasses the builder.
    Response(Response),
}

impl From<String> for Reply {
    fn from(s: String) -> Self {
        Reply::Text(s)
    }
}

impl From<&'static str> for Reply {
    fn from(s: &'static str) -> Self {
        Reply::Text(s.to_string())
    }
}

impl From<serde_json::Value> for Reply {
    fn from(v: serde_json::Value) -> Self {
        Reply::Json(v)
    }
}

impl From<Response> for Reply {
    fn from(r: Response) -> Self {
        Reply::Response(r)
    }
}

/// Serialize a structured value as a JSON reply.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> Json<T> {
    pub fn into_reply(self) -> DispatchResult<Reply> {
        serde_json::to_value(self.0)
            .map(Reply::Json)
            .map_err(DispatchError::handler)
    }
}

/// Status and headers accumulated by stages before the reply is known.
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    pub status: u16,
    pub headers: Headers,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self {
            status: 200,
            headers: Headers::new(),
        }
    }
}

impl ResponseBuilder {
    /// Combine the builder with a reply into the final response.
    pub fn finish(self, reply: Reply) -> Response {
        let (content_type, body) = match reply {
            Reply::Response(mut response) => {
                for (k, v) in self.headers.iter() {
                    if response.headers.get(k).is_none() {
                        response.headers.append(k, v);
                    }
                }
                return response;
            }
            Reply::Empty => (None, Vec::new()),
            Reply::Text(s) => (Some("text/plain; charset=utf-8"), s.into_bytes()),
            Reply::Json(v) => (Some("application/json"), v.to_string().into_bytes()),
            Reply::Bytes(b) => (Some("application/octet-stream"), b),
        };

        let mut headers = self.headers;
        if let Some(ct) = content_type {
            if headers.get("content-type").is_none() {
                headers.set("content-type", ct);
            }
        }
        Response {
            status: self.status,
            headers,
            body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_path_and_query() {
        let req = Request::new("GET", "/users/42/?expand=posts");
        assert_eq!(req.path(), "/users/42");
        assert_eq!(req.query(), Some("expand=posts"));
        assert_eq!(Request::new("GET", "").path(), "/");
    }

    #[test]
    fn headers_case_insensitive() {
        let req = Request::new("GET", "/").with_header("X-Request-Id", "abc");
        assert_eq!(req.headers().get("x-request-id"), Some("abc"));
    }

    #[test]
    fn builder_keeps_explicit_content_type() {
        let mut builder = ResponseBuilder::default();
        builder.status = 201;
        builder.headers.set("content-type", "text/csv");
        let resp = builder.finish(Reply::Text("a,b".into()));
        assert_eq!(resp.status, 201);
        assert_eq!(resp.headers.get("content-type"), Some("text/csv"));
        assert_eq!(resp.body_str(), "a,b");
    }

    #[test]
    fn json_reply() {
        #[derive(Serialize)]
        struct User {
            id: u32,
        }
        let reply = Json(User { id: 7 }).into_reply().unwrap();
        let resp = ResponseBuilder::default().finish(reply);
        assert_eq!(resp.headers.get("content-type"), Some("application/json"));
        assert_eq!(resp.body_str(), r#"{"id":7}"#);
    }
}
