//! Outbound conversion: core [`Response`] → axum response.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response as HttpResponse};

use crate::pipeline::Response;

pub fn into_http_response(response: Response) -> HttpResponse {
    let status = StatusCode::from_u16(response.status).unwrap_or_else(|_| {
        tracing::warn!(status = response.status, "Handler produced an invalid status code");
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut http = HttpResponse::new(Body::from(response.body));
    *http.status_mut() = status;

    let headers = http.headers_mut();
    for (name, value) in response.headers.iter() {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(value)) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropped invalid response header"),
        }
    }
    http
}

/// Body exceeded `listener.max_body_bytes` or could not be read.
pub fn payload_too_large() -> HttpResponse {
    (StatusCode::PAYLOAD_TOO_LARGE, "Payload Too Large").into_response()
}
