//! Response construction and transformation.
//!
//! # Responsibilities
//! - Build the locally generated responses (400, 403, 404, 413, 500)
//! - Transform upstream responses for the client (CORS, cache, security headers)
//! - Map upstream transport errors to a JSON 500
//!
//! # Design Decisions
//! - Relayed status and body bytes are never altered
//! - Hop-by-hop headers stripped automatically

use axum::body::Body;
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;
use chrono::{SecondsFormat, Utc};
use serde_json::json;

use crate::http::cors::CorsPolicy;
use crate::security::headers::{self, NO_CACHE};
use crate::security::{CorsOrigin, Rejection};
use crate::upstream::{ForwardError, UpstreamResponse};

pub const X_BLOCKED_REASON: HeaderName = HeaderName::from_static("x-blocked-reason");
pub const X_PROXY: HeaderName = HeaderName::from_static("x-proxy");
pub const X_PROXY_VERSION: HeaderName = HeaderName::from_static("x-proxy-version");

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const APPLICATION_JSON: &str = "application/json; charset=utf-8";

fn local(status: StatusCode, content_type: &'static str, body: impl Into<Body>, origin: &CorsOrigin) -> Response {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;

    let h = response.headers_mut();
    h.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    h.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.header_value());
    h.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_CACHE));
    response
}

/// 403 for a refused client or origin.
pub fn access_denied(rejection: &Rejection) -> Response {
    let mut response = local(StatusCode::FORBIDDEN, TEXT_PLAIN, "Access Denied", &CorsOrigin::Any);
    response.headers_mut().insert(X_BLOCKED_REASON, rejection.reason());
    response
}

/// 404 for a path outside the route table.
pub fn not_found(origin: &CorsOrigin) -> Response {
    local(StatusCode::NOT_FOUND, TEXT_PLAIN, "Not Found", origin)
}

/// 400 for a request body the client failed to deliver.
pub fn bad_request(origin: &CorsOrigin) -> Response {
    local(StatusCode::BAD_REQUEST, TEXT_PLAIN, "Bad Request", origin)
}

/// 413 for a request body over the limit.
pub fn payload_too_large(origin: &CorsOrigin) -> Response {
    local(StatusCode::PAYLOAD_TOO_LARGE, TEXT_PLAIN, "Payload Too Large", origin)
}

/// 500 for an upstream transport failure.
pub fn upstream_error(err: &ForwardError, origin: &CorsOrigin) -> Response {
    let body = json!({
        "error": "Internal Server Error",
        "message": err.to_string(),
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    });
    local(StatusCode::INTERNAL_SERVER_ERROR, APPLICATION_JSON, body.to_string(), origin)
}

/// Wrap an upstream response for the client.
pub fn relay(
    upstream: UpstreamResponse,
    cors: &CorsPolicy,
    origin: &CorsOrigin,
    security_headers: bool,
) -> Response {
    let UpstreamResponse { status, headers: mut h, body } = upstream;

    headers::strip_hop_by_hop(&mut h);
    cors.apply_to_relay(&mut h, origin);
    if security_headers {
        headers::apply_security_headers(&mut h);
    }
    headers::ensure_uncached(&mut h);
    h.insert(X_PROXY, HeaderValue::from_static("edge-proxy"));
    h.insert(X_PROXY_VERSION, HeaderValue::from_static(env!("CARGO_PKG_VERSION")));

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = h;
    response
}
