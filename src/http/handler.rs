//! The proxy request pipeline.
//!
//! ```text
//! access filter ──deny──▶ 403
//!      │ allow(origin)
//! OPTIONS? ──yes──▶ 204 preflight
//!      │
//! route lookup ──miss──▶ 404
//!      │ hit
//! read body ──too large──▶ 413, ──broken──▶ 400
//!      │
//! forward ──Err──▶ 500 JSON
//!      │ Ok
//! relay (status + bytes verbatim, CORS/cache/security headers rewritten)
//! ```
//!
//! Every arrow out of the pipeline is terminal; nothing is retried.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::body::Body;
use axum::http::header::InvalidHeaderName;
use axum::http::{HeaderName, Method, Request};
use axum::response::Response;
use thiserror::Error;

use crate::config::ProxyConfig;
use crate::http::cors::CorsPolicy;
use crate::http::request::{self, carries_body, read_body, BodyError};
use crate::http::response;
use crate::observability::metrics;
use crate::routing::{RouteError, Router};
use crate::security::headers::{add_forwarded_headers, forwardable_headers};
use crate::security::{AccessPolicy, Decision};
use crate::upstream::{Upstream, UpstreamRequest};

/// Number of characters of a successful upstream body written to the debug log.
const PREVIEW_CHARS: usize = 500;

/// Terminal state of one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Rejected,
    Preflight,
    RouteNotFound,
    PayloadTooLarge,
    BadRequestBody,
    Relayed,
    UpstreamError,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Rejected => "rejected",
            Outcome::Preflight => "preflight",
            Outcome::RouteNotFound => "route_not_found",
            Outcome::PayloadTooLarge => "payload_too_large",
            Outcome::BadRequestBody => "bad_request_body",
            Outcome::Relayed => "relayed",
            Outcome::UpstreamError => "upstream_error",
        }
    }
}

/// Error building the handler from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Route(#[from] RouteError),

    #[error("invalid CORS header value: {0}")]
    Cors(#[from] axum::http::header::InvalidHeaderValue),

    #[error("invalid client version header name: {0}")]
    ClientVersionHeader(#[from] InvalidHeaderName),
}

/// Immutable request handler shared by every connection.
pub struct ProxyHandler {
    access: AccessPolicy,
    router: Router,
    cors: CorsPolicy,
    client_version_header: HeaderName,
    add_forwarded_headers: bool,
    security_headers: bool,
    max_body_size: usize,
    upstream: Arc<dyn Upstream>,
}

impl ProxyHandler {
    pub fn new(config: &ProxyConfig, upstream: Arc<dyn Upstream>) -> Result<Self, BuildError> {
        Ok(Self {
            access: AccessPolicy::from_config(&config.access),
            router: Router::from_config(&config.routing)?,
            cors: CorsPolicy::from_config(&config.cors)?,
            client_version_header: HeaderName::from_bytes(
                config.cors.client_version_header.as_bytes(),
            )?,
            add_forwarded_headers: config.forwarding.add_forwarded_headers,
            security_headers: config.security.enable_headers,
            max_body_size: config.security.max_body_size,
            upstream,
        })
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle one request end to end. Never fails: every error becomes a response.
    pub async fn handle(&self, request: Request<Body>, peer: Option<SocketAddr>) -> Response {
        let start = Instant::now();
        let method = request.method().clone();

        let (outcome, response) = self.dispatch(request, peer).await;

        metrics::record_request(outcome.as_str(), method.as_str(), response.status().as_u16(), start);
        response
    }

    async fn dispatch(&self, request: Request<Body>, peer: Option<SocketAddr>) -> (Outcome, Response) {
        let request_id = request::request_id(request.headers()).to_string();
        let method = request.method().clone();
        let path = request.uri().path().to_string();

        tracing::debug!(
            request_id = %request_id,
            method = %method,
            path = %path,
            user_agent = ?request.headers().get(axum::http::header::USER_AGENT),
            origin = ?request.headers().get(axum::http::header::ORIGIN),
            "Request received"
        );

        // 1. Access filter
        let origin = match self.access.evaluate(request.headers()) {
            Decision::Allow(origin) => origin,
            Decision::Deny(rejection) => {
                tracing::warn!(
                    request_id = %request_id,
                    reason = rejection.label(),
                    client_ip = ?crate::security::headers::client_ip(request.headers(), peer),
                    "Request blocked"
                );
                return (Outcome::Rejected, response::access_denied(&rejection));
            }
        };

        // 2. Preflight
        if method == Method::OPTIONS {
            tracing::debug!(request_id = %request_id, "Answering CORS preflight");
            return (Outcome::Preflight, self.cors.preflight(&origin));
        }

        // 3. Route
        let route = match self.router.lookup(&path) {
            Some(route) => route,
            None => {
                tracing::warn!(request_id = %request_id, path = %path, "No route matched");
                return (Outcome::RouteNotFound, response::not_found(&origin));
            }
        };

        // 4. Build outbound request
        let (parts, body) = request.into_parts();

        let mut url = route.upstream.clone();
        if let Some(query) = parts.uri.query().filter(|q| !q.is_empty()) {
            url.set_query(Some(query));
        }

        let mut headers = forwardable_headers(&parts.headers, &self.client_version_header);
        if self.add_forwarded_headers {
            add_forwarded_headers(&mut headers, &parts.headers, peer);
        }

        let body = if carries_body(&method) {
            match read_body(body, self.max_body_size).await {
                Ok(bytes) => Some(bytes),
                Err(e @ BodyError::TooLarge { .. }) => {
                    tracing::warn!(request_id = %request_id, error = %e, "Request body rejected");
                    return (Outcome::PayloadTooLarge, response::payload_too_large(&origin));
                }
                Err(e @ BodyError::Read(_)) => {
                    tracing::warn!(request_id = %request_id, error = %e, "Request body unreadable");
                    return (Outcome::BadRequestBody, response::bad_request(&origin));
                }
            }
        } else {
            None
        };

        tracing::info!(
            request_id = %request_id,
            method = %method,
            route = %route.path,
            upstream = %url,
            "Forwarding request"
        );

        // 5. Forward
        let outbound = UpstreamRequest {
            method,
            url,
            headers,
            body,
        };

        match self.upstream.forward(outbound).await {
            Ok(upstream) => {
                tracing::info!(request_id = %request_id, status = %upstream.status, "Upstream responded");
                if upstream.status.as_u16() == 200 && tracing::enabled!(tracing::Level::DEBUG) {
                    let text = String::from_utf8_lossy(&upstream.body);
                    let preview: String = text.chars().take(PREVIEW_CHARS).collect();
                    tracing::debug!(request_id = %request_id, preview = %preview, "Upstream body preview");
                }
                let response = response::relay(upstream, &self.cors, &origin, self.security_headers);
                (Outcome::Relayed, response)
            }
            Err(e) => {
                tracing::error!(request_id = %request_id, kind = e.label(), error = %e, "Upstream error");
                (Outcome::UpstreamError, response::upstream_error(&e, &origin))
            }
        }
    }
}
