//! CORS response headers.
//!
//! # Responsibilities
//! - Answer OPTIONS preflights without touching routing or upstreams
//! - Force the resolved origin onto relayed responses
//!
//! # Design Decisions
//! - Credentials are only advertised alongside an echoed origin, never with `*`
//! - Header values are parsed once at startup

use axum::body::Body;
use axum::http::header::InvalidHeaderValue;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::Response;

use crate::config::CorsConfig;
use crate::security::CorsOrigin;

/// Methods advertised on relayed responses.
const RELAY_ALLOW_METHODS: &str = "GET, POST, OPTIONS";

/// Precomputed CORS header values.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
    max_age: HeaderValue,
    allow_credentials: bool,
}

impl CorsPolicy {
    pub fn from_config(config: &CorsConfig) -> Result<Self, InvalidHeaderValue> {
        Ok(Self {
            allow_methods: HeaderValue::from_str(&config.allow_methods)?,
            allow_headers: HeaderValue::from_str(&config.allow_headers)?,
            max_age: HeaderValue::from(config.max_age_secs),
            allow_credentials: config.allow_credentials,
        })
    }

    /// 204 answer to an OPTIONS request.
    pub fn preflight(&self, origin: &CorsOrigin) -> Response {
        let mut response = Response::new(Body::empty());
        *response.status_mut() = StatusCode::NO_CONTENT;

        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.header_value());
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, self.max_age.clone());
        self.apply_credentials(headers, origin);
        headers.insert(
            header::VARY,
            HeaderValue::from_static("Origin, Access-Control-Request-Headers"),
        );
        response
    }

    /// Overwrite the CORS headers of a relayed upstream response.
    pub fn apply_to_relay(&self, headers: &mut HeaderMap, origin: &CorsOrigin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin.header_value());
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(RELAY_ALLOW_METHODS),
        );
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*"));
        headers.remove(header::ACCESS_CONTROL_ALLOW_CREDENTIALS);
        self.apply_credentials(headers, origin);
        if origin.is_echo() {
            headers.append(header::VARY, HeaderValue::from_static("Origin"));
        }
    }

    fn apply_credentials(&self, headers: &mut HeaderMap, origin: &CorsOrigin) {
        if self.allow_credentials && origin.is_echo() {
            headers.insert(
                header::ACCESS_CONTROL_ALLOW_CREDENTIALS,
                HeaderValue::from_static("true"),
            );
        }
    }
}
