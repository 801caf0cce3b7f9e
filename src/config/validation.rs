//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Route paths are absolute and unique, upstreams are http(s) URLs
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Upstream timeout must expire before the whole-request timeout
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid bind address '{0}'")]
    BindAddress(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),

    #[error("timeouts.upstream_secs ({upstream}) must be less than timeouts.request_secs ({request})")]
    TimeoutOrder { upstream: u64, request: u64 },

    #[error("strip_prefix '{0}' must start with '/' and not end with '/'")]
    StripPrefix(String),

    #[error("route path '{0}' must start with '/'")]
    RoutePath(String),

    #[error("duplicate route path '{0}'")]
    DuplicateRoute(String),

    #[error("route '{path}' has invalid upstream '{upstream}': {reason}")]
    Upstream {
        path: String,
        upstream: String,
        reason: String,
    },

    #[error("{field} entry '{value}' is not a valid header value")]
    HeaderValue { field: &'static str, value: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.connect_secs"));
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.upstream_secs"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }
    // The request timeout answers 408 without CORS headers; upstream
    // timeouts must surface as the 500 JSON error instead.
    let t = &config.timeouts;
    if t.upstream_secs > 0 && t.request_secs > 0 && t.upstream_secs >= t.request_secs {
        errors.push(ValidationError::TimeoutOrder {
            upstream: t.upstream_secs,
            request: t.request_secs,
        });
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroValue("security.max_body_size"));
    }

    let prefix = &config.routing.strip_prefix;
    if !prefix.is_empty() && (!prefix.starts_with('/') || prefix.ends_with('/')) {
        errors.push(ValidationError::StripPrefix(prefix.clone()));
    }

    let mut seen = HashSet::new();
    for route in &config.routing.routes {
        if !route.path.starts_with('/') {
            errors.push(ValidationError::RoutePath(route.path.clone()));
        }
        if !seen.insert(route.path.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.path.clone()));
        }
        let reason = match Url::parse(&route.upstream) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => None,
            Ok(url) => Some(format!("unsupported scheme '{}'", url.scheme())),
            Err(e) => Some(e.to_string()),
        };
        if let Some(reason) = reason {
            errors.push(ValidationError::Upstream {
                path: route.path.clone(),
                upstream: route.upstream.clone(),
                reason,
            });
        }
    }

    for origin in &config.access.allowed_origins {
        if HeaderValue::from_str(origin).is_err() {
            errors.push(ValidationError::HeaderValue {
                field: "access.allowed_origins",
                value: origin.clone(),
            });
        }
    }
    for (field, value) in [
        ("cors.allow_methods", &config.cors.allow_methods),
        ("cors.allow_headers", &config.cors.allow_headers),
    ] {
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::HeaderValue { field, value: value.clone() });
        }
    }
    if axum::http::HeaderName::from_bytes(config.cors.client_version_header.as_bytes()).is_err() {
        errors.push(ValidationError::HeaderValue {
            field: "cors.client_version_header",
            value: config.cors.client_version_header.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
