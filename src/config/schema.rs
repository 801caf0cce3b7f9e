//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Route table mapping request paths to upstreams.
    pub routing: RoutingConfig,

    /// Client and origin filtering.
    pub access: AccessConfig,

    /// CORS response policy.
    pub cors: CorsConfig,

    /// Outbound request shaping.
    pub forwarding: ForwardingConfig,

    /// Security hardening.
    pub security: SecurityConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Total time allowed for one upstream call, body included, in seconds.
    pub upstream_secs: u64,

    /// Request timeout (whole inbound request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 15,
            request_secs: 30,
        }
    }
}

/// Route table configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    /// Leading path segment removed before lookup (e.g. "/api").
    /// Empty disables stripping.
    pub strip_prefix: String,

    /// Exact-match routes.
    pub routes: Vec<RouteConfig>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strip_prefix: "/api".to_string(),
            routes: vec![
                RouteConfig::new("/keys", "https://keygen.warp-generator.workers.dev"),
                RouteConfig::new("/wg", "https://api.cloudflareclient.com/v0a1922/reg"),
                RouteConfig::new("/test", "https://httpbin.org/anything"),
            ],
        }
    }
}

/// A single path to upstream mapping.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct RouteConfig {
    /// Normalized request path (after prefix stripping), e.g. "/keys".
    pub path: String,

    /// Upstream base URL the request is forwarded to.
    pub upstream: String,
}

impl RouteConfig {
    pub fn new(path: impl Into<String>, upstream: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            upstream: upstream.into(),
        }
    }
}

/// What to do with a request whose Origin is present but not allow-listed.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OriginPolicy {
    /// Answer 403 with the offending origin in `X-Blocked-Reason`.
    #[default]
    Reject,
    /// Let the request through with a wildcard CORS origin.
    Wildcard,
}

/// Access filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AccessConfig {
    /// Origins that receive an echoed `Access-Control-Allow-Origin`.
    /// May contain the literal "null" sent by file:// pages.
    pub allowed_origins: Vec<String>,

    /// User-Agent substrings that block a request (case-insensitive).
    pub blocked_user_agent_markers: Vec<String>,

    /// User-Agent substrings that lift a block (case-insensitive).
    pub exempt_user_agent_markers: Vec<String>,

    /// Handling of unlisted, non-empty origins.
    pub origin_policy: OriginPolicy,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "https://warp-generator.github.io".to_string(),
                "null".to_string(),
            ],
            blocked_user_agent_markers: vec!["curl".to_string()],
            exempt_user_agent_markers: Vec::new(),
            origin_policy: OriginPolicy::Reject,
        }
    }
}

/// CORS header values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// `Access-Control-Allow-Methods` sent on preflight.
    pub allow_methods: String,

    /// `Access-Control-Allow-Headers` sent on preflight.
    pub allow_headers: String,

    /// `Access-Control-Max-Age` sent on preflight.
    pub max_age_secs: u64,

    /// Send `Access-Control-Allow-Credentials: true` with echoed origins.
    pub allow_credentials: bool,

    /// Client version header forwarded upstream when present.
    pub client_version_header: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_methods: "GET, POST, PUT, DELETE, OPTIONS, PATCH".to_string(),
            allow_headers:
                "Content-Type, Authorization, X-Requested-With, Accept, Origin, User-Agent, CF-Client-Version"
                    .to_string(),
            max_age_secs: 86_400,
            allow_credentials: true,
            client_version_header: "cf-client-version".to_string(),
        }
    }
}

/// Outbound request shaping.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ForwardingConfig {
    /// Add X-Forwarded-For / X-Forwarded-Host to upstream requests.
    pub add_forwarded_headers: bool,
}

impl Default for ForwardingConfig {
    fn default() -> Self {
        Self {
            add_forwarded_headers: true,
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Enable security headers on relayed responses.
    pub enable_headers: bool,
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_the_three_routes() {
        let config = ProxyConfig::default();
        let paths: Vec<&str> = config.routing.routes.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/keys", "/wg", "/test"]);
        assert_eq!(config.routing.strip_prefix, "/api");
        assert_eq!(config.access.origin_policy, OriginPolicy::Reject);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [access]
            origin_policy = "wildcard"
            exempt_user_agent_markers = ["warp-generator"]

            [[routing.routes]]
            path = "/keys"
            upstream = "http://127.0.0.1:9000"
            "#,
        )
        .unwrap();

        assert_eq!(config.access.origin_policy, OriginPolicy::Wildcard);
        assert_eq!(config.access.blocked_user_agent_markers, vec!["curl"]);
        assert_eq!(config.routing.routes, vec![RouteConfig::new("/keys", "http://127.0.0.1:9000")]);
        assert_eq!(config.routing.strip_prefix, "/api");
        assert_eq!(config.timeouts.upstream_secs, 15);
    }
}
