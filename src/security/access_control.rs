//! Client and origin access control.
//!
//! Decides, before any upstream is contacted, whether a request may proceed
//! and which `Access-Control-Allow-Origin` value it will be answered with.

use std::collections::HashSet;

use axum::http::{header, HeaderMap, HeaderValue};

use crate::config::{AccessConfig, OriginPolicy};

/// Reason sent to clients whose User-Agent is blocked.
pub const BLOCKED_CLIENT_REASON: &str = "Blocked. Next time, try not to use someone else's API.";

/// CORS origin a response will carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsOrigin {
    /// `Access-Control-Allow-Origin: *`
    Any,
    /// Echo of an allow-listed origin.
    Echo(HeaderValue),
}

impl CorsOrigin {
    pub fn header_value(&self) -> HeaderValue {
        match self {
            CorsOrigin::Any => HeaderValue::from_static("*"),
            CorsOrigin::Echo(origin) => origin.clone(),
        }
    }

    pub fn is_echo(&self) -> bool {
        matches!(self, CorsOrigin::Echo(_))
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// User-Agent carries a blocked marker and no exemption.
    BlockedClient,
    /// Origin is present but not allow-listed.
    BlockedOrigin(HeaderValue),
}

impl Rejection {
    /// Value of the `X-Blocked-Reason` header.
    pub fn reason(&self) -> HeaderValue {
        match self {
            Rejection::BlockedClient => HeaderValue::from_static(BLOCKED_CLIENT_REASON),
            Rejection::BlockedOrigin(origin) => {
                let mut bytes = b"Blocked Origin: ".to_vec();
                bytes.extend_from_slice(origin.as_bytes());
                HeaderValue::from_bytes(&bytes).unwrap_or_else(|_| HeaderValue::from_static("Blocked Origin"))
            }
        }
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Rejection::BlockedClient => "blocked_client",
            Rejection::BlockedOrigin(_) => "blocked_origin",
        }
    }
}

/// Outcome of the access filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow(CorsOrigin),
    Deny(Rejection),
}

/// Compiled access policy. Immutable and shared across requests.
#[derive(Debug, Clone)]
pub struct AccessPolicy {
    allowed_origins: HashSet<String>,
    blocked_markers: Vec<String>,
    exempt_markers: Vec<String>,
    origin_policy: OriginPolicy,
}

impl AccessPolicy {
    pub fn from_config(config: &AccessConfig) -> Self {
        Self {
            allowed_origins: config
                .allowed_origins
                .iter()
                .filter(|o| !o.is_empty())
                .cloned()
                .collect(),
            blocked_markers: lowercase_markers(&config.blocked_user_agent_markers),
            exempt_markers: lowercase_markers(&config.exempt_user_agent_markers),
            origin_policy: config.origin_policy,
        }
    }

    /// `blocked := contains(any blocked marker) AND NOT contains(any exempt marker)`.
    pub fn is_blocked_client(&self, user_agent: &str) -> bool {
        let ua = user_agent.to_lowercase();
        let blocked = self.blocked_markers.iter().any(|m| ua.contains(m.as_str()));
        blocked && !self.exempt_markers.iter().any(|m| ua.contains(m.as_str()))
    }

    /// Resolve the CORS origin for an `Origin` header, or refuse it.
    pub fn check_origin(&self, origin: Option<&HeaderValue>) -> Result<CorsOrigin, Rejection> {
        let origin = match origin {
            Some(value) if !value.is_empty() => value,
            _ => return Ok(CorsOrigin::Any),
        };

        let listed = origin
            .to_str()
            .map(|o| self.allowed_origins.contains(o))
            .unwrap_or(false);

        if listed {
            return Ok(CorsOrigin::Echo(origin.clone()));
        }

        match self.origin_policy {
            OriginPolicy::Reject => Err(Rejection::BlockedOrigin(origin.clone())),
            OriginPolicy::Wildcard => Ok(CorsOrigin::Any),
        }
    }

    /// Run the client check, then the origin check.
    pub fn evaluate(&self, headers: &HeaderMap) -> Decision {
        let user_agent = headers
            .get(header::USER_AGENT)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();

        if self.is_blocked_client(&user_agent) {
            return Decision::Deny(Rejection::BlockedClient);
        }

        match self.check_origin(headers.get(header::ORIGIN)) {
            Ok(cors) => Decision::Allow(cors),
            Err(rejection) => Decision::Deny(rejection),
        }
    }
}

fn lowercase_markers(markers: &[String]) -> Vec<String> {
    markers
        .iter()
        .filter(|m| !m.is_empty())
        .map(|m| m.to_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(exempt: &[&str], origin_policy: OriginPolicy) -> AccessPolicy {
        AccessPolicy::from_config(&AccessConfig {
            allowed_origins: vec!["https://warp-generator.github.io".into(), "null".into()],
            blocked_user_agent_markers: vec!["curl".into()],
            exempt_user_agent_markers: exempt.iter().map(|s| s.to_string()).collect(),
            origin_policy,
        })
    }

    fn headers(pairs: &[(header::HeaderName, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(name.clone(), HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_blocks_marker_case_insensitively() {
        let policy = policy(&[], OriginPolicy::Reject);
        assert!(policy.is_blocked_client("curl/8.4.0"));
        assert!(policy.is_blocked_client("CURL/7.0"));
        assert!(!policy.is_blocked_client("Mozilla/5.0"));
        assert!(!policy.is_blocked_client(""));
    }

    #[test]
    fn test_exempt_marker_lifts_block() {
        let policy = policy(&["WarpApp"], OriginPolicy::Reject);
        assert!(!policy.is_blocked_client("curl/8.4.0 warpapp/1.2"));
        assert!(policy.is_blocked_client("curl/8.4.0"));
    }

    #[test]
    fn test_origin_resolution() {
        let policy = policy(&[], OriginPolicy::Reject);

        assert_eq!(policy.check_origin(None), Ok(CorsOrigin::Any));
        assert_eq!(
            policy.check_origin(Some(&HeaderValue::from_static(""))),
            Ok(CorsOrigin::Any)
        );

        let listed = HeaderValue::from_static("https://warp-generator.github.io");
        assert_eq!(policy.check_origin(Some(&listed)), Ok(CorsOrigin::Echo(listed.clone())));

        let null = HeaderValue::from_static("null");
        assert_eq!(policy.check_origin(Some(&null)), Ok(CorsOrigin::Echo(null.clone())));

        let evil = HeaderValue::from_static("https://evil.example");
        assert_eq!(
            policy.check_origin(Some(&evil)),
            Err(Rejection::BlockedOrigin(evil.clone()))
        );
    }

    #[test]
    fn test_wildcard_policy_lets_unlisted_origin_through() {
        let policy = policy(&[], OriginPolicy::Wildcard);
        let evil = HeaderValue::from_static("https://evil.example");
        assert_eq!(policy.check_origin(Some(&evil)), Ok(CorsOrigin::Any));
    }

    #[test]
    fn test_rejection_reason_echoes_origin() {
        let rejection = Rejection::BlockedOrigin(HeaderValue::from_static("https://evil.example"));
        assert_eq!(rejection.reason(), "Blocked Origin: https://evil.example");
        assert_eq!(Rejection::BlockedClient.reason(), BLOCKED_CLIENT_REASON);
    }

    #[test]
    fn test_client_check_runs_before_origin_check() {
        let policy = policy(&[], OriginPolicy::Reject);
        let decision = policy.evaluate(&headers(&[
            (header::USER_AGENT, "curl/8.4.0"),
            (header::ORIGIN, "https://warp-generator.github.io"),
        ]));
        assert_eq!(decision, Decision::Deny(Rejection::BlockedClient));

        let decision = policy.evaluate(&headers(&[(header::USER_AGENT, "Mozilla/5.0")]));
        assert_eq!(decision, Decision::Allow(CorsOrigin::Any));
    }
}
