//! Header manipulation and security headers.
//!
//! # Responsibilities
//! - Allow-list the headers forwarded upstream
//! - Add X-Forwarded-For, X-Forwarded-Host
//! - Strip hop-by-hop headers from relayed responses
//! - Add security and no-cache response headers
//!
//! # Design Decisions
//! - Forward by allow-list: host, origin, referer, cookies and credentials never leave
//! - Client IP taken from the edge network headers first, TCP peer last

use std::net::SocketAddr;

use axum::http::uri::Authority;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

/// Cache directives used on locally generated responses.
pub const NO_CACHE: &str = "no-store, no-cache, must-revalidate";

/// Cache directives forced on relayed responses without their own Cache-Control.
pub const NO_STORE_RELAY: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
pub const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
pub const CF_CONNECTING_IP: HeaderName = HeaderName::from_static("cf-connecting-ip");
pub const X_REAL_IP: HeaderName = HeaderName::from_static("x-real-ip");

/// Inbound headers passed through to upstreams.
const FORWARDABLE: [HeaderName; 5] = [
    header::CONTENT_TYPE,
    header::ACCEPT,
    header::ACCEPT_ENCODING,
    header::ACCEPT_LANGUAGE,
    header::USER_AGENT,
];

const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Build the outbound header set from the inbound one.
pub fn forwardable_headers(inbound: &HeaderMap, client_version: &HeaderName) -> HeaderMap {
    let mut out = HeaderMap::new();
    for name in FORWARDABLE.iter().chain(std::iter::once(client_version)) {
        for value in inbound.get_all(name) {
            out.append(name.clone(), value.clone());
        }
    }
    out
}

/// Best-effort client address: edge header, then proxy header, then TCP peer.
pub fn client_ip(inbound: &HeaderMap, peer: Option<SocketAddr>) -> Option<HeaderValue> {
    inbound
        .get(&CF_CONNECTING_IP)
        .or_else(|| inbound.get(&X_REAL_IP))
        .cloned()
        .or_else(|| peer.and_then(|addr| HeaderValue::from_str(&addr.ip().to_string()).ok()))
}

/// Add X-Forwarded-* headers to an outbound request.
pub fn add_forwarded_headers(out: &mut HeaderMap, inbound: &HeaderMap, peer: Option<SocketAddr>) {
    if let Some(ip) = client_ip(inbound, peer) {
        out.insert(X_FORWARDED_FOR, ip);
    }
    if let Some(host) = inbound.get(header::HOST).and_then(hostname) {
        out.insert(X_FORWARDED_HOST, host);
    }
}

/// Host name of a `Host` header value, port removed.
fn hostname(host: &HeaderValue) -> Option<HeaderValue> {
    let authority: Authority = host.to_str().ok()?.parse().ok()?;
    HeaderValue::from_str(authority.host()).ok()
}

/// Remove hop-by-hop headers and the body length (recomputed on relay).
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
    headers.remove(header::CONTENT_LENGTH);
}

/// Add browser hardening headers.
pub fn apply_security_headers(headers: &mut HeaderMap) {
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
}

/// Force no-store caching unless the upstream chose its own Cache-Control.
pub fn ensure_uncached(headers: &mut HeaderMap) {
    if headers.contains_key(header::CACHE_CONTROL) {
        return;
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE_RELAY));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound() -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::HOST, HeaderValue::from_static("proxy.example"));
        h.insert(header::ORIGIN, HeaderValue::from_static("https://warp-generator.github.io"));
        h.insert(header::REFERER, HeaderValue::from_static("https://warp-generator.github.io/"));
        h.insert(header::COOKIE, HeaderValue::from_static("session=1"));
        h.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        h.insert(header::USER_AGENT, HeaderValue::from_static("Mozilla/5.0"));
        h.insert(header::ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
        h.insert("cf-client-version", HeaderValue::from_static("a-6.10-2158"));
        h
    }

    #[test]
    fn test_forwardable_headers_allow_list() {
        let version = HeaderName::from_static("cf-client-version");
        let out = forwardable_headers(&inbound(), &version);

        assert_eq!(out.get(header::CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(out.get(header::USER_AGENT).unwrap(), "Mozilla/5.0");
        assert_eq!(out.get(header::ACCEPT_ENCODING).unwrap(), "gzip");
        assert_eq!(out.get("cf-client-version").unwrap(), "a-6.10-2158");
        assert!(out.get(header::HOST).is_none());
        assert!(out.get(header::ORIGIN).is_none());
        assert!(out.get(header::REFERER).is_none());
        assert!(out.get(header::COOKIE).is_none());
        assert_eq!(out.len(), 4);
    }

    #[test]
    fn test_client_ip_precedence() {
        let peer: SocketAddr = "10.0.0.9:5555".parse().unwrap();
        let mut h = HeaderMap::new();
        assert_eq!(client_ip(&h, Some(peer)).unwrap(), "10.0.0.9");
        assert!(client_ip(&h, None).is_none());

        h.insert(X_REAL_IP, HeaderValue::from_static("192.0.2.2"));
        assert_eq!(client_ip(&h, Some(peer)).unwrap(), "192.0.2.2");

        h.insert(CF_CONNECTING_IP, HeaderValue::from_static("198.51.100.1"));
        assert_eq!(client_ip(&h, Some(peer)).unwrap(), "198.51.100.1");
    }

    #[test]
    fn test_forwarded_headers() {
        let mut out = HeaderMap::new();
        add_forwarded_headers(&mut out, &inbound(), Some("127.0.0.1:1000".parse().unwrap()));
        assert_eq!(out.get(X_FORWARDED_FOR).unwrap(), "127.0.0.1");
        assert_eq!(out.get(X_FORWARDED_HOST).unwrap(), "proxy.example");
    }

    #[test]
    fn test_forwarded_host_drops_port() {
        let mut h = HeaderMap::new();
        h.insert(header::HOST, HeaderValue::from_static("proxy.example:8443"));
        let mut out = HeaderMap::new();
        add_forwarded_headers(&mut out, &h, None);
        assert_eq!(out.get(X_FORWARDED_HOST).unwrap(), "proxy.example");
        assert!(out.get(X_FORWARDED_FOR).is_none());

        h.insert(header::HOST, HeaderValue::from_static("[::1]:8080"));
        let mut out = HeaderMap::new();
        add_forwarded_headers(&mut out, &h, None);
        assert_eq!(out.get(X_FORWARDED_HOST).unwrap(), "[::1]");
    }

    #[test]
    fn test_ensure_uncached_respects_upstream() {
        let mut h = HeaderMap::new();
        h.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=60"));
        ensure_uncached(&mut h);
        assert_eq!(h.get(header::CACHE_CONTROL).unwrap(), "max-age=60");
        assert!(h.get(header::PRAGMA).is_none());

        let mut h = HeaderMap::new();
        ensure_uncached(&mut h);
        assert_eq!(h.get(header::CACHE_CONTROL).unwrap(), NO_STORE_RELAY);
        assert_eq!(h.get(header::PRAGMA).unwrap(), "no-cache");
        assert_eq!(h.get(header::EXPIRES).unwrap(), "0");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut h = HeaderMap::new();
        h.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
        h.insert(header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        h.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        h.insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        strip_hop_by_hop(&mut h);
        assert_eq!(h.len(), 1);
        assert!(h.contains_key(header::CONTENT_ENCODING));
    }
}
