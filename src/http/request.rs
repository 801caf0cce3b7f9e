//! Request identification and body intake.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Read the request body within the configured size limit
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - GET and HEAD never carry a body upstream

use axum::body::{Body, Bytes};
use futures_util::TryStreamExt;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Generates `x-request-id` values for requests that arrive without one.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID for log fields.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Whether a method's body is forwarded upstream.
pub fn carries_body(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD)
}

/// Request body exceeded the limit or could not be read.
#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },

    #[error("request body could not be read: {0}")]
    Read(#[from] axum::Error),
}

/// Buffer the request body, refusing more than `limit` bytes.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, BodyError> {
    let mut stream = body.into_data_stream();
    let mut buf = Vec::new();
    while let Some(chunk) = stream.try_next().await? {
        if buf.len() + chunk.len() > limit {
            return Err(BodyError::TooLarge { limit });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_ids_are_unique() {
        let req = Request::new(());
        let mut maker = MakeRequestUuid;
        let a = maker.make_request_id(&req).unwrap();
        let b = maker.make_request_id(&req).unwrap();
        assert_ne!(a.header_value(), b.header_value());
        assert_eq!(a.header_value().len(), 36);
    }

    #[test]
    fn test_body_methods() {
        assert!(!carries_body(&Method::GET));
        assert!(!carries_body(&Method::HEAD));
        assert!(carries_body(&Method::POST));
        assert!(carries_body(&Method::DELETE));
    }

    #[tokio::test]
    async fn test_read_body_limit() {
        let ok = read_body(Body::from("{\"install_id\":\"abc\"}"), 64).await.unwrap();
        assert_eq!(&ok[..], b"{\"install_id\":\"abc\"}");

        let exact = read_body(Body::from(vec![0u8; 64]), 64).await.unwrap();
        assert_eq!(exact.len(), 64);

        let err = read_body(Body::from(vec![0u8; 65]), 64).await.unwrap_err();
        assert!(matches!(err, BodyError::TooLarge { limit: 64 }));
    }

    #[tokio::test]
    async fn test_read_body_broken_stream() {
        let chunks: Vec<Result<&'static str, std::io::Error>> = vec![
            Ok("{\"install"),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client reset")),
        ];
        let body = Body::from_stream(futures_util::stream::iter(chunks));

        let err = read_body(body, 1024).await.unwrap_err();
        assert!(matches!(err, BodyError::Read(_)));
    }
}
