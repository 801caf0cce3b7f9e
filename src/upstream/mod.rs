//! Upstream forwarding.
//!
//! # Data Flow
//! ```text
//! UpstreamRequest (method, url + query, filtered headers, body)
//!     → Upstream::forward (reqwest client, follows redirects, bounded by timeout)
//!     → Ok(UpstreamResponse)  any HTTP status, body buffered verbatim
//!     → Err(ForwardError)     transport failure only
//! ```
//!
//! # Design Decisions
//! - Forwarding returns an explicit Result; the handler owns the status mapping
//! - Non-2xx upstream statuses are responses, not errors
//! - Dropping the returned future aborts the upstream call

pub mod client;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method, StatusCode};
use futures_util::future::BoxFuture;
use thiserror::Error;
use url::Url;

pub use client::HttpUpstream;

/// Request handed to an upstream.
#[derive(Debug, Clone)]
pub struct UpstreamRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Option<Bytes>,
}

/// Response received from an upstream, body fully read.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Transport-level failure of an upstream call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForwardError {
    #[error("upstream timed out: {0}")]
    Timeout(String),

    #[error("upstream connection failed: {0}")]
    Connect(String),

    #[error("upstream request failed: {0}")]
    Transport(String),

    #[error("upstream body could not be read: {0}")]
    Body(String),
}

impl ForwardError {
    pub fn label(&self) -> &'static str {
        match self {
            ForwardError::Timeout(_) => "timeout",
            ForwardError::Connect(_) => "connect",
            ForwardError::Transport(_) => "transport",
            ForwardError::Body(_) => "body",
        }
    }
}

/// Something that can execute an upstream request.
pub trait Upstream: Send + Sync {
    fn forward(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse, ForwardError>>;
}
