//! reqwest-backed upstream client.

use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use reqwest::{redirect, Client};

use crate::config::TimeoutConfig;
use crate::upstream::{ForwardError, Upstream, UpstreamRequest, UpstreamResponse};

/// Pooled HTTP(S) client shared by every request.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: Client,
}

impl HttpUpstream {
    pub fn new(timeouts: &TimeoutConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .timeout(Duration::from_secs(timeouts.upstream_secs))
            .pool_idle_timeout(Duration::from_secs(90))
            .redirect(redirect::Policy::limited(10))
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }

    async fn execute(&self, request: UpstreamRequest) -> Result<UpstreamResponse, ForwardError> {
        let mut builder = self
            .client
            .request(request.method, request.url)
            .headers(request.headers);
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| match classify(e) {
                ForwardError::Transport(msg) => ForwardError::Body(msg),
                other => other,
            })?;

        Ok(UpstreamResponse { status, headers, body })
    }
}

impl Upstream for HttpUpstream {
    fn forward(&self, request: UpstreamRequest) -> BoxFuture<'_, Result<UpstreamResponse, ForwardError>> {
        self.execute(request).boxed()
    }
}

/// Map a reqwest error onto the transport taxonomy, keeping the full source chain.
fn classify(err: reqwest::Error) -> ForwardError {
    let message = error_chain(&err);
    if err.is_timeout() {
        ForwardError::Timeout(message)
    } else if err.is_connect() {
        ForwardError::Connect(message)
    } else {
        ForwardError::Transport(message)
    }
}

fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
