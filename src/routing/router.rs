//! Route lookup.
//!
//! # Responsibilities
//! - Store the compiled route table
//! - Normalize the request path (strip the namespace prefix)
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) exact lookup via HashMap; no wildcards or parameters
//! - Prefix stripping only happens on a path segment boundary

use std::collections::HashMap;

use thiserror::Error;
use url::Url;

use crate::config::RoutingConfig;

/// A compiled route: normalized path and its upstream base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub path: String,
    pub upstream: Url,
}

/// Error raised when a route cannot be compiled.
#[derive(Debug, Error)]
#[error("route '{path}' has invalid upstream URL: {source}")]
pub struct RouteError {
    pub path: String,
    #[source]
    pub source: url::ParseError,
}

/// Immutable route table.
#[derive(Debug, Clone)]
pub struct Router {
    strip_prefix: String,
    routes: HashMap<String, Route>,
}

impl Router {
    /// Compile the route table from configuration.
    pub fn from_config(config: &RoutingConfig) -> Result<Self, RouteError> {
        let mut routes = HashMap::with_capacity(config.routes.len());
        for route in &config.routes {
            let upstream = Url::parse(&route.upstream).map_err(|source| RouteError {
                path: route.path.clone(),
                source,
            })?;
            routes.insert(
                route.path.clone(),
                Route {
                    path: route.path.clone(),
                    upstream,
                },
            );
        }

        Ok(Self {
            strip_prefix: config.strip_prefix.clone(),
            routes,
        })
    }

    /// Remove the namespace prefix from a request path.
    ///
    /// `/api` becomes `/`, `/api/keys` becomes `/keys`, `/apikeys` is untouched.
    pub fn normalize<'a>(&self, path: &'a str) -> &'a str {
        if self.strip_prefix.is_empty() {
            return path;
        }
        match path.strip_prefix(self.strip_prefix.as_str()) {
            Some("") => "/",
            Some(rest) if rest.starts_with('/') => rest,
            _ => path,
        }
    }

    /// Look up the route for a raw request path.
    pub fn lookup(&self, path: &str) -> Option<&Route> {
        self.routes.get(self.normalize(path))
    }

    /// Number of compiled routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
