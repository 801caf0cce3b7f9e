//! Edge proxy library.
//!
//! Filters inbound requests by User-Agent and Origin, maps a small fixed set
//! of paths onto upstream APIs, and relays the answers with rewritten CORS
//! and caching headers.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::{HttpServer, ProxyHandler};
pub use lifecycle::Shutdown;
