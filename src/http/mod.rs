//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, trace, timeout layers)
//!     → handler.rs (access filter → preflight → route → forward)
//!     → cors.rs / response.rs (rewrite headers, build local responses)
//!     → Send to client
//! ```

pub mod cors;
pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{Outcome, ProxyHandler};
pub use request::X_REQUEST_ID;
pub use server::{HttpServer, ServerError};
