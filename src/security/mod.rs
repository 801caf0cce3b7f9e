//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → access_control.rs (User-Agent markers, Origin allow-list)
//!     → headers.rs (allow-list forwarded headers, add X-Forwarded-*)
//!     → Pass to routing / forwarding
//!
//! Outgoing response:
//!     → headers.rs (strip hop-by-hop, security + no-cache headers)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject before any upstream call
//! - No trust in client input

pub mod access_control;
pub mod headers;

pub use access_control::{AccessPolicy, CorsOrigin, Decision, Rejection};
