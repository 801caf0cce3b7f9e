//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (strip namespace prefix, exact lookup)
//!     → Return: matched Route (upstream base URL) or NoMatch
//!
//! Route Compilation (at startup):
//!     RoutingConfig
//!     → Parse upstream URLs
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Exact matching only: the table is configuration, not patterns
//! - Deterministic: same input always matches same route

pub mod router;

pub use router::{Route, RouteError, Router};
