//! HTTP query layer over the analytics engine.
//!
//! Routes are nested under `/api/`. User-specific analysis and records routes
//! need the caller's identity in `X-User-Id`; authentication itself happens
//! upstream.
//!
//! The router is composable: `analytics_router()` returns a `Router`
//! that can be mounted on any axum server instance.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::{analytics_router, cors_layer};
pub use server::{start_server, ApiServer, ServerSession};
pub use types::ApiContext;
