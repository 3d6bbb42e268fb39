//! HTTP API for report upload, analysis, and follow-up questions.
//!
//! Routes are nested under `/api/`. The router is composable:
//! `api_router()` returns a `Router` that can be mounted on any axum
//! server instance, and `server` runs it with a shutdown handle.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use router::api_router;
pub use server::{start_api_server, ApiServer};
pub use types::ApiContext;
