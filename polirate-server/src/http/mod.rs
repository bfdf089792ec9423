//! HTTP layer
//!
//! Axum server with:
//! - JWT bearer auth (Supabase-compatible claims)
//! - CORS (localhost only by default)
//! - Request tracing
//! - Graceful shutdown
//! - `{success, data, pagination}` / `{success, error, code}` envelopes

pub mod error;
pub mod extractors;
pub mod response;
pub mod routes;
pub mod server;

pub use error::ApiError;
pub use server::{build_router, run_server, AppState, ServerConfig, ServerError};
