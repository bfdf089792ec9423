//! polirate-server: HTTP API for the politician rating platform
//!
//! Politicians, AI evaluations, ratings, posts, threaded comments, likes,
//! bookmarks, follows, notifications and paid report checkout, all backed
//! by PostgreSQL.

pub mod auth;
pub mod db;
pub mod http;
pub mod verification;

pub use auth::{issue_token, AuthUser, Claims, JwtVerifier};
pub use db::{create_pool, create_pool_with_options, DbError};
pub use http::{build_router, run_server, AppState, ServerConfig, ServerError};
pub use verification::{CodeSender, LoggingCodeSender};
