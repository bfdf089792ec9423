//! Axum server setup
//!
//! Server skeleton with:
//! - Localhost-only CORS by default
//! - Tracing middleware
//! - Graceful shutdown on SIGTERM/Ctrl+C

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use sqlx::PgPool;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use polirate_core::{PlatformConfig, PriceSchedule};

use super::routes;
use crate::auth::JwtVerifier;
use crate::verification::{CodeSender, LoggingCodeSender};

/// Origins allowed when no explicit list is configured
const LOCAL_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://localhost:3030",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:3030",
];

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3030)
    pub bind_addr: SocketAddr,

    /// Allow permissive CORS (default: false = listed origins only)
    ///
    /// WARNING: Setting this to true allows any origin.
    pub cors_permissive: bool,

    /// Allowed browser origins; localhost when empty
    pub cors_origins: Vec<String>,

    /// HS256 secret for bearer tokens
    pub jwt_secret: String,

    /// Report pricing
    pub prices: PriceSchedule,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
            cors_origins: Vec::new(),
            jwt_secret: String::new(),
            prices: PriceSchedule::default(),
        }
    }
}

impl ServerConfig {
    /// Server settings from the platform config file.
    pub fn from_platform(config: &PlatformConfig, jwt_secret: String) -> Self {
        Self {
            bind_addr: config.server.bind,
            cors_permissive: config.server.cors_permissive,
            cors_origins: config.server.cors_origins.clone(),
            jwt_secret,
            prices: config.reports,
        }
    }
}

/// Shared application state
pub struct AppState {
    pub pool: PgPool,
    pub jwt: JwtVerifier,
    pub prices: PriceSchedule,
    pub codes: Arc<dyn CodeSender>,
}

impl AppState {
    pub fn new(pool: PgPool, config: &ServerConfig) -> Self {
        Self {
            pool,
            jwt: JwtVerifier::new(&config.jwt_secret),
            prices: config.prices,
            codes: Arc::new(LoggingCodeSender),
        }
    }

    /// Replace the verification code sender.
    pub fn with_code_sender(mut self, sender: Arc<dyn CodeSender>) -> Self {
        self.codes = sender;
        self
    }

    /// State over a pool that never connects, for tests that stop before
    /// the database.
    #[cfg(test)]
    pub(crate) fn for_tests(secret: &str) -> Self {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .expect("lazy pool");
        let config = ServerConfig {
            jwt_secret: secret.to_owned(),
            ..Default::default()
        };
        Self::new(pool, &config)
    }
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_permissive {
        tracing::warn!("CORS: Permissive mode enabled - all origins allowed");
        return CorsLayer::permissive();
    }

    let configured: Vec<&str> = if config.cors_origins.is_empty() {
        LOCAL_ORIGINS.to_vec()
    } else {
        config.cors_origins.iter().map(String::as_str).collect()
    };

    let origins: Vec<HeaderValue> = configured
        .into_iter()
        .filter_map(|origin| match origin.parse() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// All API routes over `state`.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::health::router())
        .merge(routes::politicians::router())
        .merge(routes::ratings::router())
        .merge(routes::posts::router())
        .merge(routes::comments::router())
        .merge(routes::likes::router())
        .merge(routes::bookmarks::router())
        .merge(routes::users::router())
        .merge(routes::notifications::router())
        .merge(routes::reports::router())
        .with_state(state)
}

/// Run the HTTP server.
///
/// # Example
///
/// ```ignore
/// let pool = create_pool(&database_url).await?;
/// let config = ServerConfig::default();
/// run_server(pool, config).await?;
/// ```
pub async fn run_server(pool: PgPool, config: ServerConfig) -> Result<(), ServerError> {
    if config.jwt_secret.is_empty() {
        return Err(ServerError::Config("JWT secret is not configured".to_string()));
    }

    let state = Arc::new(AppState::new(pool, &config));

    let app = build_router(state)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    // Bind listener
    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    // Run with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting shutdown");
        }
    }
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.bind_addr.port(), 3030);
        assert!(!config.cors_permissive);
        assert_eq!(config.prices.price(1), 2_000_000);
    }

    #[test]
    fn from_platform_copies_sections() {
        let mut platform = PlatformConfig::default();
        platform.server.cors_permissive = true;
        platform.reports.floor = 500_000;

        let config = ServerConfig::from_platform(&platform, "secret".into());
        assert!(config.cors_permissive);
        assert_eq!(config.prices.floor, 500_000);
        assert_eq!(config.jwt_secret, "secret");
    }

    #[tokio::test]
    async fn missing_secret_refuses_to_start() {
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap();
        let err = run_server(pool, ServerConfig::default()).await.unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
