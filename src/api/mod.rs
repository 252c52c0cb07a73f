//! REST API for the monitoring hub
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Registry** for querying and controlling target monitors
//! - **Dispatcher** for sending ad-hoc notifications
//!
//! Every response uses the `{ "success": bool, "data" | "error": ... }`
//! envelope.
//!
//! ## Endpoints
//!
//! - `GET  /api/health` - Health check
//! - `GET  /api/notify/status` - Notification channel state
//! - `POST /api/notify/send` - Send one message
//! - `POST /api/notify/broadcast` - Send one message to many recipients
//! - `GET  /api/monitoring/dashboard` - Check every target now
//! - `GET  /api/monitoring/targets` - List targets with their last status
//! - `GET  /api/monitoring/targets/:id` - Last status of one target
//! - `POST /api/monitoring/targets/:id/check` - Check one target now
//! - `POST /api/monitoring/targets/:id/start` - Start scheduled polling
//! - `POST /api/monitoring/targets/:id/stop` - Stop scheduled polling
//! - `POST /api/monitoring/targets/:id/interval` - Change the polling interval

pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;

use std::net::SocketAddr;

use axum::{
    Router,
    routing::{get, post},
};
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr,

    /// Bearer token required on every route except `/api/health`
    pub auth_token: Option<String>,

    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3000)),
            auth_token: None,
            enable_cors: true,
        }
    }
}

pub fn router(config: &ApiConfig, state: ApiState) -> Router {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let mut protected = Router::new()
        .route("/api/notify/status", get(routes::notify::status))
        .route("/api/notify/send", post(routes::notify::send))
        .route("/api/notify/broadcast", post(routes::notify::broadcast))
        .route("/api/monitoring/dashboard", get(routes::monitoring::dashboard))
        .route("/api/monitoring/targets", get(routes::monitoring::list_targets))
        .route("/api/monitoring/targets/:id", get(routes::monitoring::get_target))
        .route(
            "/api/monitoring/targets/:id/check",
            post(routes::monitoring::check_target),
        )
        .route(
            "/api/monitoring/targets/:id/start",
            post(routes::monitoring::start_target),
        )
        .route(
            "/api/monitoring/targets/:id/stop",
            post(routes::monitoring::stop_target),
        )
        .route(
            "/api/monitoring/targets/:id/interval",
            post(routes::monitoring::update_interval),
        );

    if let Some(token) = config.auth_token.clone() {
        protected = protected.route_layer(axum::middleware::from_fn_with_state(
            token,
            middleware::auth::auth_middleware,
        ));
    }

    let mut app = Router::new()
        .route("/api/health", get(routes::health::health_check))
        .merge(protected)
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task.
/// Returns the server's local address.
pub async fn spawn_api_server(config: ApiConfig, state: ApiState) -> anyhow::Result<SocketAddr> {
    info!("starting API server on {}", config.bind_addr);

    let app = router(&config, state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok(addr)
}
